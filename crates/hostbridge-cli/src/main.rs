//! Hostbridge command-line host
//!
//! Runs an application bundle against the built-in native modules and any
//! plugins, or inspects the module registry a run would publish.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hostbridge")]
#[command(about = "Host script bundles against native modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, e.g. "info" or "hostbridge_core=debug" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a bundle and keep the bridge running
    Run {
        /// Bundle URL or path
        bundle: String,
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Executor to use
        #[arg(long)]
        executor: Option<String>,
        /// Plugins directory
        #[arg(long)]
        plugins: Option<PathBuf>,
        /// Script runtime proxy URL (ws://)
        #[arg(long)]
        proxy: Option<String>,
        /// Seconds to keep running once ready (0 = until interrupted)
        #[arg(long, default_value_t = 0)]
        timeout: u64,
        /// Seconds to wait for the bridge to become ready
        #[arg(long, default_value_t = 30)]
        ready_timeout: u64,
    },

    /// Print the config payload injected into the script runtime
    Config {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Plugins directory
        #[arg(long)]
        plugins: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// List registered modules and their methods
    Modules {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Plugins directory
        #[arg(long)]
        plugins: Option<PathBuf>,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let color = output::resolve_color_choice(cli.color.as_deref());

    let result = match cli.command {
        Commands::Run {
            bundle,
            config,
            executor,
            plugins,
            proxy,
            timeout,
            ready_timeout,
        } => commands::run::execute(commands::run::RunArgs {
            bundle,
            config,
            executor,
            plugins,
            proxy,
            timeout,
            ready_timeout,
        }),

        Commands::Config {
            config,
            plugins,
            pretty,
        } => commands::config::execute(config, plugins, pretty),

        Commands::Modules { config, plugins } => commands::modules::execute(config, plugins, color),
    };

    if let Err(e) = result {
        let mut out = output::StyledOutput::new(color);
        out.stderr_error("error");
        eprintln!(": {:#}", e);
        std::process::exit(1);
    }
}
