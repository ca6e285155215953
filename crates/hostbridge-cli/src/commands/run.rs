//! `hostbridge run`: init a bridge for a bundle and keep pumping it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use hostbridge_core::{bundle_url_from_arg, Bridge, LogErrorSurface};

use super::load_config;

pub struct RunArgs {
    pub bundle: String,
    pub config: Option<PathBuf>,
    pub executor: Option<String>,
    pub plugins: Option<PathBuf>,
    pub proxy: Option<String>,
    pub timeout: u64,
    pub ready_timeout: u64,
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref(), args.plugins)?;
    config.bundle_url = Some(bundle_url_from_arg(&args.bundle).with_context(|| format!("bundle '{}'", args.bundle))?);
    if let Some(executor) = args.executor {
        config.executor_name = executor;
    }
    if let Some(proxy) = args.proxy {
        config.executor.proxy_url = proxy;
    }

    tracing::info!(
        "Running {} with {} via {}",
        args.bundle,
        config.executor_name,
        config.executor.proxy_url
    );
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = Bridge::builder(config).error_surface(surface.clone()).build();
    bridge.on_ready_changed(|ready| {
        if ready {
            eprintln!("Bridge ready");
        }
    });

    bridge.init().context("bridge failed to start")?;
    if !bridge.run_until_ready(Duration::from_secs(args.ready_timeout))? {
        match surface.last_error() {
            Some(error) => bail!("bridge did not become ready: {}", error),
            None => bail!("bridge did not become ready within {}s", args.ready_timeout),
        }
    }

    if args.timeout == 0 {
        loop {
            bridge.run_for(Duration::from_secs(60));
        }
    }
    bridge.run_for(Duration::from_secs(args.timeout));
    bridge.shutdown();
    Ok(())
}
