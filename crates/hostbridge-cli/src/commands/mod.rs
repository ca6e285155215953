//! Subcommand implementations

pub mod config;
pub mod modules;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::Context;
use hostbridge_core::BridgeConfig;

/// Load the configuration file if one was given, then apply flag overrides
pub fn load_config(path: Option<&Path>, plugins: Option<PathBuf>) -> anyhow::Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => BridgeConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if let Some(plugins) = plugins {
        config.plugins_path = plugins;
    }
    Ok(config)
}
