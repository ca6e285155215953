//! `hostbridge config`: print the config payload a run would inject.

use std::path::PathBuf;

use hostbridge_core::Bridge;

use super::load_config;

pub fn execute(config: Option<PathBuf>, plugins: Option<PathBuf>, pretty: bool) -> anyhow::Result<()> {
    let config = load_config(config.as_deref(), plugins)?;
    let bridge = Bridge::new(config);
    let preview = bridge.preview();
    let payload = preview.registry().config_payload();

    let text = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        payload.to_json()?
    };
    println!("{}", text);
    Ok(())
}
