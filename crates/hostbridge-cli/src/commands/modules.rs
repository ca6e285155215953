//! `hostbridge modules`: list what the registry would contain.

use std::path::PathBuf;

use hostbridge_core::Bridge;
use termcolor::ColorChoice;

use super::load_config;
use crate::output::StyledOutput;

pub fn execute(config: Option<PathBuf>, plugins: Option<PathBuf>, color: ColorChoice) -> anyhow::Result<()> {
    let config = load_config(config.as_deref(), plugins)?;
    let plugins_path = config.plugins_path.clone();
    let bridge = Bridge::new(config);
    let preview = bridge.preview();
    let registry = preview.registry();

    let mut out = StyledOutput::new(color);
    for module in registry.modules() {
        out.dim(&format!("{:>3}  ", module.id()));
        out.bold(module.name());
        if !module.constants().is_empty() {
            out.dim(&format!("  ({} constants)", module.constants().len()));
        }
        out.newline();
        for method in module.methods() {
            out.plain(&format!("       {:>2} {}", method.index(), method.name()));
            out.method_kind(method.kind());
            out.newline();
        }
    }
    out.newline();
    out.success(&format!("{} modules", registry.len()));
    out.plain(&format!(" (plugins path {})", plugins_path.display()));
    out.newline();
    out.flush();
    Ok(())
}
