//! Bridge configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! bundle_url = "http://localhost:8081/index.bundle"
//! plugins_path = "./plugins"
//! executor_name = "NetExecutor"
//!
//! [executor]
//! proxy_url = "ws://localhost:8081/debugger-proxy?role=client"
//! connect_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BridgeError, BridgeResult};

/// Name of the executor used when none is configured
pub const DEFAULT_EXECUTOR: &str = "NetExecutor";

/// Proxy the default executor connects to
pub const DEFAULT_PROXY_URL: &str = "ws://localhost:8081/debugger-proxy?role=client";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Options passed to executor constructors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// WebSocket URL of the script runtime proxy
    pub proxy_url: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl ExecutorConfig {
    /// Connection timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// Settings that survive `reload()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Where the application bundle is fetched from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_url: Option<Url>,
    /// Directory searched for plugin libraries
    pub plugins_path: PathBuf,
    /// Executor to construct
    pub executor_name: String,
    /// Executor options
    pub executor: ExecutorConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            bundle_url: None,
            plugins_path: PathBuf::from("./plugins"),
            executor_name: DEFAULT_EXECUTOR.to_string(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Configuration for a bundle, everything else default
    pub fn new(bundle_url: Url) -> Self {
        BridgeConfig {
            bundle_url: Some(bundle_url),
            ..Default::default()
        }
    }

    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> BridgeResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string(self).map_err(|e| BridgeError::Config(e.to_string()))
    }
}

/// Turn a command-line bundle argument (URL or path) into a URL
pub fn bundle_url_from_arg(arg: &str) -> BridgeResult<Url> {
    if let Ok(url) = Url::parse(arg) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = std::path::absolute(arg)?;
    Url::from_file_path(&path).map_err(|_| BridgeError::Config(format!("invalid bundle path {}", path.display())))
}
