//! Hostbridge Core
//!
//! Module registry, call dispatch and the bridge lifecycle.
//!
//! - [`registry`]: assigns module IDs and method indices and builds the
//!   config payload injected into the script runtime
//! - [`dispatch`]: decodes batches of native calls and invokes them in order
//! - [`executor`]: the script runtime contract and the built-in `NetExecutor`
//! - [`bridge`]: owns one session at a time and drives it from [`Bridge::pump`]
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge_core::{Bridge, BridgeConfig};
//!
//! let mut bridge = Bridge::new(BridgeConfig::new(url));
//! bridge.init()?;
//! bridge.run_until_ready(Duration::from_secs(10))?;
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handle;
pub mod plugin;
pub mod registry;
pub mod source;

pub use bridge::{Bridge, BridgeBuilder, BridgeState, ErrorSurface, LogErrorSurface, RegistryPreview};
pub use completion::{completion, Broken, Completion, Resolver};
pub use config::{bundle_url_from_arg, BridgeConfig, ExecutorConfig, DEFAULT_EXECUTOR, DEFAULT_PROXY_URL};
pub use dispatch::{CallDispatcher, DispatchReport, PendingResult};
pub use error::{BridgeError, BridgeResult, ExecutorError};
pub use executor::{Executor, ExecutorConstructor, ExecutorFactory, NetExecutor};
pub use handle::{BridgeHandle, Command};
pub use plugin::{Discovered, DylibDiscovery, Library, LoadError, PluginDiscovery, PluginModule};
pub use registry::{
    ConfigPayload, MethodConfig, MethodDescriptor, ModuleConfig, ModuleConfigs, ModuleData, ModuleId,
    ModuleRegistry, CONFIG_GLOBAL,
};
pub use source::{FetchError, SourceFetcher, UrlSourceFetcher};
