//! Hostbridge SDK - Lightweight SDK for writing native modules
//!
//! This crate provides the minimal types and traits needed to write native
//! modules callable from the scripting runtime without depending on the
//! bridge core.
//!
//! # Example
//!
//! ```ignore
//! use hostbridge_sdk::{Args, BridgeContext, MethodInfo, NativeModule, NativeResult, Value};
//!
//! struct Vibration;
//!
//! impl NativeModule for Vibration {
//!     fn name(&self) -> &str {
//!         "Vibration"
//!     }
//!
//!     fn methods(&self) -> Vec<MethodInfo> {
//!         vec![MethodInfo::method("vibrate")]
//!     }
//!
//!     fn call(&self, _ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
//!         let millis: i64 = args.get(0)?;
//!         buzz(millis);
//!         Ok(Value::Null)
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod convert;
pub mod error;
pub mod module;
pub mod plugin;
pub mod testing;

pub use context::BridgeContext;
pub use convert::{type_name, Args, Callback, FromValue};
pub use error::{NativeError, NativeResult};
pub use module::{Constants, MethodInfo, MethodKind, NativeModule, ViewConfig};
pub use plugin::{ModuleExport, ModuleLoader, PluginEntry, PLUGIN_ABI_VERSION, PLUGIN_ENTRY_SYMBOL};

pub use serde_json::{json, Map, Value};
