//! NativeModule trait: the registration contract
//!
//! A native module exposes a stable name, an ordered list of methods, a table
//! of constants and a single `call` entry point that dispatches on the method
//! index. The bridge assigns the module an integer ID and each method its
//! position in `methods()`; the scripting runtime only ever refers to them by
//! those numbers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::BridgeContext;
use crate::convert::Args;
use crate::error::NativeResult;

/// Constant table exported by a module
pub type Constants = Map<String, Value>;

/// How the scripting runtime expects a method to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Fire-and-forget; answers, if any, go through callback arguments
    Async,
    /// The last two arguments are resolve/reject callback IDs
    Promise,
    /// Called synchronously; the return value is the answer
    Sync,
}

impl MethodKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Async => "async",
            MethodKind::Promise => "promise",
            MethodKind::Sync => "sync",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exported method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name as seen by scripts
    pub name: String,
    /// Invocation kind
    pub kind: MethodKind,
}

impl MethodInfo {
    /// Normal (fire-and-forget) method
    pub fn method(name: impl Into<String>) -> Self {
        MethodInfo {
            name: name.into(),
            kind: MethodKind::Async,
        }
    }

    /// Promise-style method
    pub fn promise(name: impl Into<String>) -> Self {
        MethodInfo {
            name: name.into(),
            kind: MethodKind::Promise,
        }
    }

    /// Synchronous method
    pub fn sync(name: impl Into<String>) -> Self {
        MethodInfo {
            name: name.into(),
            kind: MethodKind::Sync,
        }
    }
}

/// View configuration exported by view manager modules.
///
/// The UI manager collects these from every module registered before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Native view class name used by `createView`
    pub view_name: String,
    /// Property name → property type name
    pub native_props: BTreeMap<String, String>,
    /// Event names that bubble through the view hierarchy
    pub bubbling_events: Vec<String>,
}

impl ViewConfig {
    /// Create a view config with no properties
    pub fn new(view_name: impl Into<String>) -> Self {
        ViewConfig {
            view_name: view_name.into(),
            ..Default::default()
        }
    }

    /// Add a native property
    pub fn prop(mut self, name: &str, ty: &str) -> Self {
        self.native_props.insert(name.to_string(), ty.to_string());
        self
    }

    /// Add a bubbling event
    pub fn bubbling_event(mut self, name: &str) -> Self {
        self.bubbling_events.push(name.to_string());
        self
    }
}

/// Trait implemented by every native module.
///
/// Modules are shared between the registry and the bridge and may be called
/// from the bridge's owner thread while their own worker threads run, so
/// handlers take `&self` and keep mutable state behind locks.
pub trait NativeModule: Send + Sync {
    /// Unique module name
    fn name(&self) -> &str;

    /// Exported methods; the position in this list is the method index
    fn methods(&self) -> Vec<MethodInfo>;

    /// Constants exported to scripts
    fn constants(&self) -> Constants {
        Constants::new()
    }

    /// Receive the bridge context for the current generation
    fn set_bridge(&self, _bridge: Arc<dyn BridgeContext>) {}

    /// View configuration, for view manager modules
    fn view_config(&self) -> Option<ViewConfig> {
        None
    }

    /// Handle a call to the method at `method`.
    ///
    /// For promise methods the resolve/reject callback IDs have already been
    /// removed from `args`; `Ok` resolves and `Err` rejects.
    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value>;
}

impl fmt::Debug for dyn NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name())
            .field("methods", &self.methods().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_kind_wire_names() {
        assert_eq!(serde_json::to_value(MethodKind::Promise).unwrap(), "promise");
        assert_eq!(
            serde_json::from_value::<MethodKind>(Value::from("sync")).unwrap(),
            MethodKind::Sync
        );
        assert_eq!(MethodKind::Async.to_string(), "async");
    }

    #[test]
    fn test_view_config_builder() {
        let config = ViewConfig::new("RCTText")
            .prop("text", "string")
            .bubbling_event("topPress");
        assert_eq!(config.view_name, "RCTText");
        assert_eq!(config.native_props.get("text").map(String::as_str), Some("string"));
        assert_eq!(config.bubbling_events, vec!["topPress".to_string()]);
    }
}
