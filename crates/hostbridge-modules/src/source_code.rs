//! SourceCode: gives scripts access to the loaded application bundle

use hostbridge_sdk::{json, Args, BridgeContext, Constants, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::RwLock;

/// Rejection code when the bundle has not been fetched yet
pub const SOURCE_NOT_LOADED: &str = "E_SOURCE_NOT_LOADED";

/// Synthetic module holding the application script.
pub struct SourceCode {
    script_url: String,
    source: RwLock<Option<String>>,
}

impl SourceCode {
    /// Create the module for a bundle URL
    pub fn new(script_url: impl Into<String>) -> Self {
        SourceCode {
            script_url: script_url.into(),
            source: RwLock::new(None),
        }
    }

    /// URL the bundle is loaded from
    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    /// Remember the fetched bundle
    pub fn set_source(&self, source: impl Into<String>) {
        *self.source.write() = Some(source.into());
    }

    /// The fetched bundle, if any
    pub fn source(&self) -> Option<String> {
        self.source.read().clone()
    }
}

impl NativeModule for SourceCode {
    fn name(&self) -> &str {
        "SourceCode"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![MethodInfo::promise("getScriptText")]
    }

    fn constants(&self) -> Constants {
        let mut constants = Constants::new();
        constants.insert("scriptURL".to_string(), json!(self.script_url));
        constants
    }

    fn call(&self, _ctx: &dyn BridgeContext, method: usize, _args: Args<'_>) -> NativeResult<Value> {
        if method != 0 {
            return Err(NativeError::UnknownMethod(method));
        }
        match self.source.read().as_deref() {
            Some(text) => Ok(json!({
                "fullSourceMappingURL": self.script_url,
                "text": text,
            })),
            None => Err(NativeError::rejected(SOURCE_NOT_LOADED, "Source code is not available")),
        }
    }
}
