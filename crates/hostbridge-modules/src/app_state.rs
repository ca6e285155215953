//! AppState: foreground/background state of the host application

use std::fmt;
use std::sync::Arc;

use hostbridge_sdk::{json, Args, BridgeContext, Callback, Constants, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;

/// Device event emitted when the state changes
pub const APP_STATE_EVENT: &str = "appStateDidChange";

/// Application state as reported to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStateKind {
    /// In the foreground and receiving events
    Active,
    /// In the foreground but not receiving events
    Inactive,
    /// In the background
    Background,
}

impl AppStateKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStateKind::Active => "active",
            AppStateKind::Inactive => "inactive",
            AppStateKind::Background => "background",
        }
    }
}

impl fmt::Display for AppStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native app state module.
pub struct AppState {
    state: Mutex<AppStateKind>,
    bridge: Mutex<Option<Arc<dyn BridgeContext>>>,
}

impl AppState {
    /// Create the module in the `active` state
    pub fn new() -> Self {
        AppState {
            state: Mutex::new(AppStateKind::Active),
            bridge: Mutex::new(None),
        }
    }

    /// Current state
    pub fn state(&self) -> AppStateKind {
        *self.state.lock()
    }

    /// Change the state, notifying scripts if it actually changed
    pub fn set_state(&self, state: AppStateKind) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            *current = state;
        }
        tracing::debug!("App state changed to {}", state);
        if let Some(bridge) = self.bridge.lock().as_ref() {
            bridge.emit_device_event(APP_STATE_EVENT, json!({ "app_state": state.as_str() }));
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeModule for AppState {
    fn name(&self) -> &str {
        "AppState"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![MethodInfo::method("getCurrentAppState")]
    }

    fn constants(&self) -> Constants {
        let mut constants = Constants::new();
        constants.insert("initialAppState".to_string(), json!(self.state().as_str()));
        constants
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        *self.bridge.lock() = Some(bridge);
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        match method {
            0 => {
                let success: Callback = args.get(0)?;
                success.invoke(ctx, vec![json!({ "app_state": self.state().as_str() })]);
                Ok(Value::Null)
            }
            other => Err(NativeError::UnknownMethod(other)),
        }
    }
}
