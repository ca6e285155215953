//! NetInfo: network reachability as seen by the host

use std::fmt;
use std::sync::Arc;

use hostbridge_sdk::{json, Args, BridgeContext, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;

/// Device event emitted when reachability changes
pub const NET_INFO_EVENT: &str = "networkStatusDidChange";

/// Reachability as reported to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// No network
    None,
    /// Wired or wireless LAN
    Wifi,
    /// Cellular data
    Cell,
    /// Not determined
    Unknown,
}

impl Connectivity {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::None => "none",
            Connectivity::Wifi => "wifi",
            Connectivity::Cell => "cell",
            Connectivity::Unknown => "unknown",
        }
    }

    fn body(&self) -> Value {
        json!({ "network_info": self.as_str() })
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native reachability module.
pub struct NetInfo {
    connectivity: Mutex<Connectivity>,
    bridge: Mutex<Option<Arc<dyn BridgeContext>>>,
}

impl NetInfo {
    /// Create the module; reachability starts out `unknown`
    pub fn new() -> Self {
        NetInfo {
            connectivity: Mutex::new(Connectivity::Unknown),
            bridge: Mutex::new(None),
        }
    }

    /// Current reachability
    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.lock()
    }

    /// Host-side update; scripts hear about actual changes only
    pub fn set_connectivity(&self, connectivity: Connectivity) {
        {
            let mut current = self.connectivity.lock();
            if *current == connectivity {
                return;
            }
            *current = connectivity;
        }
        tracing::debug!("Connectivity changed to {}", connectivity);
        if let Some(bridge) = self.bridge.lock().as_ref() {
            bridge.emit_device_event(NET_INFO_EVENT, connectivity.body());
        }
    }
}

impl Default for NetInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeModule for NetInfo {
    fn name(&self) -> &str {
        "NetInfo"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![MethodInfo::promise("getCurrentConnectivity")]
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        *self.bridge.lock() = Some(bridge);
    }

    fn call(&self, _ctx: &dyn BridgeContext, method: usize, _args: Args<'_>) -> NativeResult<Value> {
        match method {
            0 => Ok(self.connectivity().body()),
            other => Err(NativeError::UnknownMethod(other)),
        }
    }
}
