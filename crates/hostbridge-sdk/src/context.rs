//! BridgeContext trait: abstract bridge operations
//!
//! Defines the interface that the bridge core implements. Native modules
//! program against this trait to call back into the scripting runtime without
//! depending on the core crate.

use serde_json::{json, Value};

/// Script-side module receiving device-wide events
pub const DEVICE_EVENT_EMITTER: &str = "RCTDeviceEventEmitter";

/// Script-side module receiving view events
pub const VIEW_EVENT_EMITTER: &str = "RCTEventEmitter";

/// Abstract bridge context handed to native modules.
///
/// Every context belongs to one bridge generation. Once the bridge reloads,
/// calls made through an older context are dropped by the bridge, so modules
/// may keep a context on a background thread without further checks.
pub trait BridgeContext: Send + Sync {
    /// Generation of the registry this context was created for
    fn generation(&self) -> u64;

    /// Whether this context still belongs to the live bridge generation
    fn is_current(&self) -> bool;

    /// Ask the scripting runtime to run `module.method(args)`
    fn enqueue_script_call(&self, module: &str, method: &str, args: Vec<Value>);

    /// Invoke a script-side callback by its wire ID
    fn invoke_callback(&self, callback_id: u64, args: Vec<Value>);

    /// Surface an error to the user (red box)
    fn report_error(&self, message: &str);

    /// Emit a device-wide event
    fn emit_device_event(&self, name: &str, body: Value) {
        self.enqueue_script_call(DEVICE_EVENT_EMITTER, "emit", vec![json!(name), body]);
    }

    /// Dispatch an event targeted at a view tag
    fn dispatch_view_event(&self, tag: i64, name: &str, body: Value) {
        self.enqueue_script_call(
            VIEW_EVENT_EMITTER,
            "receiveEvent",
            vec![json!(tag), json!(name), body],
        );
    }
}
