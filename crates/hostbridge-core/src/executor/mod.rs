//! Executors run the application script somewhere else
//!
//! The bridge never evaluates script code itself. An [`Executor`] owns the
//! script runtime, receives the injected config payload, runs the bundle and
//! forwards named calls. Every request is answered through a [`Completion`],
//! settled on whatever thread the executor uses, in submission order.

mod factory;
mod net;

pub use factory::{ExecutorConstructor, ExecutorFactory};
pub use net::NetExecutor;

use hostbridge_sdk::Value;

use crate::completion::Completion;
use crate::error::ExecutorError;

/// Script entry point that runs `module.method(args)` and returns the queue
pub const CALL_FUNCTION_RETURN_FLUSHED_QUEUE: &str = "callFunctionReturnFlushedQueue";

/// Script entry point that invokes a callback and returns the queue
pub const INVOKE_CALLBACK_AND_RETURN_FLUSHED_QUEUE: &str = "invokeCallbackAndReturnFlushedQueue";

/// Script entry point that only returns the queue
pub const FLUSHED_QUEUE: &str = "flushedQueue";

/// A script runtime the bridge can drive.
pub trait Executor: Send {
    /// Executor name, as registered with the factory
    fn name(&self) -> &str;

    /// Prepare the runtime; called once before anything else
    fn init(&mut self) -> Result<(), ExecutorError>;

    /// Make `payload` (JSON text) available to scripts as the global `name`.
    ///
    /// Only takes effect for application scripts executed afterwards.
    fn inject_json(&mut self, name: &str, payload: String);

    /// Run the application bundle
    fn execute_application_script(&mut self, code: String, url: &str) -> Completion<()>;

    /// Call a script entry point; resolves to the returned batch (`Null` for none)
    fn execute_call(&mut self, method: &str, args: Vec<Value>) -> Completion<Value>;
}

impl std::fmt::Debug for dyn Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").field("name", &self.name()).finish()
    }
}
