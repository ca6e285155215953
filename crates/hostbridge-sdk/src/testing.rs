//! In-memory bridge context for exercising modules without a bridge.

use parking_lot::Mutex;
use serde_json::Value;

use crate::context::BridgeContext;

/// Something a module asked the bridge to do
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// `enqueue_script_call`
    ScriptCall {
        /// Script module
        module: String,
        /// Script method
        method: String,
        /// Arguments
        args: Vec<Value>,
    },
    /// `invoke_callback`
    Callback {
        /// Callback wire ID
        id: u64,
        /// Arguments
        args: Vec<Value>,
    },
    /// `report_error`
    Error(String),
}

/// Bridge context that records every request.
#[derive(Debug, Default)]
pub struct RecordingContext {
    generation: u64,
    records: Mutex<Vec<Recorded>>,
}

impl RecordingContext {
    /// Create an empty recorder for generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far
    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Arguments of the callback with the given ID, if it was invoked
    pub fn callback_args(&self, id: u64) -> Option<Vec<Value>> {
        self.records.lock().iter().find_map(|r| match r {
            Recorded::Callback { id: cb, args } if *cb == id => Some(args.clone()),
            _ => None,
        })
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl BridgeContext for RecordingContext {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_current(&self) -> bool {
        true
    }

    fn enqueue_script_call(&self, module: &str, method: &str, args: Vec<Value>) {
        self.records.lock().push(Recorded::ScriptCall {
            module: module.to_string(),
            method: method.to_string(),
            args,
        });
    }

    fn invoke_callback(&self, callback_id: u64, args: Vec<Value>) {
        self.records.lock().push(Recorded::Callback {
            id: callback_id,
            args,
        });
    }

    fn report_error(&self, message: &str) {
        self.records.lock().push(Recorded::Error(message.to_string()));
    }
}
