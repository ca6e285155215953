//! Module-facing bridge handle
//!
//! Modules may call back into the script from any thread. They hold a
//! [`BridgeHandle`], which only posts [`Command`]s to the owner thread; the
//! bridge drains them on its next pump and drops the ones whose generation is
//! no longer live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::Sender;
use hostbridge_sdk::{BridgeContext, Value};

/// Work posted to the owner thread by a [`BridgeHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run `module.method(args)` in the script
    ScriptCall {
        /// Generation of the posting handle
        generation: u64,
        /// Script-side module name
        module: String,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Value>,
    },
    /// Invoke a script callback
    Callback {
        /// Generation of the posting handle
        generation: u64,
        /// Callback ID
        callback_id: u64,
        /// Arguments
        args: Vec<Value>,
    },
    /// Show an error to the user
    Error {
        /// Generation of the posting handle
        generation: u64,
        /// Rendered message
        message: String,
    },
}

impl Command {
    /// Generation the command was posted from
    pub fn generation(&self) -> u64 {
        match self {
            Command::ScriptCall { generation, .. }
            | Command::Callback { generation, .. }
            | Command::Error { generation, .. } => *generation,
        }
    }
}

/// [`BridgeContext`] handed to the modules of one generation.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    generation: u64,
    live: Arc<AtomicU64>,
    commands: Sender<Command>,
}

impl BridgeHandle {
    pub(crate) fn new(generation: u64, live: Arc<AtomicU64>, commands: Sender<Command>) -> Self {
        BridgeHandle {
            generation,
            live,
            commands,
        }
    }

    fn post(&self, command: Command) {
        if !self.is_current() {
            tracing::debug!("Dropping command from stale generation {}", self.generation);
            return;
        }
        // The bridge is gone; nothing left to notify.
        let _ = self.commands.send(command);
    }
}

impl BridgeContext for BridgeHandle {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_current(&self) -> bool {
        self.live.load(Ordering::Acquire) == self.generation
    }

    fn enqueue_script_call(&self, module: &str, method: &str, args: Vec<Value>) {
        self.post(Command::ScriptCall {
            generation: self.generation,
            module: module.to_string(),
            method: method.to_string(),
            args,
        });
    }

    fn invoke_callback(&self, callback_id: u64, args: Vec<Value>) {
        self.post(Command::Callback {
            generation: self.generation,
            callback_id,
            args,
        });
    }

    fn report_error(&self, message: &str) {
        self.post(Command::Error {
            generation: self.generation,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;
    use hostbridge_sdk::json;

    #[test]
    fn test_commands_carry_generation() {
        let (tx, rx) = channel::unbounded();
        let live = Arc::new(AtomicU64::new(3));
        let handle = BridgeHandle::new(3, live, tx);

        handle.emit_device_event("appStateDidChange", json!({"app_state": "active"}));
        handle.invoke_callback(7, vec![json!(null)]);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.generation(), 3);
        assert!(matches!(first, Command::ScriptCall { ref module, .. } if module == "RCTDeviceEventEmitter"));
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::Callback {
                generation: 3,
                callback_id: 7,
                args: vec![json!(null)]
            }
        );
    }

    #[test]
    fn test_stale_handle_posts_nothing() {
        let (tx, rx) = channel::unbounded();
        let live = Arc::new(AtomicU64::new(1));
        let handle = BridgeHandle::new(1, live.clone(), tx);

        live.store(2, Ordering::Release);
        assert!(!handle.is_current());
        handle.report_error("too late");
        assert!(rx.try_recv().is_err());
    }
}
