//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use hostbridge_core::{Completion, Executor, ExecutorError, FetchError, SourceFetcher};
use hostbridge_sdk::{Args, BridgeContext, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;
use url::Url;

// ============================================================================
// Modules
// ============================================================================

/// Module that records every call and answers with a canned value.
pub struct Recorder {
    name: String,
    methods: Vec<MethodInfo>,
    calls: Arc<Mutex<Vec<(usize, Vec<Value>)>>>,
}

impl Recorder {
    pub fn new(name: &str, methods: Vec<MethodInfo>) -> Self {
        Recorder {
            name: name.to_string(),
            methods,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the calls, usable after the module moved into a registry
    pub fn calls(&self) -> Arc<Mutex<Vec<(usize, Vec<Value>)>>> {
        self.calls.clone()
    }
}

impl NativeModule for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<MethodInfo> {
        self.methods.clone()
    }

    fn call(&self, _ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        self.calls.lock().push((method, args.as_slice().to_vec()));
        match args.raw(0) {
            Some(Value::String(s)) if s == "fail" => Err(NativeError::rejected("E_FAIL", "asked to fail")),
            Some(Value::String(s)) if s == "panic" => panic!("asked to panic"),
            Some(value) => Ok(value.clone()),
            None => Ok(Value::Null),
        }
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Everything the scripted runtime saw
#[derive(Debug, Default)]
pub struct RuntimeLog {
    pub injected: Vec<(String, String)>,
    pub scripts: Vec<(String, String)>,
    pub calls: Vec<(String, Vec<Value>)>,
}

/// Script runtime stand-in. Calls are answered from a queue of batches;
/// once the queue is empty every call returns `Null`.
#[derive(Clone, Default)]
pub struct ScriptedRuntime {
    pub log: Arc<Mutex<RuntimeLog>>,
    batches: Arc<Mutex<VecDeque<Result<Value, ExecutorError>>>>,
    script_error: Arc<Mutex<Option<ExecutorError>>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call with `batch`
    pub fn push_batch(&self, batch: Value) {
        self.batches.lock().push_back(Ok(batch));
    }

    /// Fail the next call
    pub fn push_error(&self, error: ExecutorError) {
        self.batches.lock().push_back(Err(error));
    }

    /// Make the application script fail
    pub fn fail_script(&self, error: ExecutorError) {
        *self.script_error.lock() = Some(error);
    }

    pub fn executor(&self) -> Box<dyn Executor> {
        Box::new(ScriptedExecutor {
            runtime: self.clone(),
        })
    }

    /// Method names of the calls so far
    pub fn call_methods(&self) -> Vec<String> {
        self.log.lock().calls.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Config payload injected most recently
    pub fn injected_config(&self) -> Option<String> {
        self.log.lock().injected.last().map(|(_, payload)| payload.clone())
    }
}

pub struct ScriptedExecutor {
    runtime: ScriptedRuntime,
}

impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn init(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn inject_json(&mut self, name: &str, payload: String) {
        self.runtime.log.lock().injected.push((name.to_string(), payload));
    }

    fn execute_application_script(&mut self, code: String, url: &str) -> Completion<()> {
        self.runtime.log.lock().scripts.push((code, url.to_string()));
        match self.runtime.script_error.lock().clone() {
            Some(error) => Completion::failed(error),
            None => Completion::ready(()),
        }
    }

    fn execute_call(&mut self, method: &str, args: Vec<Value>) -> Completion<Value> {
        self.runtime.log.lock().calls.push((method.to_string(), args));
        match self.runtime.batches.lock().pop_front() {
            Some(result) => Completion::settled(result),
            None => Completion::ready(Value::Null),
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Serves the same bundle for every URL
pub struct StaticSource(pub &'static str);

impl SourceFetcher for StaticSource {
    fn fetch(&self, _url: &Url) -> Completion<Vec<u8>, FetchError> {
        Completion::ready(self.0.as_bytes().to_vec())
    }
}

/// Fails every fetch
pub struct MissingSource;

impl SourceFetcher for MissingSource {
    fn fetch(&self, url: &Url) -> Completion<Vec<u8>, FetchError> {
        Completion::failed(FetchError::Io(format!("{}: not found", url)))
    }
}

pub fn bundle_url() -> Url {
    Url::parse("http://localhost:8081/index.bundle").unwrap()
}
