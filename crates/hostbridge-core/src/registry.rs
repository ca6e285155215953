//! Module registry
//!
//! Assigns every accepted native module a numeric ID and every method a
//! numeric index, the identities the scripting runtime uses on the wire. A
//! registry belongs to exactly one bridge generation and is never mutated once
//! it has been published.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use hostbridge_sdk::{
    json, Args, BridgeContext, Callback, Constants, FromValue, MethodKind, NativeError, NativeModule, NativeResult,
    Value,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Numeric module identity on the wire
pub type ModuleId = usize;

/// Global under which the config payload is injected into the executor
pub const CONFIG_GLOBAL: &str = "__fbBatchedBridgeConfig";

// ============================================================================
// MethodDescriptor
// ============================================================================

/// One exported method, bound to its module ID and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    module_id: ModuleId,
    module_name: String,
    index: usize,
    name: String,
    kind: MethodKind,
}

impl MethodDescriptor {
    /// Owning module ID
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// Owning module name
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Index within the owning module
    pub fn index(&self) -> usize {
        self.index
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invocation kind
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Invoke the method with wire parameters.
    ///
    /// Promise methods take their resolve and reject callback IDs from the
    /// last two parameters and settle through them; the returned value is
    /// `Null`. Other methods return the handler's value. Handler errors and
    /// panics come back as [`BridgeError::MethodFailed`].
    pub fn invoke(&self, module: &dyn NativeModule, ctx: &dyn BridgeContext, params: &[Value]) -> BridgeResult<Value> {
        match self.kind {
            MethodKind::Async | MethodKind::Sync => self.call_handler(module, ctx, params).map_err(|e| self.failed(e)),
            MethodKind::Promise => {
                let (args, resolve, reject) = self.split_promise(params)?;
                match self.call_handler(module, ctx, args) {
                    Ok(value) => resolve.invoke(ctx, vec![value]),
                    Err(e) => {
                        tracing::debug!("{}.{} rejected: {}", self.module_name, self.name, e);
                        reject.invoke(ctx, vec![json!({ "code": e.code(), "message": e.message() })]);
                    }
                }
                Ok(Value::Null)
            }
        }
    }

    fn split_promise<'p>(&self, params: &'p [Value]) -> BridgeResult<(&'p [Value], Callback, Callback)> {
        let missing = || {
            self.failed(NativeError::ArgumentError(
                "promise method called without resolve/reject callbacks".to_string(),
            ))
        };
        let split = params.len().checked_sub(2).ok_or_else(missing)?;
        let (args, callbacks) = params.split_at(split);
        let resolve = Callback::from_value(&callbacks[0]).ok_or_else(missing)?;
        let reject = Callback::from_value(&callbacks[1]).ok_or_else(missing)?;
        Ok((args, resolve, reject))
    }

    fn call_handler(&self, module: &dyn NativeModule, ctx: &dyn BridgeContext, params: &[Value]) -> NativeResult<Value> {
        panic::catch_unwind(AssertUnwindSafe(|| module.call(ctx, self.index, Args::new(params))))
            .unwrap_or_else(|payload| Err(NativeError::Panic(panic_message(payload.as_ref()))))
    }

    fn failed(&self, source: NativeError) -> BridgeError {
        BridgeError::MethodFailed {
            module: self.module_name.clone(),
            method: self.name.clone(),
            source,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// ModuleData
// ============================================================================

/// A registered module with its resolved methods and captured constants.
pub struct ModuleData {
    id: ModuleId,
    module: Arc<dyn NativeModule>,
    name: String,
    methods: Vec<MethodDescriptor>,
    constants: Constants,
}

impl std::fmt::Debug for ModuleData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleData")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl ModuleData {
    /// Module ID
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The native module
    pub fn module(&self) -> &Arc<dyn NativeModule> {
        &self.module
    }

    /// Methods in index order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Method at `index`
    pub fn method(&self, index: usize) -> Option<&MethodDescriptor> {
        self.methods.get(index)
    }

    /// Constants captured at registration
    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Invoke the method at `index`
    pub fn invoke(&self, index: usize, ctx: &dyn BridgeContext, params: &[Value]) -> BridgeResult<Value> {
        let method = self.method(index).ok_or_else(|| BridgeError::UnresolvedCall {
            module_id: self.id as i64,
            method_index: index as i64,
            module: Some(self.name.clone()),
            method: None,
        })?;
        method.invoke(self.module.as_ref(), ctx, params)
    }
}

// ============================================================================
// ModuleRegistry
// ============================================================================

/// Registry of native modules for one bridge generation.
#[derive(Debug)]
pub struct ModuleRegistry {
    generation: u64,
    modules: Vec<ModuleData>,
    by_name: HashMap<String, ModuleId>,
}

impl ModuleRegistry {
    /// Create an empty registry for a bridge generation
    pub fn new(generation: u64) -> Self {
        ModuleRegistry {
            generation,
            modules: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Generation this registry was built for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register a module and return its ID.
    ///
    /// A module without a name, with a name that is already taken, or with
    /// empty or duplicate method names is rejected and consumes no ID.
    pub fn register(&mut self, module: Arc<dyn NativeModule>) -> BridgeResult<ModuleId> {
        let name = module.name().to_string();
        let invalid = |reason: &str| BridgeError::InvalidModule {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("module name is empty"));
        }
        if self.by_name.contains_key(&name) {
            return Err(invalid("a module with this name is already registered"));
        }

        let id = self.modules.len();
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for (index, info) in module.methods().into_iter().enumerate() {
            if info.name.is_empty() {
                return Err(invalid(&format!("method {} has an empty name", index)));
            }
            if !seen.insert(info.name.clone()) {
                return Err(invalid(&format!("method '{}' is exported twice", info.name)));
            }
            methods.push(MethodDescriptor {
                module_id: id,
                module_name: name.clone(),
                index,
                name: info.name,
                kind: info.kind,
            });
        }

        let constants = module.constants();
        tracing::debug!("Registered module {} as {} with {} methods", name, id, methods.len());
        self.by_name.insert(name.clone(), id);
        self.modules.push(ModuleData {
            id,
            module,
            name,
            methods,
            constants,
        });
        Ok(id)
    }

    /// Module with the given ID
    pub fn lookup(&self, id: ModuleId) -> Option<&ModuleData> {
        self.modules.get(id)
    }

    /// Module with the given name
    pub fn by_name(&self, name: &str) -> Option<&ModuleData> {
        self.by_name.get(name).and_then(|&id| self.lookup(id))
    }

    /// Resolve a wire `(moduleID, methodIndex)` pair
    pub fn resolve(&self, module_id: i64, method_index: i64) -> BridgeResult<(&ModuleData, &MethodDescriptor)> {
        let module = usize::try_from(module_id).ok().and_then(|id| self.lookup(id));
        let method = module.and_then(|m| usize::try_from(method_index).ok().and_then(|i| m.method(i)));
        match (module, method) {
            (Some(module), Some(method)) => Ok((module, method)),
            _ => Err(BridgeError::UnresolvedCall {
                module_id,
                method_index,
                module: module.map(|m| m.name.clone()),
                method: None,
            }),
        }
    }

    /// Modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleData> {
        self.modules.iter()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if no module is registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Describe every module for the scripting runtime
    pub fn config_payload(&self) -> ConfigPayload {
        let remote_module_config = self
            .modules
            .iter()
            .map(|m| {
                let config = ModuleConfig {
                    module_id: m.id,
                    constants: m.constants.clone(),
                    methods: m
                        .methods
                        .iter()
                        .map(|d| MethodConfig {
                            name: d.name.clone(),
                            kind: d.kind,
                        })
                        .collect(),
                };
                (m.name.clone(), config)
            })
            .collect();
        ConfigPayload { remote_module_config }
    }
}

// ============================================================================
// ConfigPayload
// ============================================================================

/// Method entry of the config payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    /// Method name
    pub name: String,
    /// Invocation kind
    pub kind: MethodKind,
}

/// Module entry of the config payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module ID
    #[serde(rename = "moduleID")]
    pub module_id: ModuleId,
    /// Constants exported by the module
    pub constants: Constants,
    /// Methods in index order
    pub methods: Vec<MethodConfig>,
}

/// Registry description injected into the scripting runtime.
///
/// Serializes as `{"remoteModuleConfig": {name: {moduleID, constants, methods}}}`
/// with modules in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    /// Modules keyed by name
    #[serde(rename = "remoteModuleConfig")]
    pub remote_module_config: ModuleConfigs,
}

impl ConfigPayload {
    /// Serialize to the JSON text handed to the executor
    pub fn to_json(&self) -> BridgeResult<String> {
        serde_json::to_string(self).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Parse a payload produced by [`ConfigPayload::to_json`]
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Wire identity of `module.method`
    pub fn lookup(&self, module: &str, method: &str) -> Option<(ModuleId, usize)> {
        let config = self.remote_module_config.get(module)?;
        let index = config.methods.iter().position(|m| m.name == method)?;
        Some((config.module_id, index))
    }

    /// Module names in payload order
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.remote_module_config.keys().map(String::as_str)
    }
}

/// Module configs keyed by name, in registration order.
pub type ModuleConfigs = IndexMap<String, ModuleConfig>;
