//! AsyncLocalStorage: string key/value store
//!
//! Every method answers through a trailing callback using the
//! `(errors, result)` convention: `errors` is `null` on success or an array of
//! `{ "message": ... }` objects. Values live in memory for the lifetime of the
//! module instance.

use std::collections::BTreeMap;

use hostbridge_sdk::{json, Args, BridgeContext, Callback, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;

const MULTI_GET: usize = 0;
const MULTI_SET: usize = 1;
const MULTI_REMOVE: usize = 2;
const MULTI_MERGE: usize = 3;
const CLEAR: usize = 4;
const GET_ALL_KEYS: usize = 5;

/// Native key/value storage module.
pub struct AsyncLocalStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl AsyncLocalStorage {
    /// Create an empty store
    pub fn new() -> Self {
        AsyncLocalStorage {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Read a value directly
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn multi_get(&self, keys: &[Value]) -> (Vec<Value>, Vec<Value>) {
        let entries = self.entries.lock();
        let mut errors = Vec::new();
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            match key.as_str() {
                Some(key) => {
                    let value = entries.get(key).map_or(Value::Null, |v| json!(v));
                    result.push(json!([key, value]));
                }
                None => errors.push(key_error(key)),
            }
        }
        (errors, result)
    }

    fn multi_set(&self, pairs: &[Value]) -> Vec<Value> {
        let mut entries = self.entries.lock();
        let mut errors = Vec::new();
        for pair in pairs {
            match as_pair(pair) {
                Some((key, value)) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                None => errors.push(pair_error(pair)),
            }
        }
        errors
    }

    fn multi_remove(&self, keys: &[Value]) -> Vec<Value> {
        let mut entries = self.entries.lock();
        let mut errors = Vec::new();
        for key in keys {
            match key.as_str() {
                Some(key) => {
                    entries.remove(key);
                }
                None => errors.push(key_error(key)),
            }
        }
        errors
    }

    fn multi_merge(&self, pairs: &[Value]) -> Vec<Value> {
        let mut entries = self.entries.lock();
        let mut errors = Vec::new();
        for pair in pairs {
            let Some((key, value)) = as_pair(pair) else {
                errors.push(pair_error(pair));
                continue;
            };
            let merged = match entries.get(key) {
                None => Ok(value.to_string()),
                Some(existing) => merge_json(existing, value),
            };
            match merged {
                Ok(merged) => {
                    entries.insert(key.to_string(), merged);
                }
                Err(message) => errors.push(json!({ "message": message, "key": key })),
            }
        }
        errors
    }
}

impl Default for AsyncLocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn as_pair(pair: &Value) -> Option<(&str, &str)> {
    match pair.as_array()?.as_slice() {
        [key, value] => Some((key.as_str()?, value.as_str()?)),
        _ => None,
    }
}

fn key_error(key: &Value) -> Value {
    json!({ "message": format!("Invalid key: {}", key) })
}

fn pair_error(pair: &Value) -> Value {
    json!({ "message": format!("Invalid key-value pair: {}", pair) })
}

fn errors_value(errors: Vec<Value>) -> Value {
    if errors.is_empty() {
        Value::Null
    } else {
        Value::Array(errors)
    }
}

/// Deep-merge two JSON object strings, `patch` winning on conflicts.
fn merge_json(existing: &str, patch: &str) -> Result<String, String> {
    let mut base: Value =
        serde_json::from_str(existing).map_err(|e| format!("Stored value is not JSON: {}", e))?;
    let patch: Value = serde_json::from_str(patch).map_err(|e| format!("Merge value is not JSON: {}", e))?;
    if !base.is_object() || !patch.is_object() {
        return Err("Only JSON objects can be merged".to_string());
    }
    deep_merge(&mut base, patch);
    Ok(base.to_string())
}

fn deep_merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                match base.get_mut(&key) {
                    Some(existing) if nested => deep_merge(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

impl NativeModule for AsyncLocalStorage {
    fn name(&self) -> &str {
        "AsyncLocalStorage"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::method("multiGet"),
            MethodInfo::method("multiSet"),
            MethodInfo::method("multiRemove"),
            MethodInfo::method("multiMerge"),
            MethodInfo::method("clear"),
            MethodInfo::method("getAllKeys"),
        ]
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        match method {
            MULTI_GET => {
                let keys: Vec<Value> = args.get(0)?;
                let callback: Callback = args.get(1)?;
                let (errors, result) = self.multi_get(&keys);
                callback.invoke(ctx, vec![errors_value(errors), Value::Array(result)]);
            }
            MULTI_SET | MULTI_REMOVE | MULTI_MERGE => {
                let items: Vec<Value> = args.get(0)?;
                let callback: Option<Callback> = args.opt(1)?;
                let errors = match method {
                    MULTI_SET => self.multi_set(&items),
                    MULTI_REMOVE => self.multi_remove(&items),
                    _ => self.multi_merge(&items),
                };
                if !errors.is_empty() {
                    tracing::warn!("AsyncLocalStorage: {} invalid entries", errors.len());
                }
                if let Some(callback) = callback {
                    callback.invoke(ctx, vec![errors_value(errors)]);
                }
            }
            CLEAR => {
                let callback: Option<Callback> = args.opt(0)?;
                self.entries.lock().clear();
                if let Some(callback) = callback {
                    callback.invoke(ctx, vec![Value::Null]);
                }
            }
            GET_ALL_KEYS => {
                let callback: Callback = args.get(0)?;
                let keys: Vec<Value> = self.entries.lock().keys().map(|k| json!(k)).collect();
                callback.invoke(ctx, vec![Value::Null, Value::Array(keys)]);
            }
            other => return Err(NativeError::UnknownMethod(other)),
        }
        Ok(Value::Null)
    }
}
