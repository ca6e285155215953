//! Call dispatch
//!
//! The executor answers every call with a batch of native calls the script
//! queued in the meantime: `[moduleIDs, methodIndices, params, callId?]`.
//! [`PendingResult::decode`] checks that shape and [`CallDispatcher`] invokes
//! the entries in order against the registry of the generation that asked.

use std::sync::Arc;

use hostbridge_sdk::{BridgeContext, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::registry::ModuleRegistry;

/// Decoded batch of native calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingResult {
    /// Module ID of each call
    pub module_ids: Vec<i64>,
    /// Method index of each call
    pub method_indices: Vec<i64>,
    /// Parameter list of each call
    pub params: Vec<Vec<Value>>,
    /// Script-side call counter, when present
    pub call_id: Option<i64>,
}

impl PendingResult {
    /// Build a batch, checking that the sequences line up
    pub fn new(module_ids: Vec<i64>, method_indices: Vec<i64>, params: Vec<Vec<Value>>) -> BridgeResult<Self> {
        if module_ids.len() != method_indices.len() || module_ids.len() != params.len() {
            return Err(BridgeError::MalformedBatch(format!(
                "sequence lengths differ: {} module IDs, {} method indices, {} parameter lists",
                module_ids.len(),
                method_indices.len(),
                params.len()
            )));
        }
        Ok(PendingResult {
            module_ids,
            method_indices,
            params,
            call_id: None,
        })
    }

    /// Decode an executor response; `null` means there is nothing to do.
    pub fn decode(value: &Value) -> BridgeResult<Option<Self>> {
        let parts = match value {
            Value::Null => return Ok(None),
            Value::Array(parts) => parts,
            other => {
                return Err(BridgeError::MalformedBatch(format!(
                    "expected an array, got {}",
                    hostbridge_sdk::type_name(other)
                )))
            }
        };
        if parts.len() < 3 {
            return Err(BridgeError::MalformedBatch(format!(
                "expected at least 3 elements, got {}",
                parts.len()
            )));
        }

        let module_ids = integers(&parts[0], "module IDs")?;
        let method_indices = integers(&parts[1], "method indices")?;
        let params = sequence(&parts[2], "parameter lists")?
            .iter()
            .enumerate()
            .map(|(i, p)| match p {
                Value::Array(list) => Ok(list.clone()),
                other => Err(BridgeError::MalformedBatch(format!(
                    "parameter list {} is {}, not an array",
                    i,
                    hostbridge_sdk::type_name(other)
                ))),
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        let mut batch = Self::new(module_ids, method_indices, params)?;
        batch.call_id = parts.get(3).and_then(Value::as_i64);
        Ok(Some(batch))
    }

    /// Number of calls
    pub fn len(&self) -> usize {
        self.module_ids.len()
    }

    /// Check if the batch has no calls
    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }
}

fn sequence<'a>(value: &'a Value, what: &str) -> BridgeResult<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        BridgeError::MalformedBatch(format!("{} is {}, not an array", what, hostbridge_sdk::type_name(value)))
    })
}

fn integers(value: &Value, what: &str) -> BridgeResult<Vec<i64>> {
    sequence(value, what)?
        .iter()
        .map(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| BridgeError::MalformedBatch(format!("{} contain non-integer {}", what, v)))
        })
        .collect()
}

/// Outcome of processing one batch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Calls that reached their handler successfully
    pub invoked: usize,
    /// Calls that could not be resolved or whose handler failed
    pub failures: Vec<BridgeError>,
}

impl DispatchReport {
    /// Check if every call succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatches decoded batches against one registry.
#[derive(Debug, Clone)]
pub struct CallDispatcher {
    registry: Arc<ModuleRegistry>,
}

impl CallDispatcher {
    /// Create a dispatcher for a published registry
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        CallDispatcher { registry }
    }

    /// The registry calls are resolved against
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Invoke every call of `batch` in order.
    ///
    /// A batch requested under another generation is discarded whole. Within
    /// a batch, unresolved calls and failing handlers are reported and the
    /// remaining calls still run.
    pub fn process(
        &self,
        ctx: &dyn BridgeContext,
        batch: &PendingResult,
        origin_generation: u64,
    ) -> BridgeResult<DispatchReport> {
        let current = self.registry.generation();
        if origin_generation != current {
            return Err(BridgeError::StaleBatch {
                batch: origin_generation,
                current,
            });
        }

        let mut report = DispatchReport::default();
        let calls = batch.module_ids.iter().zip(&batch.method_indices).zip(&batch.params);
        for ((&module_id, &method_index), params) in calls {
            let outcome = self
                .registry
                .resolve(module_id, method_index)
                .and_then(|(module, method)| {
                    tracing::debug!("Calling {}.{}", module.name(), method.name());
                    method.invoke(module.module().as_ref(), ctx, params)
                });
            match outcome {
                Ok(_) => report.invoked += 1,
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        Ok(report)
    }

    /// Decode and process an executor response
    pub fn process_json(
        &self,
        ctx: &dyn BridgeContext,
        response: &Value,
        origin_generation: u64,
    ) -> BridgeResult<DispatchReport> {
        match PendingResult::decode(response)? {
            Some(batch) => self.process(ctx, &batch, origin_generation),
            None => Ok(DispatchReport::default()),
        }
    }
}
