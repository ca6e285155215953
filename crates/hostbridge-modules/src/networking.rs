//! Networking: script-initiated HTTP requests
//!
//! `sendRequest(query, responseSender)` answers with a request ID right
//! away and runs the request on its own thread. Progress is reported as
//! device events:
//!
//! - `didReceiveNetworkResponse` `[id, status, headers, url]`
//! - `didReceiveNetworkData` `[id, text]`
//! - `didCompleteNetworkResponse` `[id, error-or-null]`
//!
//! An aborted request reports nothing further.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use hostbridge_sdk::{
    json, Args, BridgeContext, Callback, Map, MethodInfo, NativeError, NativeModule, NativeResult, Value,
};
use parking_lot::Mutex;
use url::Url;

use crate::http::{self, HttpRequest, HttpResponse};

/// Event carrying status and headers
pub const RESPONSE_EVENT: &str = "didReceiveNetworkResponse";
/// Event carrying the body text
pub const DATA_EVENT: &str = "didReceiveNetworkData";
/// Final event of every request that was not aborted
pub const COMPLETE_EVENT: &str = "didCompleteNetworkResponse";

const SEND_REQUEST: usize = 0;
const ABORT_REQUEST: usize = 1;

/// Native networking module.
pub struct Networking {
    next_id: AtomicU64,
    in_flight: Arc<Mutex<HashSet<u64>>>,
    bridge: Mutex<Option<Arc<dyn BridgeContext>>>,
}

impl Networking {
    /// Create the module; requests are accepted once the bridge is attached
    pub fn new() -> Self {
        Networking {
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            bridge: Mutex::new(None),
        }
    }

    /// Number of requests started and neither finished nor aborted
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Hand out a request ID through `response_sender`, then run the request.
    /// The ID always reaches the script ahead of the request's events.
    fn start(&self, ctx: &dyn BridgeContext, request: HttpRequest, response_sender: Callback) -> NativeResult<()> {
        let bridge = self
            .bridge
            .lock()
            .clone()
            .ok_or_else(|| NativeError::ModuleError("network used before bridge was attached".to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.in_flight.lock().insert(id);
        response_sender.invoke(ctx, vec![json!(id)]);

        let in_flight = self.in_flight.clone();
        let spawned = thread::Builder::new()
            .name("hostbridge-net".to_string())
            .spawn(move || {
                tracing::debug!("Request {}: {} {}", id, request.method, request.url);
                let result = http::send(&request);
                if !in_flight.lock().remove(&id) {
                    tracing::debug!("Request {} was aborted", id);
                    return;
                }
                match result {
                    Ok(response) => report_response(bridge.as_ref(), id, &request.url, response),
                    Err(e) => {
                        tracing::debug!("Request {} failed: {}", id, e);
                        bridge.emit_device_event(COMPLETE_EVENT, json!([id, e.to_string()]));
                    }
                }
            });
        if let Err(e) = spawned {
            self.in_flight.lock().remove(&id);
            return Err(NativeError::ModuleError(format!("cannot start request thread: {}", e)));
        }
        Ok(())
    }
}

impl Default for Networking {
    fn default() -> Self {
        Self::new()
    }
}

fn report_response(bridge: &dyn BridgeContext, id: u64, url: &Url, response: HttpResponse) {
    let mut headers = Map::new();
    for (name, value) in response.headers {
        match headers.get_mut(&name) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                headers.insert(name, Value::String(value));
            }
        }
    }
    bridge.emit_device_event(RESPONSE_EVENT, json!([id, response.status, headers, url.as_str()]));
    bridge.emit_device_event(DATA_EVENT, json!([id, String::from_utf8_lossy(&response.body)]));
    bridge.emit_device_event(COMPLETE_EVENT, json!([id, null]));
}

/// Build a request from the script's query object
fn parse_query(query: &Map<String, Value>) -> NativeResult<HttpRequest> {
    let url = query
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| NativeError::ArgumentError("request has no url".to_string()))?;
    let url = Url::parse(url).map_err(|e| NativeError::ArgumentError(format!("bad url '{}': {}", url, e)))?;
    let method = query
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_uppercase();

    let mut headers = Vec::new();
    if let Some(Value::Object(map)) = query.get("headers") {
        for (name, value) in map {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            headers.push((name.clone(), value));
        }
    }

    // `data` is either the body text or `{ "string": text }`.
    let body = match query.get("data") {
        Some(Value::String(text)) => text.clone().into_bytes(),
        Some(Value::Object(data)) => data
            .get("string")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .as_bytes()
            .to_vec(),
        _ => Vec::new(),
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

impl NativeModule for Networking {
    fn name(&self) -> &str {
        "Networking"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![MethodInfo::method("sendRequest"), MethodInfo::method("abortRequest")]
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        *self.bridge.lock() = Some(bridge);
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        match method {
            SEND_REQUEST => {
                let query: Map<String, Value> = args.get(0)?;
                let response_sender: Callback = args.get(1)?;
                self.start(ctx, parse_query(&query)?, response_sender)?;
            }
            ABORT_REQUEST => {
                let id: u64 = args.get(0)?;
                if self.in_flight.lock().remove(&id) {
                    tracing::debug!("Aborting request {}", id);
                }
            }
            other => return Err(NativeError::UnknownMethod(other)),
        }
        Ok(Value::Null)
    }
}
