//! NetExecutor: script runtime on the far side of a WebSocket
//!
//! Speaks the debugger-proxy protocol. Every request is a JSON text frame
//! carrying an `id`; the runtime answers with `replyID` set to that id and
//! either a `result` (a JSON string holding the call's return value) or an
//! `error`. One worker thread owns the socket and handles requests strictly
//! one at a time, so replies come back in submission order.

use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use hostbridge_sdk::{json, Map, Value};
use tungstenite::client::IntoClientRequest;
use tungstenite::{Message, WebSocket};
use url::Url;

use crate::completion::{completion, Completion, Resolver};
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;

use super::Executor;

type Socket = WebSocket<TcpStream>;

enum Reply {
    Unit(Resolver<()>),
    Value(Resolver<Value>),
}

impl Reply {
    fn fail(self, error: ExecutorError) {
        match self {
            Reply::Unit(r) => r.reject(error),
            Reply::Value(r) => r.reject(error),
        }
    }

    fn settle(self, reply: Result<Value, ExecutorError>) {
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return self.fail(e),
        };
        if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
            let message = error.as_str().map_or_else(|| error.to_string(), str::to_string);
            return self.fail(ExecutorError::Script(message));
        }
        match self {
            Reply::Unit(r) => r.resolve(()),
            Reply::Value(r) => r.settle(decode_result(reply.get("result"))),
        }
    }
}

/// `result` is normally a JSON string holding the value
fn decode_result(result: Option<&Value>) -> Result<Value, ExecutorError> {
    match result {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(text)) => serde_json::from_str(text)
            .map_err(|e| ExecutorError::Protocol(format!("result is not JSON: {}", e))),
        Some(other) => Ok(other.clone()),
    }
}

struct Job {
    message: Map<String, Value>,
    reply: Reply,
}

/// Executor backed by a remote script runtime.
pub struct NetExecutor {
    proxy_url: Url,
    connect_timeout: Duration,
    injected: Map<String, Value>,
    jobs: Option<Sender<Job>>,
    stream: Option<TcpStream>,
}

impl NetExecutor {
    /// Validate the proxy URL; nothing is connected until `init()`
    pub fn new(config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        let proxy_url = Url::parse(&config.proxy_url)
            .map_err(|e| ExecutorError::Connect(format!("invalid proxy URL '{}': {}", config.proxy_url, e)))?;
        if proxy_url.scheme() != "ws" {
            return Err(ExecutorError::Connect(format!(
                "unsupported scheme '{}' in proxy URL (only ws:// is supported)",
                proxy_url.scheme()
            )));
        }
        Ok(NetExecutor {
            proxy_url,
            connect_timeout: config.connect_timeout(),
            injected: Map::new(),
            jobs: None,
            stream: None,
        })
    }

    /// The proxy this executor talks to
    pub fn proxy_url(&self) -> &Url {
        &self.proxy_url
    }

    fn connect(&self) -> Result<Socket, ExecutorError> {
        let connect_err = |e: &dyn std::fmt::Display| ExecutorError::Connect(format!("{}: {}", self.proxy_url, e));

        let addrs = self.proxy_url.socket_addrs(|| Some(80)).map_err(|e| connect_err(&e))?;
        let mut last_error = None;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let stream = match (stream, last_error) {
            (Some(stream), _) => stream,
            (None, Some(e)) => return Err(connect_err(&e)),
            (None, None) => return Err(connect_err(&"no address")),
        };
        stream.set_nodelay(true).map_err(|e| connect_err(&e))?;
        stream
            .set_read_timeout(Some(self.connect_timeout))
            .map_err(|e| connect_err(&e))?;

        let request = self
            .proxy_url
            .as_str()
            .into_client_request()
            .map_err(|e| connect_err(&e))?;
        let (socket, _response) =
            tungstenite::client(request, stream).map_err(|e| connect_err(&format!("handshake failed: {}", e)))?;
        Ok(socket)
    }

    fn submit(&self, message: Map<String, Value>, reply: Reply) {
        let Some(jobs) = &self.jobs else {
            return reply.fail(ExecutorError::Closed("executor is not initialized".to_string()));
        };
        if let Err(channel::SendError(job)) = jobs.send(Job { message, reply }) {
            job.reply.fail(ExecutorError::Closed("executor worker has stopped".to_string()));
        }
    }
}

impl Executor for NetExecutor {
    fn name(&self) -> &str {
        "NetExecutor"
    }

    fn init(&mut self) -> Result<(), ExecutorError> {
        let mut socket = self.connect()?;
        tracing::info!("Connected to script runtime at {}", self.proxy_url);

        let mut prepare = Map::new();
        prepare.insert("method".to_string(), json!("prepareJSRuntime"));
        let reply = exchange(&mut socket, 0, prepare)?;
        if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
            return Err(ExecutorError::Script(format!("prepareJSRuntime failed: {}", error)));
        }

        // Calls may legitimately run for a long time once the runtime is up.
        socket
            .get_ref()
            .set_read_timeout(None)
            .map_err(|e| ExecutorError::Connect(e.to_string()))?;
        self.stream = socket.get_ref().try_clone().ok();

        let (tx, rx) = channel::unbounded();
        thread::Builder::new()
            .name("hostbridge-net-executor".to_string())
            .spawn(move || run_worker(socket, rx))
            .map_err(|e| ExecutorError::Connect(format!("cannot start worker: {}", e)))?;
        self.jobs = Some(tx);
        Ok(())
    }

    fn inject_json(&mut self, name: &str, payload: String) {
        self.injected.insert(name.to_string(), Value::String(payload));
    }

    fn execute_application_script(&mut self, _code: String, url: &str) -> Completion<()> {
        // The runtime loads the bundle from `url` itself.
        let mut message = Map::new();
        message.insert("method".to_string(), json!("executeApplicationScript"));
        message.insert("url".to_string(), json!(url));
        message.insert("inject".to_string(), Value::Object(self.injected.clone()));

        let (resolver, completion) = completion();
        self.submit(message, Reply::Unit(resolver));
        completion
    }

    fn execute_call(&mut self, method: &str, args: Vec<Value>) -> Completion<Value> {
        let mut message = Map::new();
        message.insert("method".to_string(), json!(method));
        message.insert("arguments".to_string(), Value::Array(args));

        let (resolver, completion) = completion();
        self.submit(message, Reply::Value(resolver));
        completion
    }
}

impl Drop for NetExecutor {
    fn drop(&mut self) {
        self.jobs.take();
        // Wakes the worker if it is blocked on a reply.
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn run_worker(mut socket: Socket, jobs: Receiver<Job>) {
    let mut next_id = 0u64;
    for job in jobs.iter() {
        next_id += 1;
        let reply = exchange(&mut socket, next_id, job.message);
        if let Err(e) = &reply {
            tracing::error!("Script runtime request {} failed: {}", next_id, e);
        }
        job.reply.settle(reply);
    }
    let _ = socket.close(None);
    let _ = socket.flush();
    tracing::debug!("NetExecutor worker stopped");
}

/// Send one request and wait for the reply carrying its id
fn exchange(socket: &mut Socket, id: u64, mut message: Map<String, Value>) -> Result<Value, ExecutorError> {
    message.insert("id".to_string(), json!(id));
    socket
        .send(Message::Text(Value::Object(message).to_string()))
        .map_err(|e| ExecutorError::Closed(e.to_string()))?;

    loop {
        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => return Err(ExecutorError::Closed("runtime closed the connection".to_string())),
            Ok(_) => continue,
            Err(e) => return Err(ExecutorError::Closed(e.to_string())),
        };
        let reply: Value = serde_json::from_str(&text)
            .map_err(|e| ExecutorError::Protocol(format!("reply is not JSON: {}", e)))?;
        match reply.get("replyID").and_then(Value::as_u64) {
            Some(reply_id) if reply_id == id => return Ok(reply),
            _ => tracing::debug!("Ignoring message without matching replyID: {}", text),
        }
    }
}
