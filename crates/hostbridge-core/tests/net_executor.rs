//! NetExecutor against a local WebSocket server speaking the proxy protocol

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use hostbridge_core::executor::{CALL_FUNCTION_RETURN_FLUSHED_QUEUE, FLUSHED_QUEUE};
use hostbridge_core::{
    Bridge, BridgeConfig, BridgeError, Executor, ExecutorConfig, ExecutorError, ExecutorFactory, LogErrorSurface,
    NetExecutor, CONFIG_GLOBAL,
};
use hostbridge_sdk::{json, Value};
use tungstenite::Message;
use url::Url;

/// Accept one connection and answer every request through `answer`.
///
/// Returns the proxy URL and a channel carrying every request received.
fn serve<F>(answer: F) -> (String, Receiver<Value>)
where
    F: Fn(&str, &Value) -> Value + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = channel::unbounded();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        loop {
            let text = match socket.read() {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            let request: Value = serde_json::from_str(&text).unwrap();
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let mut reply = answer(&method, &request);
            reply["replyID"] = request["id"].clone();
            let _ = tx.send(request);
            if socket.send(Message::Text(reply.to_string())).is_err() {
                break;
            }
        }
    });

    (format!("ws://{}/debugger-proxy?role=client", addr), rx)
}

fn runtime_answer(method: &str, _request: &Value) -> Value {
    match method {
        CALL_FUNCTION_RETURN_FLUSHED_QUEUE => json!({ "result": "[[0],[1],[[\"x\"]]]" }),
        FLUSHED_QUEUE => json!({ "result": null }),
        _ => json!({}),
    }
}

fn executor_config(proxy_url: String) -> ExecutorConfig {
    ExecutorConfig {
        proxy_url,
        connect_timeout_ms: 2000,
    }
}

#[test]
fn test_protocol_exchange() {
    let (url, requests) = serve(runtime_answer);
    let mut executor = NetExecutor::new(&executor_config(url)).unwrap();
    executor.init().unwrap();

    executor.inject_json(CONFIG_GLOBAL, "{\"remoteModuleConfig\":{}}".to_string());
    executor
        .execute_application_script("ignored".to_string(), "http://localhost:8081/index.bundle")
        .wait()
        .unwrap();
    assert_eq!(executor.execute_call(FLUSHED_QUEUE, vec![]).wait(), Ok(Value::Null));
    assert_eq!(
        executor
            .execute_call(
                CALL_FUNCTION_RETURN_FLUSHED_QUEUE,
                vec![json!("AppRegistry"), json!("runApplication"), json!([])]
            )
            .wait(),
        Ok(json!([[0], [1], [["x"]]]))
    );

    let received: Vec<Value> = requests.try_iter().collect();
    let methods: Vec<&str> = received.iter().map(|r| r["method"].as_str().unwrap()).collect();
    assert_eq!(
        methods,
        vec![
            "prepareJSRuntime",
            "executeApplicationScript",
            FLUSHED_QUEUE,
            CALL_FUNCTION_RETURN_FLUSHED_QUEUE
        ]
    );
    assert_eq!(received[1]["url"], json!("http://localhost:8081/index.bundle"));
    assert_eq!(
        received[1]["inject"][CONFIG_GLOBAL],
        json!("{\"remoteModuleConfig\":{}}")
    );
    assert_eq!(received[3]["arguments"][1], json!("runApplication"));

    // Request IDs increase in submission order.
    let ids: Vec<u64> = received.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn test_error_reply_fails_the_call() {
    let (url, _requests) = serve(|method, _| match method {
        FLUSHED_QUEUE => json!({ "error": "ReferenceError: __fbBatchedBridge is not defined" }),
        _ => json!({}),
    });
    let mut executor = NetExecutor::new(&executor_config(url)).unwrap();
    executor.init().unwrap();

    let result = executor.execute_call(FLUSHED_QUEUE, vec![]).wait();
    assert!(matches!(result, Err(ExecutorError::Script(ref m)) if m.contains("ReferenceError")));
}

#[test]
fn test_unreachable_runtime_fails_construction() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = executor_config(format!("ws://{}/debugger-proxy", addr));

    let mut executor = NetExecutor::new(&config).unwrap();
    assert!(matches!(executor.init(), Err(ExecutorError::Connect(_))));

    let err = ExecutorFactory::new().construct("NetExecutor", &config).unwrap_err();
    assert!(matches!(err, BridgeError::ExecutorConstruction { .. }));
}

#[test]
fn test_bridge_reaches_ready_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("index.bundle");
    std::fs::write(&bundle, "__fbBatchedBridge.flushedQueue();").unwrap();

    let (url, requests) = serve(runtime_answer);
    let config = BridgeConfig {
        plugins_path: dir.path().join("plugins"),
        executor: executor_config(url),
        ..BridgeConfig::new(Url::from_file_path(&bundle).unwrap())
    };
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = Bridge::builder(config).error_surface(surface.clone()).build();

    bridge.init().unwrap();
    assert!(bridge.run_until_ready(Duration::from_secs(5)).unwrap(), "{:?}", surface.last_error());
    assert_eq!(bridge.executor_name(), Some("NetExecutor"));

    let received: Vec<Value> = requests.try_iter().collect();
    let script = received
        .iter()
        .find(|r| r["method"] == json!("executeApplicationScript"))
        .unwrap();
    let payload: Value = serde_json::from_str(script["inject"][CONFIG_GLOBAL].as_str().unwrap()).unwrap();
    assert!(payload["remoteModuleConfig"]["UIManager"].is_object());
    assert_eq!(
        bridge.source_code().unwrap().source().as_deref(),
        Some("__fbBatchedBridge.flushedQueue();")
    );
}
