//! Integration tests for the bridge lifecycle: init, ready, reload, shutdown

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use common::{bundle_url, MissingSource, Recorder, ScriptedRuntime, StaticSource};
use hostbridge_core::{
    Bridge, BridgeBuilder, BridgeConfig, BridgeError, BridgeState, CallDispatcher, ConfigPayload, Discovered,
    ExecutorError, ExecutorFactory, Library, LogErrorSurface, PendingResult, PluginDiscovery, PluginModule,
    CONFIG_GLOBAL,
};
use hostbridge_sdk::testing::RecordingContext;
use hostbridge_sdk::{json, BridgeContext, MethodInfo, ModuleExport, NativeModule, Value};
use parking_lot::Mutex;

const BUNDLE: &str = "require('app')";
const WAIT: Duration = Duration::from_secs(2);

fn config() -> BridgeConfig {
    BridgeConfig {
        executor_name: "Scripted".to_string(),
        plugins_path: PathBuf::from("/nonexistent/plugins"),
        ..BridgeConfig::new(bundle_url())
    }
}

fn builder(runtime: &ScriptedRuntime, surface: &Arc<LogErrorSurface>) -> BridgeBuilder {
    let runtime = runtime.clone();
    Bridge::builder(config())
        .register_executor("Scripted", move |_| Ok(runtime.executor()))
        .source_fetcher(Arc::new(StaticSource(BUNDLE)))
        .error_surface(surface.clone())
}

fn ready_events(bridge: &mut Bridge) -> Arc<Mutex<Vec<bool>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    bridge.on_ready_changed(move |ready| sink.lock().push(ready));
    events
}

#[test]
fn test_ready_after_drain() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    let events = ready_events(&mut bridge);

    bridge.init().unwrap();
    assert_eq!(bridge.state(), BridgeState::Running);
    assert!(!bridge.ready());

    assert!(bridge.run_until_ready(WAIT).unwrap());
    assert_eq!(*events.lock(), vec![true]);
    assert_eq!(bridge.executor_name(), Some("Scripted"));

    {
        let log = runtime.log.lock();
        assert_eq!(log.injected.len(), 1);
        assert_eq!(log.injected[0].0, CONFIG_GLOBAL);
        assert_eq!(log.scripts, vec![(BUNDLE.to_string(), bundle_url().to_string())]);
    }
    assert_eq!(runtime.call_methods(), vec!["flushedQueue"]);
    assert_eq!(bridge.source_code().unwrap().source().as_deref(), Some(BUNDLE));

    // Nothing else happens, readiness does not fire again.
    bridge.pump();
    assert_eq!(*events.lock(), vec![true]);
    assert_eq!(surface.last_error(), None);
}

#[test]
fn test_injected_payload_lists_synthetic_modules_last() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    bridge.init().unwrap();

    let payload = ConfigPayload::from_json(&runtime.injected_config().unwrap()).unwrap();
    let names: Vec<&str> = payload.module_names().collect();
    assert_eq!(names.first(), Some(&"Timing"));
    assert_eq!(&names[names.len() - 2..], &["SourceCode", "UIManager"]);
    assert_eq!(names.len(), bridge.modules().unwrap().len());

    let ui = bridge.modules().unwrap();
    let ui = ui.by_name("UIManager").unwrap();
    for view in ["RCTView", "RCTRawText", "RCTText", "RCTImageView"] {
        assert!(ui.constants().contains_key(view), "{} missing from UIManager constants", view);
    }
    let source = payload.remote_module_config.get("SourceCode").unwrap();
    assert_eq!(source.constants.get("scriptURL"), Some(&json!(bundle_url().as_str())));
}

#[test]
fn test_drain_batch_is_dispatched_before_ready() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let echo = Recorder::new("Echo", vec![MethodInfo::method("say")]);
    let calls = echo.calls();
    let echo: Arc<dyn NativeModule> = Arc::new(echo);
    let mut bridge = builder(&runtime, &surface)
        .internal_modules(move || vec![echo.clone()])
        .build();

    runtime.push_batch(json!([[0], [0], [["hi"]]]));
    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    assert_eq!(*calls.lock(), vec![(0, vec![json!("hi")])]);
}

#[test]
fn test_module_callbacks_reach_the_script() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let store: Arc<dyn NativeModule> = Arc::new(Recorder::new("Store", vec![MethodInfo::promise("load")]));
    let mut bridge = builder(&runtime, &surface)
        .internal_modules(move || vec![store.clone()])
        .build();

    runtime.push_batch(json!([[0], [0], [["k", 5, 6]]]));
    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());

    let log = runtime.log.lock();
    assert_eq!(
        log.calls.last(),
        Some(&(
            "invokeCallbackAndReturnFlushedQueue".to_string(),
            vec![json!(5), json!(["k"])]
        ))
    );
}

#[test]
fn test_host_calls_go_through_call_function() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());

    bridge
        .enqueue_script_call("AppRegistry", "runApplication", vec![json!("App")])
        .unwrap();
    bridge.pump();

    let log = runtime.log.lock();
    assert_eq!(
        log.calls.last(),
        Some(&(
            "callFunctionReturnFlushedQueue".to_string(),
            vec![json!("AppRegistry"), json!("runApplication"), json!(["App"])]
        ))
    );
}

#[test]
fn test_reload_starts_a_new_generation() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    let events = ready_events(&mut bridge);

    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    let old_generation = bridge.generation();
    let old_handle = bridge.context().unwrap();

    // Queued before the reload, handled after it.
    old_handle.report_error("from the old generation");

    bridge.reload().unwrap();
    assert!(!bridge.ready());
    assert_eq!(bridge.generation(), old_generation + 1);
    assert!(!old_handle.is_current());

    assert!(bridge.run_until_ready(WAIT).unwrap());
    assert_eq!(*events.lock(), vec![true, false, true]);
    assert_eq!(surface.last_error(), None);
    assert_eq!(runtime.log.lock().injected.len(), 2);
    assert_eq!(runtime.call_methods(), vec!["flushedQueue", "flushedQueue"]);

    // Batches tagged with the old generation are discarded.
    let dispatcher = CallDispatcher::new(bridge.modules().unwrap());
    let batch = PendingResult::new(vec![0], vec![0], vec![vec![]]).unwrap();
    assert!(matches!(
        dispatcher.process(&RecordingContext::new(), &batch, old_generation),
        Err(BridgeError::StaleBatch { .. })
    ));
}

/// Serves one recorder module per generation, bound to an already loaded
/// system library.
#[cfg(target_os = "linux")]
struct SystemLibraryDiscovery(Arc<Library>);

#[cfg(target_os = "linux")]
impl PluginDiscovery for SystemLibraryDiscovery {
    fn discover(&self, _path: &Path) -> Discovered {
        let module = Arc::new(Recorder::new("PluginRecorder", vec![MethodInfo::method("record")]));
        Discovered {
            exports: vec![ModuleExport::Module(Arc::new(PluginModule::new(module, self.0.clone())))],
            libraries: vec![self.0.clone()],
        }
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_plugin_library_outlives_held_registry_across_reload() {
    let library = Arc::new(Library::open("libc.so.6").unwrap());
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface)
        .plugin_discovery(SystemLibraryDiscovery(library.clone()))
        .build();

    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    let held = bridge.modules().unwrap();
    assert!(held.by_name("PluginRecorder").is_some());

    bridge.reload().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    bridge.shutdown();

    // Only the registry kept from the first generation still refers to it.
    assert_eq!(Arc::strong_count(&library), 2);
    drop(held);
    assert_eq!(Arc::strong_count(&library), 1);
}

#[test]
fn test_stale_handle_commands_are_dropped() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    let old_handle = bridge.context().unwrap();

    bridge.reload().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    let calls_before = runtime.call_methods().len();

    old_handle.enqueue_script_call("RCTDeviceEventEmitter", "emit", vec![json!("late")]);
    old_handle.invoke_callback(1, vec![]);
    bridge.pump();
    assert_eq!(runtime.call_methods().len(), calls_before);

    let current = bridge.context().unwrap();
    current.emit_device_event("ping", Value::Null);
    bridge.pump();
    assert_eq!(runtime.call_methods().len(), calls_before + 1);
}

#[test]
fn test_fatal_exception_reaches_error_surface() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    bridge.init().unwrap();

    let (id, index) = ConfigPayload::from_json(&runtime.injected_config().unwrap())
        .unwrap()
        .lookup("ExceptionsManager", "reportFatalException")
        .unwrap();
    runtime.push_batch(json!([[id], [index], [["undefined is not a function", [], 1]]]));

    assert!(bridge.run_until_ready(WAIT).unwrap());
    let shown = surface.last_error().unwrap();
    assert!(shown.contains("undefined is not a function"), "{}", shown);
}

#[test]
fn test_call_sync_only_accepts_sync_methods() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let clock: Arc<dyn NativeModule> = Arc::new(Recorder::new(
        "Clock",
        vec![MethodInfo::sync("now"), MethodInfo::method("tick")],
    ));
    let mut bridge = builder(&runtime, &surface)
        .internal_modules(move || vec![clock.clone()])
        .build();

    assert!(matches!(bridge.call_sync(0, 0, vec![]), Err(BridgeError::InvalidState(_))));
    bridge.init().unwrap();

    assert_eq!(bridge.call_sync(0, 0, vec![json!(1234)]).unwrap(), json!(1234));
    assert!(matches!(bridge.call_sync(0, 1, vec![]), Err(BridgeError::InvalidState(_))));
    assert!(matches!(
        bridge.call_sync(40, 0, vec![]),
        Err(BridgeError::UnresolvedCall { .. })
    ));
}

#[test]
fn test_unknown_executor_falls_back_to_default() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let rt = runtime.clone();
    let mut factory = ExecutorFactory::empty("Scripted");
    factory.register("Scripted", move |_| Ok(rt.executor()));

    let mut bridge = Bridge::builder(BridgeConfig {
        executor_name: "Missing".to_string(),
        ..config()
    })
    .executor_factory(factory)
    .source_fetcher(Arc::new(StaticSource(BUNDLE)))
    .error_surface(surface.clone())
    .build();

    bridge.init().unwrap();
    assert_eq!(bridge.executor_name(), Some("Scripted"));
}

#[test]
fn test_no_executor_aborts_init() {
    let mut bridge = Bridge::builder(config())
        .executor_factory(ExecutorFactory::empty("Scripted"))
        .source_fetcher(Arc::new(StaticSource(BUNDLE)))
        .build();

    let err = bridge.init().unwrap_err();
    assert!(matches!(err, BridgeError::NoExecutor { .. }));
    assert!(err.is_critical());
    assert_eq!(bridge.state(), BridgeState::Uninitialized);
    assert!(bridge.modules().is_none());
}

#[test]
fn test_missing_bundle_url_is_a_config_error() {
    let runtime = ScriptedRuntime::new();
    let rt = runtime.clone();
    let mut bridge = Bridge::builder(BridgeConfig {
        bundle_url: None,
        ..config()
    })
    .register_executor("Scripted", move |_| Ok(rt.executor()))
    .build();

    assert!(matches!(bridge.init(), Err(BridgeError::Config(_))));
    bridge.set_bundle_url(bundle_url());
    bridge.init().unwrap();
    assert_eq!(bridge.state(), BridgeState::Running);
}

#[test]
fn test_fetch_failure_keeps_bridge_not_ready() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface)
        .source_fetcher(Arc::new(MissingSource))
        .build();

    bridge.init().unwrap();
    assert!(!bridge.run_until_ready(Duration::from_millis(100)).unwrap());
    assert!(!bridge.ready());
    let shown = surface.last_error().unwrap();
    assert!(shown.starts_with("Failed to load source code"), "{}", shown);
    assert!(runtime.log.lock().scripts.is_empty());
}

#[test]
fn test_script_failure_is_surfaced() {
    let runtime = ScriptedRuntime::new();
    runtime.fail_script(ExecutorError::Script("SyntaxError".to_string()));
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();

    bridge.init().unwrap();
    assert!(!bridge.run_until_ready(Duration::from_millis(100)).unwrap());
    assert!(surface.last_error().unwrap().contains("SyntaxError"));
    assert!(runtime.call_methods().is_empty());
}

#[test]
fn test_failed_drain_keeps_bridge_not_ready() {
    let runtime = ScriptedRuntime::new();
    runtime.push_error(ExecutorError::Closed("gone".to_string()));
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();

    bridge.init().unwrap();
    assert!(!bridge.run_until_ready(Duration::from_millis(100)).unwrap());
    assert!(surface.last_error().unwrap().contains("gone"));
}

#[test]
fn test_shutdown_invalidates_handles() {
    let runtime = ScriptedRuntime::new();
    let surface = Arc::new(LogErrorSurface::new());
    let mut bridge = builder(&runtime, &surface).build();
    let events = ready_events(&mut bridge);
    bridge.init().unwrap();
    assert!(bridge.run_until_ready(WAIT).unwrap());
    let handle = bridge.context().unwrap();

    bridge.shutdown();
    assert_eq!(bridge.state(), BridgeState::Destroyed);
    assert!(!handle.is_current());
    assert!(bridge.modules().is_none());
    assert_eq!(*events.lock(), vec![true, false]);
    assert!(matches!(bridge.init(), Err(BridgeError::InvalidState(_))));
    assert!(matches!(bridge.reload(), Err(BridgeError::InvalidState(_))));
}
