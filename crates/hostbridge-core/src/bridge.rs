//! Bridge lifecycle
//!
//! A [`Bridge`] is driven by one owner thread. `init()` builds the registry
//! and starts loading the bundle; everything after that happens inside
//! [`Bridge::pump`]: commands posted by modules are drained, then pending
//! executor and fetch completions are settled strictly in the order they were
//! submitted. `reload()` throws the whole session away and starts over under
//! a new generation.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Select, Sender};
use hostbridge_modules::{SourceCode, UiManager};
use hostbridge_sdk::{json, BridgeContext, MethodKind, ModuleLoader, NativeModule, Value, ViewConfig};
use parking_lot::Mutex;
use url::Url;

use crate::completion::Completion;
use crate::config::BridgeConfig;
use crate::dispatch::CallDispatcher;
use crate::error::{BridgeError, BridgeResult, ExecutorError};
use crate::executor::{
    Executor, ExecutorFactory, CALL_FUNCTION_RETURN_FLUSHED_QUEUE, FLUSHED_QUEUE,
    INVOKE_CALLBACK_AND_RETURN_FLUSHED_QUEUE,
};
use crate::handle::{BridgeHandle, Command};
use crate::plugin::{DylibDiscovery, PluginDiscovery};
use crate::registry::{ModuleId, ModuleRegistry, CONFIG_GLOBAL};
use crate::source::{FetchError, SourceFetcher, UrlSourceFetcher};

// ============================================================================
// Error surface
// ============================================================================

/// Where user-facing errors end up (the red box).
pub trait ErrorSurface: Send + Sync {
    /// Show `message` to the user
    fn show_error(&self, message: &str);
}

/// Logs errors and remembers the most recent one.
#[derive(Debug, Default)]
pub struct LogErrorSurface {
    last: Mutex<Option<String>>,
}

impl LogErrorSurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Last message shown, if any
    pub fn last_error(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl ErrorSurface for LogErrorSurface {
    fn show_error(&self, message: &str) {
        tracing::error!("{}", message);
        *self.last.lock() = Some(message.to_string());
    }
}

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Created, `init()` not called yet (or it failed)
    Uninitialized,
    /// Inside `init()`
    Initializing,
    /// Session running; see [`Bridge::ready`] for readiness
    Running,
    /// Inside `reload()`
    Reloading,
    /// Shut down; the bridge cannot be used again
    Destroyed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::Initializing => "initializing",
            BridgeState::Running => "running",
            BridgeState::Reloading => "reloading",
            BridgeState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Pending completions
// ============================================================================

enum Pending {
    Source(Completion<Vec<u8>, FetchError>),
    Script(Completion<()>),
    Batch { completion: Completion<Value>, drain: bool },
}

enum Settled {
    Source(Result<Vec<u8>, FetchError>),
    Script(Result<(), ExecutorError>),
    Batch { result: Result<Value, ExecutorError>, drain: bool },
}

struct PendingEntry {
    generation: u64,
    pending: Pending,
}

impl PendingEntry {
    fn try_take(&self) -> Option<Settled> {
        match &self.pending {
            Pending::Source(c) => c.try_take().map(Settled::Source),
            Pending::Script(c) => c.try_take().map(Settled::Script),
            Pending::Batch { completion, drain } => completion.try_take().map(|result| Settled::Batch {
                result,
                drain: *drain,
            }),
        }
    }

    fn watch<'a>(&'a self, select: &mut Select<'a>) {
        match &self.pending {
            Pending::Source(c) => select.recv(c.receiver()),
            Pending::Script(c) => select.recv(c.receiver()),
            Pending::Batch { completion, .. } => select.recv(completion.receiver()),
        };
    }
}

// ============================================================================
// Session
// ============================================================================

/// Modules built for one generation. Plugin modules hold their own library.
struct Modules {
    registry: Arc<ModuleRegistry>,
    source_code: Arc<SourceCode>,
    ui_manager: Arc<UiManager>,
}

/// Everything that belongs to one generation. Field order is drop order.
struct Session {
    executor: Box<dyn Executor>,
    bundle_url: Url,
    handle: Arc<BridgeHandle>,
    dispatcher: CallDispatcher,
    modules: Modules,
}

impl Session {
    fn generation(&self) -> u64 {
        self.modules.registry.generation()
    }

    /// Release the session except for its executor
    fn retire(self) -> Box<dyn Executor> {
        let Session { executor, .. } = self;
        executor
    }
}

/// Registry built for inspection only; no executor, nothing started.
pub struct RegistryPreview {
    registry: Arc<ModuleRegistry>,
}

impl RegistryPreview {
    /// The registry as `init()` would build it
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }
}

impl fmt::Debug for RegistryPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryPreview")
            .field("modules", &self.registry.len())
            .finish()
    }
}

type InternalModules = Box<dyn Fn() -> Vec<Arc<dyn NativeModule>> + Send>;
type ReadyListener = Box<dyn FnMut(bool) + Send>;

// ============================================================================
// Builder
// ============================================================================

/// Configures the collaborators of a [`Bridge`].
pub struct BridgeBuilder {
    config: BridgeConfig,
    executors: ExecutorFactory,
    source_fetcher: Option<Arc<dyn SourceFetcher>>,
    loaders: Vec<Arc<dyn ModuleLoader>>,
    discovery: Box<dyn PluginDiscovery>,
    error_surface: Arc<dyn ErrorSurface>,
    internal_modules: InternalModules,
}

impl BridgeBuilder {
    /// Builder with the default collaborators
    pub fn new(config: BridgeConfig) -> Self {
        BridgeBuilder {
            config,
            executors: ExecutorFactory::new(),
            source_fetcher: Some(Arc::new(UrlSourceFetcher)),
            loaders: Vec::new(),
            discovery: Box::new(DylibDiscovery),
            error_surface: Arc::new(LogErrorSurface::new()),
            internal_modules: Box::new(hostbridge_modules::internal_modules),
        }
    }

    /// Replace the executor factory
    pub fn executor_factory(mut self, executors: ExecutorFactory) -> Self {
        self.executors = executors;
        self
    }

    /// Register an additional executor constructor
    pub fn register_executor<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&crate::config::ExecutorConfig) -> Result<Box<dyn Executor>, ExecutorError> + Send + Sync + 'static,
    {
        self.executors.register(name, constructor);
        self
    }

    /// Use `fetcher` to load bundles
    pub fn source_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.source_fetcher = Some(fetcher);
        self
    }

    /// Build a bridge that has no way to load source code
    pub fn without_source_fetcher(mut self) -> Self {
        self.source_fetcher = None;
        self
    }

    /// Add a statically linked module loader
    pub fn module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Replace plugin discovery
    pub fn plugin_discovery(mut self, discovery: impl PluginDiscovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    /// Replace the error surface
    pub fn error_surface(mut self, surface: Arc<dyn ErrorSurface>) -> Self {
        self.error_surface = surface;
        self
    }

    /// Replace the modules registered ahead of loaders and plugins
    pub fn internal_modules<F>(mut self, modules: F) -> Self
    where
        F: Fn() -> Vec<Arc<dyn NativeModule>> + Send + 'static,
    {
        self.internal_modules = Box::new(modules);
        self
    }

    /// Create the bridge; nothing runs until `init()`
    pub fn build(self) -> Bridge {
        let (commands_tx, commands_rx) = channel::unbounded();
        Bridge {
            config: self.config,
            state: BridgeState::Uninitialized,
            ready: false,
            executors: self.executors,
            source_fetcher: self.source_fetcher,
            loaders: self.loaders,
            discovery: self.discovery,
            error_surface: self.error_surface,
            internal_modules: self.internal_modules,
            listeners: Vec::new(),
            live: Arc::new(AtomicU64::new(0)),
            commands_tx,
            commands_rx,
            retired: Vec::new(),
            pending: VecDeque::new(),
            session: None,
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Connects the script runtime to the registered native modules.
pub struct Bridge {
    config: BridgeConfig,
    state: BridgeState,
    ready: bool,
    executors: ExecutorFactory,
    source_fetcher: Option<Arc<dyn SourceFetcher>>,
    loaders: Vec<Arc<dyn ModuleLoader>>,
    discovery: Box<dyn PluginDiscovery>,
    error_surface: Arc<dyn ErrorSurface>,
    internal_modules: InternalModules,
    listeners: Vec<ReadyListener>,
    live: Arc<AtomicU64>,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
    retired: Vec<Box<dyn Executor>>,
    pending: VecDeque<PendingEntry>,
    session: Option<Session>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state)
            .field("ready", &self.ready)
            .field("generation", &self.generation())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Bridge {
    /// Bridge with the default collaborators
    pub fn new(config: BridgeConfig) -> Self {
        BridgeBuilder::new(config).build()
    }

    /// Start configuring a bridge
    pub fn builder(config: BridgeConfig) -> BridgeBuilder {
        BridgeBuilder::new(config)
    }

    // ── Accessors ──

    /// Whether the initial queue drain has completed for this generation
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Lifecycle state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Live generation (0 before the first `init()`)
    pub fn generation(&self) -> u64 {
        self.live.load(Ordering::Acquire)
    }

    /// Registry of the running session
    pub fn modules(&self) -> Option<Arc<ModuleRegistry>> {
        self.session.as_ref().map(|s| s.modules.registry.clone())
    }

    /// UIManager of the running session
    pub fn ui_manager(&self) -> Option<Arc<UiManager>> {
        self.session.as_ref().map(|s| s.modules.ui_manager.clone())
    }

    /// SourceCode module of the running session
    pub fn source_code(&self) -> Option<Arc<SourceCode>> {
        self.session.as_ref().map(|s| s.modules.source_code.clone())
    }

    /// Context handed to the modules of the running session
    pub fn context(&self) -> Option<Arc<BridgeHandle>> {
        self.session.as_ref().map(|s| s.handle.clone())
    }

    /// Name of the executor actually running
    pub fn executor_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.executor.name())
    }

    /// Current configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Error surface in use
    pub fn error_surface(&self) -> &Arc<dyn ErrorSurface> {
        &self.error_surface
    }

    /// Change the bundle URL; takes effect on the next `init()`/`reload()`
    pub fn set_bundle_url(&mut self, url: Url) {
        self.config.bundle_url = Some(url);
    }

    /// Change the plugins path; takes effect on the next `init()`/`reload()`
    pub fn set_plugins_path(&mut self, path: impl Into<PathBuf>) {
        self.config.plugins_path = path.into();
    }

    /// Change the executor; takes effect on the next `init()`/`reload()`
    pub fn set_executor_name(&mut self, name: impl Into<String>) {
        self.config.executor_name = name.into();
    }

    /// Call `listener` every time readiness changes
    pub fn on_ready_changed(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Lifecycle ──

    /// Build the registry, start the executor and begin loading the bundle.
    pub fn init(&mut self) -> BridgeResult<()> {
        if self.state != BridgeState::Uninitialized {
            return Err(BridgeError::InvalidState(format!("init() called while {}", self.state)));
        }
        self.state = BridgeState::Initializing;
        tracing::info!("Initializing bridge");
        self.start_or_reset()
    }

    /// Discard the running session and start a new generation.
    ///
    /// Completions and commands of the old generation are dropped. The old
    /// executor is released on the next `pump()`.
    pub fn reload(&mut self) -> BridgeResult<()> {
        if self.state != BridgeState::Running {
            return Err(BridgeError::InvalidState(format!("reload() called while {}", self.state)));
        }
        self.state = BridgeState::Reloading;
        self.set_ready(false);
        tracing::info!("Reloading bridge (generation {})", self.generation());

        self.pending.clear();
        let previous = self.session.take();
        let result = self.start_or_reset();
        // Old modules go only after the new plugin libraries are open.
        if let Some(previous) = previous {
            self.retired.push(previous.retire());
        }
        result
    }

    /// Tear everything down. Handles given to modules go stale.
    pub fn shutdown(&mut self) {
        if self.state == BridgeState::Destroyed {
            return;
        }
        tracing::info!("Shutting down bridge");
        self.state = BridgeState::Destroyed;
        self.set_ready(false);
        self.live.fetch_add(1, Ordering::AcqRel);
        self.retired.clear();
        self.pending.clear();
        self.session = None;
    }

    fn start_or_reset(&mut self) -> BridgeResult<()> {
        match self.start() {
            Ok(()) => {
                self.state = BridgeState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Bridge failed to start: {}", e);
                self.state = BridgeState::Uninitialized;
                Err(e)
            }
        }
    }

    fn start(&mut self) -> BridgeResult<()> {
        let fetcher = self.source_fetcher.clone().ok_or(BridgeError::NoSourceFetcher)?;
        let bundle_url = self
            .config
            .bundle_url
            .clone()
            .ok_or_else(|| BridgeError::Config("no bundle URL configured".to_string()))?;

        let mut executor = self
            .executors
            .create(&self.config.executor_name, &self.config.executor)?;

        let generation = self.live.fetch_add(1, Ordering::AcqRel) + 1;
        let handle = Arc::new(BridgeHandle::new(generation, self.live.clone(), self.commands_tx.clone()));
        let modules = self.build_modules(generation, bundle_url.as_str());

        for module in modules.registry.modules() {
            module.module().set_bridge(handle.clone());
        }

        let payload = modules.registry.config_payload().to_json()?;
        executor.inject_json(CONFIG_GLOBAL, payload);

        tracing::info!(
            "Bridge generation {} started: {} modules, executor {}",
            generation,
            modules.registry.len(),
            executor.name()
        );

        self.pending.push_back(PendingEntry {
            generation,
            pending: Pending::Source(fetcher.fetch(&bundle_url)),
        });
        self.session = Some(Session {
            executor,
            bundle_url,
            handle,
            dispatcher: CallDispatcher::new(modules.registry.clone()),
            modules,
        });
        Ok(())
    }

    fn build_modules(&self, generation: u64, script_url: &str) -> Modules {
        let mut registry = ModuleRegistry::new(generation);
        let mut view_configs = Vec::new();

        for module in (self.internal_modules)() {
            register_module(&mut registry, module, &mut view_configs);
        }

        let discovered = self.discovery.discover(&self.config.plugins_path);
        if !discovered.libraries.is_empty() {
            tracing::debug!("{} plugin libraries open", discovered.libraries.len());
        }
        let exports = self
            .loaders
            .iter()
            .flat_map(|loader| loader.available_modules())
            .chain(discovered.exports);
        for export in exports {
            let name = export.name().to_string();
            match export.into_module() {
                Some(module) => register_module(&mut registry, module, &mut view_configs),
                None => tracing::warn!("Skipping '{}': does not implement the native module contract", name),
            }
        }

        let source_code = Arc::new(SourceCode::new(script_url));
        register_module(&mut registry, source_code.clone(), &mut view_configs);
        let ui_manager = Arc::new(UiManager::new(std::mem::take(&mut view_configs)));
        register_module(&mut registry, ui_manager.clone(), &mut view_configs);

        Modules {
            registry: Arc::new(registry),
            source_code,
            ui_manager,
        }
    }

    /// Build the registry `init()` would publish without starting anything
    pub fn preview(&self) -> RegistryPreview {
        let script_url = self.config.bundle_url.as_ref().map(Url::as_str).unwrap_or_default();
        let Modules { registry, .. } = self.build_modules(self.generation(), script_url);
        RegistryPreview { registry }
    }

    // ── Calls into the script ──

    /// Run `method(args)` on the script side and dispatch the returned batch
    pub fn invoke_and_process(&mut self, method: &str, args: Vec<Value>) -> BridgeResult<()> {
        let session = self.running_session_mut()?;
        let generation = session.generation();
        tracing::debug!("Invoking {} in script", method);
        let completion = session.executor.execute_call(method, args);
        self.pending.push_back(PendingEntry {
            generation,
            pending: Pending::Batch {
                completion,
                drain: false,
            },
        });
        Ok(())
    }

    /// Call `module.method(args)` in the script
    pub fn enqueue_script_call(&mut self, module: &str, method: &str, args: Vec<Value>) -> BridgeResult<()> {
        self.invoke_and_process(
            CALL_FUNCTION_RETURN_FLUSHED_QUEUE,
            vec![json!(module), json!(method), Value::Array(args)],
        )
    }

    /// Invoke a script callback by ID
    pub fn invoke_callback(&mut self, callback_id: u64, args: Vec<Value>) -> BridgeResult<()> {
        self.invoke_and_process(
            INVOKE_CALLBACK_AND_RETURN_FLUSHED_QUEUE,
            vec![json!(callback_id), Value::Array(args)],
        )
    }

    /// Run a `sync` method right away and return its value
    pub fn call_sync(&self, module_id: ModuleId, method_index: usize, args: Vec<Value>) -> BridgeResult<Value> {
        let session = self.running_session()?;
        let registry = &session.modules.registry;
        let (module, method) = registry.resolve(module_id as i64, method_index as i64)?;
        if method.kind() != MethodKind::Sync {
            return Err(BridgeError::InvalidState(format!(
                "{}.{} is a {} method, not sync",
                module.name(),
                method.name(),
                method.kind()
            )));
        }
        method.invoke(module.module().as_ref(), session.handle.as_ref(), &args)
    }

    fn running_session(&self) -> BridgeResult<&Session> {
        match (&self.session, self.state) {
            (Some(session), BridgeState::Running) => Ok(session),
            _ => Err(BridgeError::InvalidState(format!("bridge is {}", self.state))),
        }
    }

    fn running_session_mut(&mut self) -> BridgeResult<&mut Session> {
        match (&mut self.session, self.state) {
            (Some(session), BridgeState::Running) => Ok(session),
            (_, state) => Err(BridgeError::InvalidState(format!("bridge is {}", state))),
        }
    }

    // ── Event loop ──

    /// Handle everything that is ready now; returns the number of events.
    pub fn pump(&mut self) -> usize {
        if !self.retired.is_empty() {
            tracing::debug!("Releasing {} retired executor(s)", self.retired.len());
            self.retired.clear();
        }

        let mut handled = 0;
        loop {
            let mut progressed = false;
            while let Ok(command) = self.commands_rx.try_recv() {
                self.handle_command(command);
                handled += 1;
                progressed = true;
            }
            while let Some(settled) = self.pending.front().and_then(PendingEntry::try_take) {
                if let Some(entry) = self.pending.pop_front() {
                    self.handle_settled(entry.generation, settled);
                }
                handled += 1;
                progressed = true;
            }
            if !progressed {
                return handled;
            }
        }
    }

    /// Pump until the bridge is ready or `timeout` passes.
    ///
    /// Returns whether the bridge became ready.
    pub fn run_until_ready(&mut self, timeout: Duration) -> BridgeResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state != BridgeState::Running {
                return Err(BridgeError::InvalidState(format!("bridge is {}", self.state)));
            }
            self.pump();
            if self.ready {
                return Ok(true);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            self.wait(remaining);
        }
    }

    /// Keep pumping for `duration`
    pub fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            self.pump();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.state == BridgeState::Destroyed {
                return;
            }
            self.wait(remaining);
        }
    }

    /// Block until a command arrives or the front completion settles
    fn wait(&self, timeout: Duration) {
        let mut select = Select::new();
        select.recv(&self.commands_rx);
        if let Some(front) = self.pending.front() {
            front.watch(&mut select);
        }
        let _ = select.ready_timeout(timeout);
    }

    fn handle_command(&mut self, command: Command) {
        let current = self.generation();
        if command.generation() != current {
            tracing::debug!(
                "Dropping command from generation {} (current {})",
                command.generation(),
                current
            );
            return;
        }
        let result = match command {
            Command::ScriptCall {
                module, method, args, ..
            } => self.enqueue_script_call(&module, &method, args),
            Command::Callback { callback_id, args, .. } => self.invoke_callback(callback_id, args),
            Command::Error { message, .. } => {
                self.show_error(&message);
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!("Dropping command: {}", e);
        }
    }

    fn handle_settled(&mut self, generation: u64, settled: Settled) {
        let Some(session) = self.session.as_mut().filter(|s| s.generation() == generation) else {
            tracing::debug!("Dropping completion from generation {}", generation);
            return;
        };

        match settled {
            Settled::Source(Ok(bytes)) => match String::from_utf8(bytes) {
                Ok(code) => {
                    tracing::info!("Loaded {} bytes of source from {}", code.len(), session.bundle_url);
                    session.modules.source_code.set_source(code.clone());
                    let completion = session
                        .executor
                        .execute_application_script(code, session.bundle_url.as_str());
                    self.pending.push_back(PendingEntry {
                        generation,
                        pending: Pending::Script(completion),
                    });
                }
                Err(e) => {
                    let error = BridgeError::SourceLoad(format!("bundle is not UTF-8: {}", e));
                    self.error_surface.show_error(&error.to_string());
                }
            },
            Settled::Source(Err(e)) => {
                self.error_surface
                    .show_error(&BridgeError::SourceLoad(e.to_string()).to_string());
            }
            Settled::Script(Ok(())) => {
                tracing::info!("Application script finished; draining queue");
                let completion = session.executor.execute_call(FLUSHED_QUEUE, Vec::new());
                self.pending.push_back(PendingEntry {
                    generation,
                    pending: Pending::Batch {
                        completion,
                        drain: true,
                    },
                });
            }
            Settled::Script(Err(e)) => {
                self.error_surface
                    .show_error(&format!("Application script failed: {}", e));
            }
            Settled::Batch { result: Ok(value), drain } => {
                match session.dispatcher.process_json(session.handle.as_ref(), &value, generation) {
                    Ok(report) if report.is_clean() => {
                        tracing::debug!("Dispatched {} call(s)", report.invoked)
                    }
                    Ok(report) => tracing::warn!(
                        "Dispatched {} call(s), {} failed",
                        report.invoked,
                        report.failures.len()
                    ),
                    Err(e @ BridgeError::StaleBatch { .. }) => tracing::debug!("{}", e),
                    Err(e) => tracing::error!("{}", e),
                }
                if drain {
                    self.set_ready(true);
                }
            }
            Settled::Batch { result: Err(e), .. } => {
                self.error_surface.show_error(&format!("Script call failed: {}", e));
            }
        }
    }

    fn show_error(&self, message: &str) {
        self.error_surface.show_error(message);
    }

    fn set_ready(&mut self, ready: bool) {
        if self.ready == ready {
            return;
        }
        self.ready = ready;
        tracing::info!("Bridge {}", if ready { "ready" } else { "not ready" });
        for listener in &mut self.listeners {
            listener(ready);
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn register_module(registry: &mut ModuleRegistry, module: Arc<dyn NativeModule>, view_configs: &mut Vec<ViewConfig>) {
    match registry.register(module.clone()) {
        Ok(_) => {
            if let Some(config) = module.view_config() {
                view_configs.push(config);
            }
        }
        Err(e) => tracing::warn!("Skipping module: {}", e),
    }
}
