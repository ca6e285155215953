//! Bridge error types.

use hostbridge_sdk::NativeError;

/// Result alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by an executor or by a completion that was never settled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorError {
    /// Could not reach the script runtime
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The runtime sent something that does not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The script itself failed
    #[error("Script error: {0}")]
    Script(String),

    /// The executor went away before answering
    #[error("Executor closed: {0}")]
    Closed(String),
}

/// Errors that can occur while building or driving a bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Module does not satisfy the module contract
    #[error("Invalid module '{name}': {reason}")]
    InvalidModule {
        /// Module name as reported by the module
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A batch entry names a module or method that is not registered
    #[error("Unresolved call to module {module_id} method {method_index}{}", describe_target(.module, .method))]
    UnresolvedCall {
        /// Module ID from the batch
        module_id: i64,
        /// Method index from the batch
        method_index: i64,
        /// Module name, when the module ID resolved
        module: Option<String>,
        /// Method name, when the method index resolved
        method: Option<String>,
    },

    /// The named executor could not be constructed
    #[error("Could not construct executor '{name}': {reason}")]
    ExecutorConstruction {
        /// Requested executor name
        name: String,
        /// Construction failure
        reason: String,
    },

    /// Neither the named nor the default executor could be constructed
    #[error("No executor could be constructed (tried '{requested}' and default '{default}')")]
    NoExecutor {
        /// Requested executor name
        requested: String,
        /// Default executor name
        default: String,
    },

    /// Batch does not have the wire shape of a pending result
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// The application bundle could not be loaded
    #[error("Failed to load source code: {0}")]
    SourceLoad(String),

    /// No source fetcher is configured
    #[error("No source fetcher configured; the bridge cannot load source code")]
    NoSourceFetcher,

    /// A native method handler failed
    #[error("{module}.{method} failed: {source}")]
    MethodFailed {
        /// Module name
        module: String,
        /// Method name
        method: String,
        /// Handler error
        source: NativeError,
    },

    /// A batch produced by an older bridge generation
    #[error("Stale batch from generation {batch} (current generation {current})")]
    StaleBatch {
        /// Generation the batch was requested under
        batch: u64,
        /// Live generation
        current: u64,
    },

    /// Operation not allowed in the current bridge state
    #[error("Invalid bridge state: {0}")]
    InvalidState(String),

    /// Executor failure
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn describe_target(module: &Option<String>, method: &Option<String>) -> String {
    match (module, method) {
        (Some(module), Some(method)) => format!(" ({}.{})", module, method),
        (Some(module), None) => format!(" ({})", module),
        _ => String::new(),
    }
}

impl BridgeError {
    /// Whether this error aborts bridge initialization
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            BridgeError::NoSourceFetcher | BridgeError::NoExecutor { .. } | BridgeError::Config(_)
        )
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(e: toml::de::Error) -> Self {
        BridgeError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::MalformedBatch(e.to_string())
    }
}
