//! Error types for native module handlers

/// Result type returned by native method handlers
pub type NativeResult<T> = Result<T, NativeError>;

/// Native module error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// Type mismatch during argument conversion
    #[error("Type mismatch for argument {index}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Position of the argument in the parameter list
        index: usize,
        /// Expected type name
        expected: &'static str,
        /// Actual JSON type name
        got: &'static str,
    },

    /// Invalid or missing argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Method index not exported by the module
    #[error("Unknown method index {0}")]
    UnknownMethod(usize),

    /// Handler panicked
    #[error("Handler panicked: {0}")]
    Panic(String),

    /// Module-level error
    #[error("Module error: {0}")]
    ModuleError(String),

    /// Promise rejection with an explicit code
    #[error("{code}: {message}")]
    Rejected {
        /// Machine readable error code
        code: String,
        /// Human readable message
        message: String,
    },
}

impl NativeError {
    /// Build a rejection with a code and message
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        NativeError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error code handed to a promise's reject callback
    pub fn code(&self) -> &str {
        match self {
            NativeError::TypeMismatch { .. } | NativeError::ArgumentError(_) => "EINVAL",
            NativeError::UnknownMethod(_) => "ENOSYS",
            NativeError::Panic(_) => "EPANIC",
            NativeError::ModuleError(_) => "EUNSPECIFIED",
            NativeError::Rejected { code, .. } => code,
        }
    }

    /// Message handed to a promise's reject callback
    pub fn message(&self) -> String {
        match self {
            NativeError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::ModuleError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::ModuleError(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_code_and_message() {
        let err = NativeError::rejected("ENOENT", "no such key");
        assert_eq!(err.code(), "ENOENT");
        assert_eq!(err.message(), "no such key");
        assert_eq!(err.to_string(), "ENOENT: no such key");
    }

    #[test]
    fn test_argument_errors_map_to_einval() {
        let err = NativeError::TypeMismatch {
            index: 1,
            expected: "string",
            got: "number",
        };
        assert_eq!(err.code(), "EINVAL");
        assert!(err.message().contains("argument 1"));
    }
}
