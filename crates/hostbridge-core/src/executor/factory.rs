//! Executor lookup by name

use std::collections::BTreeMap;

use crate::config::{ExecutorConfig, DEFAULT_EXECUTOR};
use crate::error::{BridgeError, BridgeResult, ExecutorError};

use super::{Executor, NetExecutor};

/// Builds an executor from the configured options
pub type ExecutorConstructor =
    Box<dyn Fn(&ExecutorConfig) -> Result<Box<dyn Executor>, ExecutorError> + Send + Sync>;

/// Maps executor names to constructors.
pub struct ExecutorFactory {
    constructors: BTreeMap<String, ExecutorConstructor>,
    default_name: String,
}

impl std::fmt::Debug for ExecutorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorFactory")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .field("default", &self.default_name)
            .finish()
    }
}

impl ExecutorFactory {
    /// Factory with no executors registered
    pub fn empty(default_name: impl Into<String>) -> Self {
        ExecutorFactory {
            constructors: BTreeMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Factory with the built-in executors, defaulting to `NetExecutor`
    pub fn new() -> Self {
        let mut factory = Self::empty(DEFAULT_EXECUTOR);
        factory.register(DEFAULT_EXECUTOR, |config| {
            NetExecutor::new(config).map(|e| Box::new(e) as Box<dyn Executor>)
        });
        factory
    }

    /// Register (or replace) an executor constructor
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ExecutorConfig) -> Result<Box<dyn Executor>, ExecutorError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Change the fallback executor
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_name = name.into();
    }

    /// Fallback executor name
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered executor names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Construct and initialize the named executor without falling back
    pub fn construct(&self, name: &str, config: &ExecutorConfig) -> BridgeResult<Box<dyn Executor>> {
        let constructor = self.constructors.get(name).ok_or_else(|| BridgeError::ExecutorConstruction {
            name: name.to_string(),
            reason: "no executor registered under this name".to_string(),
        })?;
        let failed = |e: ExecutorError| BridgeError::ExecutorConstruction {
            name: name.to_string(),
            reason: e.to_string(),
        };
        let mut executor = constructor(config).map_err(failed)?;
        executor.init().map_err(failed)?;
        Ok(executor)
    }

    /// Construct the named executor, falling back to the default.
    ///
    /// Fails with [`BridgeError::NoExecutor`] only when the default cannot be
    /// constructed either.
    pub fn create(&self, name: &str, config: &ExecutorConfig) -> BridgeResult<Box<dyn Executor>> {
        match self.construct(name, config) {
            Ok(executor) => return Ok(executor),
            Err(e) if name == self.default_name => {
                tracing::error!("{}", e);
            }
            Err(e) => {
                tracing::warn!("{}; falling back to {}", e, self.default_name);
                match self.construct(&self.default_name, config) {
                    Ok(executor) => return Ok(executor),
                    Err(e) => tracing::error!("{}", e),
                }
            }
        }
        Err(BridgeError::NoExecutor {
            requested: name.to_string(),
            default: self.default_name.clone(),
        })
    }
}

impl Default for ExecutorFactory {
    fn default() -> Self {
        Self::new()
    }
}
