//! Single-fire completions
//!
//! Executors and the source fetcher answer asynchronously. Each request hands
//! back a [`Completion`] that the owner thread polls, and keeps the matching
//! [`Resolver`] to settle it from whatever thread does the work. A completion
//! is settled exactly once; a resolver dropped without settling breaks it.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::ExecutorError;

/// The resolver was dropped before settling its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Completion was dropped before it was settled")]
pub struct Broken;

impl From<Broken> for ExecutorError {
    fn from(_: Broken) -> Self {
        ExecutorError::Closed("completion was dropped before it was settled".to_string())
    }
}

/// Receiving side of a single-fire result.
#[derive(Debug)]
pub struct Completion<T, E = ExecutorError> {
    rx: Receiver<Result<T, E>>,
}

/// Settling side of a [`Completion`].
#[derive(Debug)]
pub struct Resolver<T, E = ExecutorError> {
    tx: Sender<Result<T, E>>,
}

/// Create a connected resolver/completion pair
pub fn completion<T, E>() -> (Resolver<T, E>, Completion<T, E>) {
    let (tx, rx) = channel::bounded(1);
    (Resolver { tx }, Completion { rx })
}

impl<T, E> Resolver<T, E> {
    /// Settle with a value
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Settle with an error
    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }

    /// Settle with a result
    pub fn settle(self, result: Result<T, E>) {
        // The completion may already be gone (bridge reloaded); that is fine.
        let _ = self.tx.send(result);
    }
}

impl<T, E: From<Broken>> Completion<T, E> {
    /// A completion that is already settled
    pub fn settled(result: Result<T, E>) -> Self {
        let (resolver, completion) = completion();
        resolver.settle(result);
        completion
    }

    /// A completion that already holds a value
    pub fn ready(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// A completion that already failed
    pub fn failed(error: E) -> Self {
        Self::settled(Err(error))
    }

    /// Take the result if the completion has been settled or broken
    pub fn try_take(&self) -> Option<Result<T, E>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Broken.into())),
        }
    }

    /// Block until settled
    pub fn wait(self) -> Result<T, E> {
        self.rx.recv().unwrap_or_else(|_| Err(Broken.into()))
    }

    /// Block until settled or until `timeout` passes
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, E>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(Broken.into())),
        }
    }
}

impl<T, E> Completion<T, E> {
    /// Channel the result arrives on, for use with `crossbeam::channel::Select`
    pub(crate) fn receiver(&self) -> &Receiver<Result<T, E>> {
        &self.rx
    }
}
