//! Backend abstraction for reading and writing named variables.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::value::VarValue;

/// Errors raised by a variable backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend does not know the variable.
    #[error("Variable '{0}' not found")]
    NotFound(String),

    /// The variable exists but cannot be written.
    #[error("Variable '{0}' is read-only")]
    ReadOnly(String),

    /// The backend answered with something that is not a usable value.
    #[error("Unexpected value for '{name}': {reason}")]
    Format { name: String, reason: String },

    /// Transport level failure (HTTP, socket, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend has not been connected yet or was reset.
    #[error("Backend not connected")]
    NotConnected,
}

/// Read/write access to named external variables.
///
/// Implementations must be cheap to call repeatedly; the observer reads every
/// subscribed variable on each poll tick.
#[async_trait]
pub trait VariableBackend: Send + Sync {
    /// Read the current value of a variable.
    async fn read(&self, name: &str) -> Result<VarValue, BackendError>;

    /// Write a value to a variable.
    async fn write(&self, name: &str, value: VarValue) -> Result<(), BackendError>;
}

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn VariableBackend>;
