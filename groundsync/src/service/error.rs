//! Service error types.

use std::fmt;
use std::io;

use crate::config::ConfigFileError;
use crate::connection::ConnectionError;
use crate::ground_ops::MenuError;
use crate::variables::ObserverError;

/// Errors that can occur while building or running the runtime.
#[derive(Debug)]
pub enum ServiceError {
    /// Failed to create an HTTP client
    HttpClientError(String),
    /// Invalid configuration
    ConfigError(String),
    /// I/O error (log files, menu file)
    IoError(io::Error),
    /// The simulator process is not running; nothing to retry
    SimulatorNotRunning,
    /// Connection chain failed in a way that ends the run
    Connection(ConnectionError),
    /// The variable observer stopped underneath a session
    Observer(ObserverError),
    /// The ground-ops menu could not be attached
    Menu(MenuError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpClientError(msg) => write!(f, "HTTP client error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::IoError(e) => write!(f, "I/O error: {}", e),
            Self::SimulatorNotRunning => write!(f, "Simulator is not running"),
            Self::Connection(e) => write!(f, "Connection error: {}", e),
            Self::Observer(e) => write!(f, "Observer error: {}", e),
            Self::Menu(e) => write!(f, "Menu error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            Self::Connection(e) => Some(e),
            Self::Observer(e) => Some(e),
            Self::Menu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ServiceError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<ConnectionError> for ServiceError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::SimulatorNotRunning => Self::SimulatorNotRunning,
            other => Self::Connection(other),
        }
    }
}

impl From<ObserverError> for ServiceError {
    fn from(e: ObserverError) -> Self {
        Self::Observer(e)
    }
}

impl From<MenuError> for ServiceError {
    fn from(e: MenuError) -> Self {
        Self::Menu(e)
    }
}

impl From<ConfigFileError> for ServiceError {
    fn from(e: ConfigFileError) -> Self {
        Self::ConfigError(e.to_string())
    }
}
