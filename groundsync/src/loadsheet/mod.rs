//! Loadsheet generation through the aircraft backend's local HTTP server.
//!
//! The [`LoadsheetCoordinator`] admits one attempt per loadsheet kind at a
//! time, enforces a minimum interval between attempts and retries failed
//! requests with linear backoff. The HTTP side is behind
//! [`LoadsheetTransport`] so tests can script responses.

mod coordinator;
mod transport;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub use coordinator::{
    LoadsheetAttempt, LoadsheetConfig, LoadsheetCoordinator, DEFAULT_BACKOFF_STEP,
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_INTERVAL,
};
pub use transport::{
    HttpLoadsheetClient, LoadsheetTransport, TransportError, TransportResponse,
    DEFAULT_LOADSHEET_URL, MAX_REQUEST_TIMEOUT,
};

/// Which loadsheet to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadsheetKind {
    Preliminary,
    Final,
}

impl fmt::Display for LoadsheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadsheetKind::Preliminary => write!(f, "Preliminary"),
            LoadsheetKind::Final => write!(f, "Final"),
        }
    }
}

impl FromStr for LoadsheetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preliminary" | "prelim" => Ok(LoadsheetKind::Preliminary),
            "final" => Ok(LoadsheetKind::Final),
            other => Err(format!(
                "unknown loadsheet type '{}', expected preliminary or final",
                other
            )),
        }
    }
}

/// Result of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadsheetOutcome {
    Success {
        body: String,
    },
    /// Every attempt failed. `status` is the last HTTP status, if any.
    Failed {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },
}

impl LoadsheetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadsheetOutcome::Success { .. })
    }
}

/// Reasons a loadsheet request was not attempted, or a direct call failed.
#[derive(Debug, Error)]
pub enum LoadsheetError {
    #[error("{0} loadsheet generation already in progress")]
    AlreadyInProgress(LoadsheetKind),

    #[error("{kind} loadsheet requested too soon, next attempt allowed in {}s", .remaining.as_secs())]
    TooSoon {
        kind: LoadsheetKind,
        remaining: Duration,
    },

    #[error("Loadsheet server rejected the request with status {status}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
