//! Connection lifecycle.
//!
//! Four connections are chained: the simulator process must be running,
//! the transport link to it must be up, the aircraft backend must answer,
//! and the session must report ready. [`ConnectionOrchestrator`] runs the
//! chain under one lock and recovers from partial failure.

mod orchestrator;

use std::fmt;
use std::future::Future;

use thiserror::Error;

pub use orchestrator::{
    ConnectOutcome, ConnectionModel, ConnectionOrchestrator, DEFAULT_RETRY_DELAY,
};

/// One link of the connection chain, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStep {
    SimulatorProcess,
    Transport,
    AircraftBackend,
    SessionReady,
}

impl ConnectionStep {
    pub const ALL: [ConnectionStep; 4] = [
        ConnectionStep::SimulatorProcess,
        ConnectionStep::Transport,
        ConnectionStep::AircraftBackend,
        ConnectionStep::SessionReady,
    ];
}

impl fmt::Display for ConnectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStep::SimulatorProcess => "simulator process",
            ConnectionStep::Transport => "transport",
            ConnectionStep::AircraftBackend => "aircraft backend",
            ConnectionStep::SessionReady => "session",
        };
        write!(f, "{}", s)
    }
}

/// Connection failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Simulator is not running")]
    SimulatorNotRunning,

    #[error("Connecting {step} failed: {reason}")]
    StepFailed {
        step: ConnectionStep,
        reason: String,
    },

    #[error("Timed out waiting for {0}")]
    Timeout(ConnectionStep),

    #[error("Connection attempt cancelled")]
    Cancelled,
}

/// The individual connection operations.
pub trait ConnectionSteps: Send + Sync {
    /// Whether the simulator process is up. Never retried.
    fn simulator_running(&self) -> impl Future<Output = bool> + Send;

    fn connect_transport(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    fn connect_aircraft(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    fn wait_session_ready(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Cheap liveness check of an established transport.
    fn transport_healthy(&self) -> impl Future<Output = bool> + Send;

    /// Tear down transport, aircraft and session state.
    fn reset(&self) -> impl Future<Output = ()> + Send;
}
