//! Ordered, single-flight connection establishment.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{ConnectionError, ConnectionStep, ConnectionSteps};
use crate::events::{ConnectivityEvent, EventBus};

/// Default pause before retrying a failed sequence.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Which links are established.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionModel {
    pub simulator: bool,
    pub transport: bool,
    pub aircraft: bool,
    pub session: bool,
}

impl ConnectionModel {
    pub fn is_connected(&self) -> bool {
        self.simulator && self.transport && self.aircraft && self.session
    }

    fn get(&self, step: ConnectionStep) -> bool {
        match step {
            ConnectionStep::SimulatorProcess => self.simulator,
            ConnectionStep::Transport => self.transport,
            ConnectionStep::AircraftBackend => self.aircraft,
            ConnectionStep::SessionReady => self.session,
        }
    }

    fn set(&mut self, step: ConnectionStep, value: bool) {
        match step {
            ConnectionStep::SimulatorProcess => self.simulator = value,
            ConnectionStep::Transport => self.transport = value,
            ConnectionStep::AircraftBackend => self.aircraft = value,
            ConnectionStep::SessionReady => self.session = value,
        }
    }
}

/// Result of one connection sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// Fatal: the simulator process is not running.
    SimulatorAbsent,
    /// A later step failed; retryable after a reset.
    StepFailed {
        step: ConnectionStep,
        error: ConnectionError,
    },
}

/// Runs the connection chain under a single lock.
pub struct ConnectionOrchestrator<S> {
    steps: S,
    model: Mutex<ConnectionModel>,
    bus: EventBus,
    retry_delay: Duration,
}

impl<S: ConnectionSteps> ConnectionOrchestrator<S> {
    pub fn new(steps: S, bus: EventBus, retry_delay: Duration) -> Self {
        Self {
            steps,
            model: Mutex::new(ConnectionModel::default()),
            bus,
            retry_delay,
        }
    }

    pub fn steps(&self) -> &S {
        &self.steps
    }

    /// Snapshot of the link flags. Waits while a sequence is running.
    pub async fn model(&self) -> ConnectionModel {
        *self.model.lock().await
    }

    /// Run the chain once. Concurrent callers wait for the running sequence
    /// and return immediately if it left everything connected.
    pub async fn connect(&self) -> ConnectOutcome {
        let mut model = self.model.lock().await;
        if model.is_connected() {
            debug!("Already connected");
            return ConnectOutcome::Connected;
        }

        if !self.steps.simulator_running().await {
            warn!("Simulator process not found");
            return ConnectOutcome::SimulatorAbsent;
        }
        self.mark_connected(&mut model, ConnectionStep::SimulatorProcess);

        for step in ConnectionStep::ALL.into_iter().skip(1) {
            debug!(step = %step, "Connecting");
            let result = match step {
                ConnectionStep::Transport => self.steps.connect_transport().await,
                ConnectionStep::AircraftBackend => self.steps.connect_aircraft().await,
                _ => self.steps.wait_session_ready().await,
            };
            if let Err(error) = result {
                warn!(step = %step, error = %error, "Connection step failed");
                return ConnectOutcome::StepFailed { step, error };
            }
            self.mark_connected(&mut model, step);
        }

        info!("Connected to simulator");
        ConnectOutcome::Connected
    }

    /// Record one established link and announce it, once per edge.
    fn mark_connected(&self, model: &mut ConnectionModel, step: ConnectionStep) {
        if model.get(step) {
            return;
        }
        model.set(step, true);
        debug!(step = %step, "Connected");
        self.bus.publish_connectivity(ConnectivityEvent {
            step,
            connected: true,
        });
    }

    /// Connect, retrying after resets until connected, cancelled, or the
    /// simulator turns out not to be running.
    pub async fn connect_with_retry(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ConnectionError::Cancelled);
            }
            match self.connect().await {
                ConnectOutcome::Connected => return Ok(()),
                ConnectOutcome::SimulatorAbsent => {
                    error!("Simulator is not running, giving up");
                    return Err(ConnectionError::SimulatorNotRunning);
                }
                ConnectOutcome::StepFailed { step, .. } => {
                    info!(
                        step = %step,
                        retry_secs = self.retry_delay.as_secs_f64(),
                        "Retrying connection"
                    );
                    self.reset().await;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ConnectionError::Cancelled),
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }

    /// Tear down transport, aircraft and session. The simulator flag stays.
    pub async fn reset(&self) {
        let mut model = self.model.lock().await;
        self.steps.reset().await;
        for step in [
            ConnectionStep::Transport,
            ConnectionStep::AircraftBackend,
            ConnectionStep::SessionReady,
        ] {
            if model.get(step) {
                model.set(step, false);
                self.bus.publish_connectivity(ConnectivityEvent {
                    step,
                    connected: false,
                });
            }
        }
        debug!("Connection reset");
    }

    /// Whether the established transport still answers.
    pub async fn transport_healthy(&self) -> bool {
        self.steps.transport_healthy().await
    }
}
