//! Single-flight loadsheet coordinator with retry and backoff.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::transport::{LoadsheetTransport, TransportResponse};
use super::{LoadsheetError, LoadsheetKind, LoadsheetOutcome};
use crate::events::{EventBus, LoadsheetEvent};

/// Default minimum time between two attempts of the same kind.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of requests per attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff unit; attempt `n` is followed by a wait of `n` units.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct LoadsheetConfig {
    pub min_interval: Duration,
    /// Total requests per attempt (at least one is always made).
    pub max_retries: u32,
    pub backoff_step: Duration,
    /// Probe `/health` before the first request.
    pub probe_health: bool,
}

impl Default for LoadsheetConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_step: DEFAULT_BACKOFF_STEP,
            probe_health: true,
        }
    }
}

/// Snapshot of the bookkeeping for one loadsheet kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadsheetAttempt {
    pub kind: LoadsheetKind,
    pub last_attempt_time: Option<Instant>,
    pub generating: bool,
    pub retry_count: u32,
}

#[derive(Default)]
struct SlotState {
    last_attempt_time: Option<Instant>,
    generating: bool,
    retry_count: u32,
}

struct Slot {
    kind: LoadsheetKind,
    gate: tokio::sync::Mutex<()>,
    state: Mutex<SlotState>,
}

impl Slot {
    fn new(kind: LoadsheetKind) -> Self {
        Self {
            kind,
            gate: tokio::sync::Mutex::new(()),
            state: Mutex::new(SlotState::default()),
        }
    }
}

/// Generates loadsheets, one attempt per kind at a time.
pub struct LoadsheetCoordinator<T> {
    transport: T,
    config: LoadsheetConfig,
    bus: EventBus,
    preliminary: Slot,
    final_sheet: Slot,
}

impl<T: LoadsheetTransport> LoadsheetCoordinator<T> {
    pub fn new(transport: T, config: LoadsheetConfig, bus: EventBus) -> Self {
        Self {
            transport,
            config,
            bus,
            preliminary: Slot::new(LoadsheetKind::Preliminary),
            final_sheet: Slot::new(LoadsheetKind::Final),
        }
    }

    fn slot(&self, kind: LoadsheetKind) -> &Slot {
        match kind {
            LoadsheetKind::Preliminary => &self.preliminary,
            LoadsheetKind::Final => &self.final_sheet,
        }
    }

    /// Current bookkeeping for `kind`.
    pub fn attempt(&self, kind: LoadsheetKind) -> LoadsheetAttempt {
        let slot = self.slot(kind);
        let state = slot.state.lock();
        LoadsheetAttempt {
            kind: slot.kind,
            last_attempt_time: state.last_attempt_time,
            generating: state.generating,
            retry_count: state.retry_count,
        }
    }

    /// Generate a loadsheet.
    ///
    /// Returns `Err` only when the attempt was not made at all (another one
    /// is running, or the last one was too recent). A made attempt always
    /// returns an outcome, successful or not, and publishes it on the bus.
    pub async fn generate(&self, kind: LoadsheetKind) -> Result<LoadsheetOutcome, LoadsheetError> {
        let slot = self.slot(kind);
        let _gate = slot
            .gate
            .try_lock()
            .map_err(|_| LoadsheetError::AlreadyInProgress(kind))?;

        {
            let mut state = slot.state.lock();
            if let Some(last) = state.last_attempt_time {
                let elapsed = last.elapsed();
                if elapsed < self.config.min_interval {
                    let remaining = self.config.min_interval - elapsed;
                    debug!(kind = %kind, remaining_ms = remaining.as_millis() as u64, "Loadsheet request too soon");
                    return Err(LoadsheetError::TooSoon { kind, remaining });
                }
            }
            state.last_attempt_time = Some(Instant::now());
            state.generating = true;
            state.retry_count = 0;
        }

        info!(kind = %kind, "Generating loadsheet");
        let outcome = self.run_attempts(slot).await;

        slot.state.lock().generating = false;
        match &outcome {
            LoadsheetOutcome::Success { .. } => info!(kind = %kind, "Loadsheet generated"),
            LoadsheetOutcome::Failed {
                status, message, ..
            } => warn!(kind = %kind, status = ?status, message = %message, "Loadsheet generation failed"),
        }
        self.bus.publish_loadsheet(LoadsheetEvent {
            kind,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    async fn run_attempts(&self, slot: &Slot) -> LoadsheetOutcome {
        if self.config.probe_health {
            if let Err(e) = self.transport.health().await {
                return LoadsheetOutcome::Failed {
                    status: None,
                    message: format!("Loadsheet server unavailable: {}", e),
                    body: None,
                };
            }
        }

        let attempts = self.config.max_retries.max(1);
        let mut last_failure = LoadsheetOutcome::Failed {
            status: None,
            message: "No attempt made".to_string(),
            body: None,
        };

        for attempt in 1..=attempts {
            slot.state.lock().retry_count = attempt - 1;

            match self.transport.generate(slot.kind).await {
                Ok(response) if response.is_success() => {
                    return LoadsheetOutcome::Success {
                        body: response.body,
                    };
                }
                Ok(TransportResponse { status, body }) => {
                    debug!(kind = %slot.kind, attempt, status, "Loadsheet request rejected");
                    last_failure = LoadsheetOutcome::Failed {
                        status: Some(status),
                        message: format!("Server returned status {}", status),
                        body: Some(body),
                    };
                }
                Err(e) => {
                    debug!(kind = %slot.kind, attempt, error = %e, "Loadsheet request failed");
                    last_failure = LoadsheetOutcome::Failed {
                        status: None,
                        message: e.to_string(),
                        body: None,
                    };
                }
            }

            if attempt < attempts {
                sleep(self.config.backoff_step * attempt).await;
            }
        }

        last_failure
    }

    /// Probe the loadsheet server.
    pub async fn health(&self) -> Result<(), LoadsheetError> {
        Ok(self.transport.health().await?)
    }

    /// Ask the server to resend the last loadsheet.
    pub async fn resend(&self) -> Result<String, LoadsheetError> {
        accept(self.transport.resend().await?)
    }

    /// Delete stored loadsheets and reset the interval bookkeeping.
    pub async fn clear(&self) -> Result<String, LoadsheetError> {
        let body = accept(self.transport.clear().await?)?;
        for slot in [&self.preliminary, &self.final_sheet] {
            slot.state.lock().last_attempt_time = None;
        }
        Ok(body)
    }
}

fn accept(response: TransportResponse) -> Result<String, LoadsheetError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(LoadsheetError::Rejected {
            status: response.status,
            body: response.body,
        })
    }
}
