//! Variable observer - polling and change dispatch.
//!
//! The observer owns the map of monitored variables on a single worker task.
//! Every other component talks to it through [`VariableObserver`], a cheap
//! clonable handle that sends commands over a channel, so the map never needs
//! a lock.
//!
//! # Tick
//!
//! ```text
//! snapshot names -> read each -> compare with last value
//!                                  |-- equal: nothing
//!                                  `-- different: store, call handlers in
//!                                      subscription order, publish event
//! ```
//!
//! A failed read is logged and skipped for that tick only. A handler that
//! panics is caught and logged. Handlers run inline on the worker, so a slow
//! handler delays every other variable.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::backend::SharedBackend;
use super::value::VarValue;
use crate::events::EventBus;

/// Default interval between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lower bound for the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Callback invoked with every detected change of a variable.
pub type ChangeHandler = Arc<dyn Fn(&VariableChange) + Send + Sync>;

/// Identifies one handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A detected change of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableChange {
    pub name: String,
    pub old: VarValue,
    pub new: VarValue,
}

/// Errors returned by the observer handle.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The worker task is no longer running.
    #[error("Variable observer has stopped")]
    Stopped,
}

/// Observer configuration.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Interval between poll ticks (clamped to [`MIN_POLL_INTERVAL`]).
    pub poll_interval: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

enum Command {
    Subscribe {
        name: String,
        handler: ChangeHandler,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        name: String,
        id: Option<SubscriptionId>,
        reply: oneshot::Sender<bool>,
    },
    SetPollInterval(Duration),
    PollInterval(oneshot::Sender<Duration>),
    List(oneshot::Sender<Vec<String>>),
    Current {
        name: String,
        reply: oneshot::Sender<Option<VarValue>>,
    },
}

/// Handle to the observer worker.
#[derive(Clone)]
pub struct VariableObserver {
    commands: mpsc::UnboundedSender<Command>,
}

impl VariableObserver {
    /// Spawn the observer worker.
    ///
    /// The worker runs until `cancel` fires or every handle is dropped.
    pub fn start(
        backend: SharedBackend,
        bus: EventBus,
        config: ObserverConfig,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ObserverWorker {
            backend,
            bus,
            monitors: HashMap::new(),
            poll_interval: clamp_interval(config.poll_interval),
            next_id: 0,
        };
        let handle = tokio::spawn(worker.run(rx, cancel));
        (Self { commands: tx }, handle)
    }

    /// Register a handler for changes of `name`.
    ///
    /// The first subscription to a name seeds its value with one read; the
    /// seed never fires handlers.
    pub async fn subscribe<F>(
        &self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<SubscriptionId, ObserverError>
    where
        F: Fn(&VariableChange) + Send + Sync + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe {
            name: name.into(),
            handler: Arc::new(handler),
            reply,
        })?;
        rx.await.map_err(|_| ObserverError::Stopped)
    }

    /// Remove one handler (`Some(id)`) or every handler (`None`) of `name`.
    ///
    /// Returns whether anything was removed.
    pub async fn unsubscribe(
        &self,
        name: &str,
        id: Option<SubscriptionId>,
    ) -> Result<bool, ObserverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unsubscribe {
            name: name.to_string(),
            id,
            reply,
        })?;
        rx.await.map_err(|_| ObserverError::Stopped)
    }

    /// Change the poll interval. Values below [`MIN_POLL_INTERVAL`] are clamped.
    pub fn set_poll_interval(&self, interval: Duration) -> Result<(), ObserverError> {
        self.send(Command::SetPollInterval(interval))
    }

    /// The effective poll interval.
    pub async fn poll_interval(&self) -> Result<Duration, ObserverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PollInterval(reply))?;
        rx.await.map_err(|_| ObserverError::Stopped)
    }

    /// Names currently monitored, sorted.
    pub async fn list_subscribed(&self) -> Result<Vec<String>, ObserverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::List(reply))?;
        rx.await.map_err(|_| ObserverError::Stopped)
    }

    /// Last observed value of a monitored variable, without reading the backend.
    pub async fn current(&self, name: &str) -> Result<Option<VarValue>, ObserverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Current {
            name: name.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| ObserverError::Stopped)
    }

    fn send(&self, command: Command) -> Result<(), ObserverError> {
        self.commands
            .send(command)
            .map_err(|_| ObserverError::Stopped)
    }
}

struct MonitoredVariable {
    last_value: Option<VarValue>,
    handlers: Vec<(SubscriptionId, ChangeHandler)>,
}

struct ObserverWorker {
    backend: SharedBackend,
    bus: EventBus,
    monitors: HashMap<String, MonitoredVariable>,
    poll_interval: Duration,
    next_id: u64,
}

impl ObserverWorker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        debug!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Variable observer started"
        );
        let mut ticker = new_ticker(self.poll_interval);

        loop {
            let polling = !self.monitors.is_empty();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    let interval_changed = self.handle(command).await;
                    let started = !polling && !self.monitors.is_empty();
                    if started {
                        info!(
                            poll_interval_ms = self.poll_interval.as_millis() as u64,
                            "Variable polling started"
                        );
                    } else if polling && self.monitors.is_empty() {
                        info!("No variables subscribed, polling stopped");
                    }
                    if interval_changed || started {
                        ticker = new_ticker(self.poll_interval);
                    }
                }
                _ = ticker.tick(), if polling => self.poll_once().await,
            }
        }

        debug!("Variable observer stopped");
    }

    /// Apply one command. Returns true when the poll interval changed.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Subscribe {
                name,
                handler,
                reply,
            } => {
                let id = SubscriptionId(self.next_id);
                self.next_id += 1;

                if !self.monitors.contains_key(&name) {
                    let seed = match self.backend.read(&name).await {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!(variable = %name, error = %e, "Seed read failed");
                            None
                        }
                    };
                    debug!(variable = %name, seed = ?seed, "Monitoring variable");
                    self.monitors.insert(
                        name.clone(),
                        MonitoredVariable {
                            last_value: seed,
                            handlers: Vec::new(),
                        },
                    );
                }
                if let Some(monitor) = self.monitors.get_mut(&name) {
                    monitor.handlers.push((id, handler));
                }
                let _ = reply.send(id);
                false
            }
            Command::Unsubscribe { name, id, reply } => {
                let removed = self.remove_handler(&name, id);
                let _ = reply.send(removed);
                false
            }
            Command::SetPollInterval(requested) => {
                let interval = clamp_interval(requested);
                if interval != requested {
                    debug!(
                        requested_ms = requested.as_millis() as u64,
                        "Poll interval clamped to minimum"
                    );
                }
                let changed = interval != self.poll_interval;
                self.poll_interval = interval;
                changed
            }
            Command::PollInterval(reply) => {
                let _ = reply.send(self.poll_interval);
                false
            }
            Command::List(reply) => {
                let mut names: Vec<String> = self.monitors.keys().cloned().collect();
                names.sort();
                let _ = reply.send(names);
                false
            }
            Command::Current { name, reply } => {
                let value = self
                    .monitors
                    .get(&name)
                    .and_then(|monitor| monitor.last_value.clone());
                let _ = reply.send(value);
                false
            }
        }
    }

    fn remove_handler(&mut self, name: &str, id: Option<SubscriptionId>) -> bool {
        let Some(monitor) = self.monitors.get_mut(name) else {
            return false;
        };
        let before = monitor.handlers.len();
        match id {
            Some(id) => monitor.handlers.retain(|(existing, _)| *existing != id),
            None => monitor.handlers.clear(),
        }
        let removed = monitor.handlers.len() != before;
        if monitor.handlers.is_empty() {
            self.monitors.remove(name);
            debug!(variable = %name, "Variable no longer monitored");
        }
        removed
    }

    async fn poll_once(&mut self) {
        let names: Vec<String> = self.monitors.keys().cloned().collect();

        for name in names {
            let value = match self.backend.read(&name).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(variable = %name, error = %e, "Variable read failed");
                    continue;
                }
            };

            let Some(monitor) = self.monitors.get_mut(&name) else {
                continue;
            };

            let old = match monitor.last_value.replace(value.clone()) {
                Some(old) if old != value => old,
                Some(_) => continue,
                None => {
                    // First successful read after a failed seed
                    trace!(variable = %name, "Late seed value stored");
                    continue;
                }
            };

            let change = VariableChange {
                name,
                old,
                new: value,
            };
            trace!(variable = %change.name, old = %change.old, new = %change.new, "Variable changed");

            for (id, handler) in &monitor.handlers {
                if catch_unwind(AssertUnwindSafe(|| handler(&change))).is_err() {
                    error!(variable = %change.name, subscription = ?id, "Change handler panicked");
                }
            }

            self.bus.publish_variable(change);
        }
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
