//! Connection loop and service sessions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::AppContext;
use super::error::ServiceError;
use crate::aircraft::AircraftActuators;
use crate::connection::{ConnectionError, ConnectionSteps};
use crate::ground_ops::MenuAdapter;
use crate::loadsheet::{LoadsheetCoordinator, LoadsheetKind, LoadsheetTransport};
use crate::services::{AutomationExecutor, GroundEquipmentController, ServiceRunner, SignalTranslator};
use crate::variables::{ObserverConfig, VariableChange, VariableObserver};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cancelled,
    TransportLost,
}

/// Top-level runtime: connect, run a session, reconnect when the transport drops.
pub struct GroundSyncRuntime<S, T> {
    context: AppContext<S, T>,
}

impl<S, T> GroundSyncRuntime<S, T>
where
    S: ConnectionSteps + 'static,
    T: LoadsheetTransport + 'static,
{
    pub fn new(context: AppContext<S, T>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext<S, T> {
        &self.context
    }

    /// Run until `cancel` fires.
    ///
    /// Returns an error only for failures retrying cannot fix, such as the
    /// simulator not running at all.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        info!(version = crate::VERSION, "GroundSync starting");
        let (loadsheet_tx, loadsheet_worker) =
            spawn_loadsheet_worker(self.context.loadsheets.clone(), cancel.clone());

        let result = self.connection_loop(&cancel, loadsheet_tx).await;

        self.context.connection.reset().await;
        cancel.cancel();
        let _ = loadsheet_worker.await;
        info!("GroundSync stopped");
        result
    }

    async fn connection_loop(
        &self,
        cancel: &CancellationToken,
        loadsheet_tx: mpsc::UnboundedSender<LoadsheetKind>,
    ) -> Result<(), ServiceError> {
        loop {
            match self.context.connection.connect_with_retry(cancel).await {
                Ok(()) => {}
                Err(ConnectionError::Cancelled) => return Ok(()),
                Err(e) => return Err(e.into()),
            }

            match self.run_session(cancel, loadsheet_tx.clone()).await? {
                SessionEnd::Cancelled => return Ok(()),
                SessionEnd::TransportLost => {
                    warn!("Simulator transport lost, reconnecting");
                    self.context.connection.reset().await;
                }
            }
        }
    }

    /// One connected session: observer, menu, automation and service loop.
    async fn run_session(
        &self,
        cancel: &CancellationToken,
        loadsheet_tx: mpsc::UnboundedSender<LoadsheetKind>,
    ) -> Result<SessionEnd, ServiceError> {
        let ctx = &self.context;
        let session = cancel.child_token();

        let (observer, observer_handle) = VariableObserver::start(
            ctx.backend.clone(),
            ctx.bus.clone(),
            ObserverConfig {
                poll_interval: ctx.settings.poll_interval,
            },
            session.clone(),
        );

        let result = self
            .start_services(&observer, &session, loadsheet_tx)
            .await;
        let handles = match result {
            Ok(handles) => handles,
            Err(e) => {
                session.cancel();
                let _ = observer_handle.await;
                return Err(e);
            }
        };

        info!("Session started");
        let end = self.watch_transport(cancel, &session).await;

        session.cancel();
        for handle in handles {
            let _ = handle.await;
        }
        let _ = observer_handle.await;
        info!(reason = ?end, "Session ended");
        Ok(end)
    }

    async fn start_services(
        &self,
        observer: &VariableObserver,
        session: &CancellationToken,
        loadsheet_tx: mpsc::UnboundedSender<LoadsheetKind>,
    ) -> Result<Vec<JoinHandle<()>>, ServiceError> {
        let ctx = &self.context;
        let translator = SignalTranslator::new(ctx.ground_keys.clone(), ctx.aircraft_keys.clone());
        let names = translator.observed();

        let (change_tx, change_rx) = mpsc::unbounded_channel::<VariableChange>();
        for name in &names {
            let tx = change_tx.clone();
            observer
                .subscribe(name.clone(), move |change: &VariableChange| {
                    let _ = tx.send(change.clone());
                })
                .await?;
        }

        // Subscriptions seed silently; replay the seeds so the machines start
        // from the simulator's actual state.
        for name in names {
            if let Some(value) = observer.current(&name).await? {
                let _ = change_tx.send(VariableChange {
                    name,
                    old: value.clone(),
                    new: value,
                });
            }
        }
        debug!(count = translator.observed().len(), "Variables subscribed");

        let menu = MenuAdapter::new(
            ctx.backend.clone(),
            observer.clone(),
            ctx.ground_keys.clone(),
            ctx.settings.menu.clone(),
        );
        menu.attach().await?;

        let actuators = AircraftActuators::new(ctx.backend.clone(), ctx.aircraft_keys.clone());
        let equipment = GroundEquipmentController::new(
            actuators.clone(),
            menu.clone(),
            observer.clone(),
            ctx.ground_keys.clone(),
            ctx.settings.services.equipment_settle,
        );
        let (automation_tx, automation_handle) =
            AutomationExecutor::new(menu, equipment).start(session.clone());

        let runner = ServiceRunner::new(
            ctx.settings.services.clone(),
            translator,
            actuators,
            ctx.bus.clone(),
        )
        .with_automation(automation_tx)
        .with_loadsheets(loadsheet_tx);
        let runner_handle = tokio::spawn(runner.run(change_rx, ctx.plans.clone(), session.clone()));

        Ok(vec![runner_handle, automation_handle])
    }

    async fn watch_transport(
        &self,
        cancel: &CancellationToken,
        session: &CancellationToken,
    ) -> SessionEnd {
        let mut ticker = interval(self.context.settings.health_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                _ = session.cancelled() => return SessionEnd::Cancelled,
                _ = ticker.tick() => {
                    if !self.context.connection.transport_healthy().await {
                        return SessionEnd::TransportLost;
                    }
                }
            }
        }
    }
}

/// Serve loadsheet requests from the service loop on their own tasks so a
/// slow server never stalls the tick.
fn spawn_loadsheet_worker<T: LoadsheetTransport + 'static>(
    coordinator: Arc<LoadsheetCoordinator<T>>,
    cancel: CancellationToken,
) -> (mpsc::UnboundedSender<LoadsheetKind>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LoadsheetKind>();
    let handle = tokio::spawn(async move {
        loop {
            let kind = tokio::select! {
                _ = cancel.cancelled() => break,
                kind = rx.recv() => match kind {
                    Some(kind) => kind,
                    None => break,
                },
            };
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                match coordinator.generate(kind).await {
                    Ok(outcome) if outcome.is_success() => {
                        info!(kind = %kind, "Loadsheet delivered")
                    }
                    Ok(outcome) => warn!(kind = %kind, outcome = ?outcome, "Loadsheet failed"),
                    Err(e) => warn!(kind = %kind, error = %e, "Loadsheet not generated"),
                }
            });
        }
        debug!("Loadsheet worker stopped");
    });
    (tx, handle)
}
