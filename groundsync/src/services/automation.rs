//! Automatic ground-service calls.
//!
//! [`ServiceAutomation`] decides what to call, at most once per flight phase.
//! [`AutomationExecutor`] performs the calls on its own task so the service
//! tick never waits for the menu.

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::equipment::GroundEquipmentController;
use crate::flight::FlightState;
use crate::ground_ops::{MenuAdapter, MenuCommand, MenuError, ServiceStatus};
use crate::variables::{BackendError, ObserverError};

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error(transparent)]
    Menu(#[from] MenuError),

    #[error("Equipment write failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// Which services are called automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomationConfig {
    pub auto_refuel: bool,
    pub call_catering: bool,
    pub auto_boarding: bool,
    pub auto_deboarding: bool,
    pub auto_ground_equipment: bool,
}

/// One automatic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutomationStep {
    Call(MenuCommand),
    ConnectEquipment,
    DisconnectEquipment,
}

/// What the planner needs to know about the turnaround.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomationInputs {
    pub phase: FlightState,
    pub refueling: ServiceStatus,
    pub catering: ServiceStatus,
    pub boarding: ServiceStatus,
    pub deboarding: ServiceStatus,
    pub boarding_completed: bool,
}

/// Plans automatic calls, each at most once per phase.
#[derive(Debug)]
pub struct ServiceAutomation {
    config: AutomationConfig,
    phase: FlightState,
    done: HashSet<AutomationStep>,
}

impl ServiceAutomation {
    pub fn new(config: AutomationConfig) -> Self {
        Self {
            config,
            phase: FlightState::Preflight,
            done: HashSet::new(),
        }
    }

    /// Steps due now, in execution order.
    pub fn plan(&mut self, inputs: &AutomationInputs) -> Vec<AutomationStep> {
        if inputs.phase != self.phase {
            self.phase = inputs.phase;
            self.done.clear();
        }

        let cfg = &self.config;
        let idle = |status: ServiceStatus| status == ServiceStatus::Inactive;
        let mut due = Vec::new();

        match inputs.phase {
            FlightState::Departure => {
                if cfg.auto_refuel && idle(inputs.refueling) {
                    due.push(AutomationStep::Call(MenuCommand::Refueling));
                }
                if cfg.call_catering && idle(inputs.catering) {
                    due.push(AutomationStep::Call(MenuCommand::Catering));
                }
                if cfg.auto_boarding && idle(inputs.boarding) {
                    due.push(AutomationStep::Call(MenuCommand::Boarding));
                }
                if cfg.auto_ground_equipment && inputs.boarding_completed {
                    due.push(AutomationStep::DisconnectEquipment);
                }
            }
            FlightState::Arrival => {
                if cfg.auto_ground_equipment {
                    due.push(AutomationStep::ConnectEquipment);
                }
                if cfg.auto_deboarding && idle(inputs.deboarding) {
                    due.push(AutomationStep::Call(MenuCommand::Deboarding));
                }
            }
            _ => {}
        }

        due.retain(|step| self.done.insert(*step));
        due
    }
}

/// Runs automation steps one after another.
pub struct AutomationExecutor {
    menu: MenuAdapter,
    equipment: GroundEquipmentController,
}

impl AutomationExecutor {
    pub fn new(menu: MenuAdapter, equipment: GroundEquipmentController) -> Self {
        Self { menu, equipment }
    }

    /// Spawn the executor. Steps sent on the returned channel run in order.
    pub fn start(
        self,
        cancel: CancellationToken,
    ) -> (mpsc::UnboundedSender<AutomationStep>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            loop {
                let step = tokio::select! {
                    _ = cancel.cancelled() => break,
                    step = rx.recv() => match step {
                        Some(step) => step,
                        None => break,
                    },
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = self.execute(step) => {
                        if let Err(e) = result {
                            warn!(step = ?step, error = %e, "Automation step failed");
                        }
                    }
                }
            }
            debug!("Automation executor stopped");
        });
        (tx, handle)
    }

    pub async fn execute(&self, step: AutomationStep) -> Result<(), AutomationError> {
        info!(step = ?step, "Running automation step");
        match step {
            AutomationStep::Call(command) => {
                self.menu.call(command).await?;
            }
            AutomationStep::ConnectEquipment => self.equipment.connect_all().await?,
            AutomationStep::DisconnectEquipment => self.equipment.disconnect_all().await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(phase: FlightState) -> AutomationInputs {
        AutomationInputs {
            phase,
            refueling: ServiceStatus::Inactive,
            catering: ServiceStatus::Inactive,
            boarding: ServiceStatus::Inactive,
            deboarding: ServiceStatus::Inactive,
            boarding_completed: false,
        }
    }

    fn all_enabled() -> AutomationConfig {
        AutomationConfig {
            auto_refuel: true,
            call_catering: true,
            auto_boarding: true,
            auto_deboarding: true,
            auto_ground_equipment: true,
        }
    }

    #[test]
    fn test_departure_calls_once() {
        let mut automation = ServiceAutomation::new(all_enabled());

        let first = automation.plan(&inputs(FlightState::Departure));
        let second = automation.plan(&inputs(FlightState::Departure));

        assert_eq!(
            first,
            vec![
                AutomationStep::Call(MenuCommand::Refueling),
                AutomationStep::Call(MenuCommand::Catering),
                AutomationStep::Call(MenuCommand::Boarding),
            ]
        );
        assert!(second.is_empty());
    }

    #[test]
    fn test_disabled_services_are_skipped() {
        let mut automation = ServiceAutomation::new(AutomationConfig {
            auto_refuel: true,
            ..Default::default()
        });

        assert_eq!(
            automation.plan(&inputs(FlightState::Departure)),
            vec![AutomationStep::Call(MenuCommand::Refueling)]
        );
    }

    #[test]
    fn test_already_requested_service_not_called() {
        let mut automation = ServiceAutomation::new(all_enabled());
        let mut state = inputs(FlightState::Departure);
        state.refueling = ServiceStatus::Requested;

        assert!(!automation
            .plan(&state)
            .contains(&AutomationStep::Call(MenuCommand::Refueling)));
    }

    #[test]
    fn test_disconnect_after_boarding() {
        let mut automation = ServiceAutomation::new(all_enabled());
        automation.plan(&inputs(FlightState::Departure));
        let mut state = inputs(FlightState::Departure);
        state.boarding_completed = true;

        assert_eq!(
            automation.plan(&state),
            vec![AutomationStep::DisconnectEquipment]
        );
    }

    #[test]
    fn test_arrival_connects_then_deboards_and_resets_per_phase() {
        let mut automation = ServiceAutomation::new(all_enabled());

        assert_eq!(
            automation.plan(&inputs(FlightState::Arrival)),
            vec![
                AutomationStep::ConnectEquipment,
                AutomationStep::Call(MenuCommand::Deboarding),
            ]
        );
        automation.plan(&inputs(FlightState::Turnaround));
        assert_eq!(automation.plan(&inputs(FlightState::Arrival)).len(), 2);
    }
}
