//! Catering door handling.
//!
//! The catering truck asks for the service door through a toggle variable.
//! Whether the door opens or closes depends on the catering status and on
//! what was already done with the door.

use tracing::{debug, info};

use super::action::Action;
use super::signal::Signal;
use super::ServiceMachine;
use crate::aircraft::Door;
use crate::events::EventBus;
use crate::ground_ops::{ServiceKind, ServiceStatus, StatusTracker};

/// Door served by the catering truck.
pub const CATERING_DOOR: Door = Door::ForwardRight;

#[derive(Debug, Clone)]
pub struct CateringMachine {
    tracker: StatusTracker,
    door_open: bool,
}

impl CateringMachine {
    pub fn new() -> Self {
        Self {
            tracker: StatusTracker::new(ServiceKind::Catering),
            door_open: false,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        self.tracker.status()
    }

    pub fn door_open(&self) -> bool {
        self.door_open
    }

    fn set_door(&mut self, open: bool, actions: &mut Vec<Action>) {
        if self.door_open == open {
            return;
        }
        self.door_open = open;
        actions.push(Action::SetDoor {
            door: CATERING_DOOR,
            open,
        });
    }
}

impl Default for CateringMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMachine for CateringMachine {
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        match *signal {
            Signal::CateringState(code) => {
                if self.tracker.update(code, bus) == Some(ServiceStatus::Completed) && self.door_open {
                    info!("Catering complete, closing door");
                    self.set_door(false, &mut actions);
                }
            }
            Signal::CateringDoorToggle => match (self.tracker.status(), self.door_open) {
                (ServiceStatus::Requested, _) | (ServiceStatus::Active, false) => {
                    info!("Catering truck at the door, opening");
                    self.set_door(true, &mut actions);
                }
                (ServiceStatus::Active, true) => {
                    info!("Catering truck leaving, closing door");
                    self.set_door(false, &mut actions);
                }
                (status, _) => debug!(status = %status, "Catering door toggle ignored"),
            },
            _ => {}
        }
        actions
    }

    fn reset(&mut self, bus: &EventBus) {
        self.tracker.reset(bus);
        self.door_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_opens_then_closes_while_active() {
        let bus = EventBus::new();
        let mut machine = CateringMachine::new();
        machine.on_signal(&Signal::CateringState(5), &bus);

        let open = machine.on_signal(&Signal::CateringDoorToggle, &bus);
        let close = machine.on_signal(&Signal::CateringDoorToggle, &bus);

        assert_eq!(
            open,
            vec![Action::SetDoor {
                door: CATERING_DOOR,
                open: true
            }]
        );
        assert_eq!(
            close,
            vec![Action::SetDoor {
                door: CATERING_DOOR,
                open: false
            }]
        );
    }

    #[test]
    fn test_requested_opens_once() {
        let bus = EventBus::new();
        let mut machine = CateringMachine::new();
        machine.on_signal(&Signal::CateringState(4), &bus);

        assert_eq!(machine.on_signal(&Signal::CateringDoorToggle, &bus).len(), 1);
        // already open, no second write
        assert!(machine
            .on_signal(&Signal::CateringDoorToggle, &bus)
            .is_empty());
        assert!(machine.door_open());
    }

    #[test]
    fn test_completed_ignores_toggles_and_closes_door() {
        let bus = EventBus::new();
        let mut machine = CateringMachine::new();
        machine.on_signal(&Signal::CateringState(5), &bus);
        machine.on_signal(&Signal::CateringDoorToggle, &bus);

        let actions = machine.on_signal(&Signal::CateringState(6), &bus);
        assert_eq!(
            actions,
            vec![Action::SetDoor {
                door: CATERING_DOOR,
                open: false
            }]
        );

        assert!(machine
            .on_signal(&Signal::CateringDoorToggle, &bus)
            .is_empty());
    }

    #[test]
    fn test_inactive_ignores_toggle() {
        let bus = EventBus::new();
        let mut machine = CateringMachine::new();
        assert!(machine
            .on_signal(&Signal::CateringDoorToggle, &bus)
            .is_empty());
    }
}
