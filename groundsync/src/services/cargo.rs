//! Cargo doors during loading and unloading.
//!
//! Cargo moves together with the passengers: loading runs while boarding is
//! active, unloading while deboarding is. Doors open when the activity
//! starts (if enabled) and close when the percentage reaches 100 from below.

use tracing::{debug, info};

use super::action::Action;
use super::signal::Signal;
use super::ServiceMachine;
use crate::aircraft::Door;
use crate::events::EventBus;
use crate::ground_ops::{ServiceKind, ServiceStatus, StatusTracker};

const FULL_PERCENT: f64 = 100.0;

/// Door and progress bookkeeping for cargo handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CargoSession {
    pub forward_door_open: bool,
    pub aft_door_open: bool,
    pub loading_active: bool,
    pub unloading_active: bool,
    pub loading_percent: f64,
    pub unloading_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Loading,
    Unloading,
}

#[derive(Debug, Clone)]
pub struct CargoMachine {
    session: CargoSession,
    loading: StatusTracker,
    unloading: StatusTracker,
    open_cargo_doors: bool,
}

impl CargoMachine {
    pub fn new(open_cargo_doors: bool) -> Self {
        Self {
            session: CargoSession::default(),
            loading: StatusTracker::new(ServiceKind::CargoLoading),
            unloading: StatusTracker::new(ServiceKind::CargoUnloading),
            open_cargo_doors,
        }
    }

    pub fn session(&self) -> &CargoSession {
        &self.session
    }

    fn set_doors(&mut self, open: bool, actions: &mut Vec<Action>) {
        if self.session.forward_door_open != open {
            self.session.forward_door_open = open;
            actions.push(Action::SetDoor {
                door: Door::ForwardCargo,
                open,
            });
        }
        if self.session.aft_door_open != open {
            self.session.aft_door_open = open;
            actions.push(Action::SetDoor {
                door: Door::AftCargo,
                open,
            });
        }
    }

    fn active(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Loading => &mut self.session.loading_active,
            Direction::Unloading => &mut self.session.unloading_active,
        }
    }

    fn start(&mut self, direction: Direction, actions: &mut Vec<Action>) {
        let active = self.active(direction);
        if *active {
            return;
        }
        *active = true;
        info!(direction = ?direction, "Cargo handling started");
        if self.open_cargo_doors {
            self.set_doors(true, actions);
        }
    }

    fn stop(&mut self, direction: Direction, actions: &mut Vec<Action>) {
        *self.active(direction) = false;
        info!(direction = ?direction, "Cargo handling finished");
        self.set_doors(false, actions);
    }

    fn on_status(&mut self, direction: Direction, status: Option<ServiceStatus>, actions: &mut Vec<Action>) {
        match status {
            Some(ServiceStatus::Active) => self.start(direction, actions),
            Some(ServiceStatus::Completed) if *self.active(direction) => self.stop(direction, actions),
            _ => {}
        }
    }

    fn on_percent(&mut self, direction: Direction, percent: f64, actions: &mut Vec<Action>) {
        let previous = match direction {
            Direction::Loading => {
                std::mem::replace(&mut self.session.loading_percent, percent)
            }
            Direction::Unloading => {
                std::mem::replace(&mut self.session.unloading_percent, percent)
            }
        };
        debug!(direction = ?direction, previous, percent, "Cargo progress");

        if previous < FULL_PERCENT && percent >= FULL_PERCENT {
            self.stop(direction, actions);
        } else if percent > 0.0 && percent < FULL_PERCENT {
            self.start(direction, actions);
        }
    }
}

impl ServiceMachine for CargoMachine {
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        match *signal {
            Signal::BoardingState(code) => {
                let status = self.loading.update(code, bus);
                self.on_status(Direction::Loading, status, &mut actions);
            }
            Signal::DeboardingState(code) => {
                let status = self.unloading.update(code, bus);
                self.on_status(Direction::Unloading, status, &mut actions);
            }
            Signal::CargoBoardPercent(percent) => {
                self.on_percent(Direction::Loading, percent, &mut actions)
            }
            Signal::CargoDeboardPercent(percent) => {
                self.on_percent(Direction::Unloading, percent, &mut actions)
            }
            Signal::CargoDoorToggle => {
                let busy = self.session.loading_active || self.session.unloading_active;
                let open = self.session.forward_door_open || self.session.aft_door_open;
                if busy && !open {
                    info!("Loader at the aircraft, opening cargo doors");
                    self.set_doors(true, &mut actions);
                } else if !busy && open {
                    info!("Loader gone, closing cargo doors");
                    self.set_doors(false, &mut actions);
                }
            }
            _ => {}
        }
        actions
    }

    fn reset(&mut self, bus: &EventBus) {
        self.loading.reset(bus);
        self.unloading.reset(bus);
        let doors = (self.session.forward_door_open, self.session.aft_door_open);
        self.session = CargoSession {
            forward_door_open: doors.0,
            aft_door_open: doors.1,
            ..CargoSession::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door_writes(actions: &[Action], open: bool) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::SetDoor { open: o, .. } if *o == open))
            .count()
    }

    #[test]
    fn test_doors_close_exactly_once_at_full() {
        let bus = EventBus::new();
        let mut machine = CargoMachine::new(true);
        let opened = machine.on_signal(&Signal::BoardingState(5), &bus);
        assert_eq!(door_writes(&opened, true), 2);

        machine.on_signal(&Signal::CargoBoardPercent(97.0), &bus);
        let closed = machine.on_signal(&Signal::CargoBoardPercent(100.0), &bus);
        let again = machine.on_signal(&Signal::CargoBoardPercent(100.0), &bus);
        let done = machine.on_signal(&Signal::BoardingState(6), &bus);

        assert_eq!(door_writes(&closed, false), 2);
        assert!(again.is_empty());
        assert!(done.is_empty());
        assert!(!machine.session().forward_door_open);
        assert!(!machine.session().aft_door_open);
    }

    #[test]
    fn test_doors_stay_closed_when_disabled() {
        let bus = EventBus::new();
        let mut machine = CargoMachine::new(false);

        let actions = machine.on_signal(&Signal::BoardingState(5), &bus);

        assert!(actions.is_empty());
        assert!(machine.session().loading_active);
    }

    #[test]
    fn test_percent_starts_activity() {
        let bus = EventBus::new();
        let mut machine = CargoMachine::new(true);

        let actions = machine.on_signal(&Signal::CargoDeboardPercent(12.0), &bus);

        assert!(machine.session().unloading_active);
        assert_eq!(door_writes(&actions, true), 2);
    }

    #[test]
    fn test_toggle_opens_doors_for_busy_loader() {
        let bus = EventBus::new();
        let mut machine = CargoMachine::new(false);
        machine.on_signal(&Signal::BoardingState(5), &bus);

        let actions = machine.on_signal(&Signal::CargoDoorToggle, &bus);

        assert_eq!(door_writes(&actions, true), 2);
    }
}
