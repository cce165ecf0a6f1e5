//! Refueling.
//!
//! ```text
//! Inactive --ground ops active--> Active <--hose--> Paused
//!                                   |
//!                                   `--target reached / reported done--> Completed
//! ```
//!
//! The target is the planned fuel rounded up to the next 100 units, fixed at
//! session start. Fuel only moves while `Active`, by `rate_per_tick` per
//! service tick, and never past the target.

use std::fmt;

use tracing::{debug, info};

use super::action::Action;
use super::signal::Signal;
use super::ServiceMachine;
use crate::events::EventBus;
use crate::flightplan::FuelUnit;
use crate::ground_ops::{ServiceKind, ServiceStatus, StatusTracker};
use crate::loadsheet::LoadsheetKind;

/// Default fuel added per service tick.
pub const DEFAULT_REFUEL_RATE: f64 = 28.0;

/// Distance to the target treated as full.
const TARGET_TOLERANCE: f64 = 1.0;

/// Round planned fuel up to the next 100 units.
pub fn refuel_target(planned: f64) -> f64 {
    (planned / 100.0).ceil() * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefuelState {
    #[default]
    Inactive,
    Active,
    Paused,
    Completed,
}

impl fmt::Display for RefuelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefuelState::Inactive => "inactive",
            RefuelState::Active => "active",
            RefuelState::Paused => "paused",
            RefuelState::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Refueling session.
#[derive(Debug, Clone)]
pub struct RefuelMachine {
    tracker: StatusTracker,
    state: RefuelState,
    planned: f64,
    target: f64,
    current: f64,
    /// Latest quantity reported by the aircraft, used as the starting point.
    aircraft_fuel: f64,
    units: FuelUnit,
    rate_per_tick: f64,
    hose_connected: bool,
}

impl RefuelMachine {
    pub fn new(rate_per_tick: f64, units: FuelUnit) -> Self {
        Self {
            tracker: StatusTracker::new(ServiceKind::Refueling),
            state: RefuelState::Inactive,
            planned: 0.0,
            target: 0.0,
            current: 0.0,
            aircraft_fuel: 0.0,
            units,
            rate_per_tick: rate_per_tick.max(0.0),
            hose_connected: false,
        }
    }

    /// Set the planned fuel for the next session.
    pub fn set_planned(&mut self, planned: f64) {
        self.planned = planned.max(0.0);
    }

    pub fn state(&self) -> RefuelState {
        self.state
    }

    pub fn status(&self) -> ServiceStatus {
        self.tracker.status()
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn units(&self) -> FuelUnit {
        self.units
    }

    fn start(&mut self, actions: &mut Vec<Action>) {
        self.target = refuel_target(self.planned);
        self.current = self.aircraft_fuel;
        info!(
            start = self.current,
            planned = self.planned,
            target = self.target,
            units = %self.units,
            "Refueling started"
        );
        actions.push(Action::RequestLoadsheet(LoadsheetKind::Preliminary));

        if self.current >= self.target {
            info!("Fuel already at or above target");
            self.state = RefuelState::Completed;
            return;
        }
        self.state = if self.hose_connected {
            RefuelState::Active
        } else {
            RefuelState::Paused
        };
    }

    fn finish(&mut self, actions: &mut Vec<Action>) {
        if self.current < self.target {
            self.current = self.target;
            actions.push(Action::SetFuel(self.current));
        }
        self.state = RefuelState::Completed;
        info!(fuel = self.current, units = %self.units, "Refueling complete");
    }
}

impl ServiceMachine for RefuelMachine {
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        match *signal {
            Signal::RefuelingState(code) => match self.tracker.update(code, bus) {
                Some(ServiceStatus::Active) if self.state == RefuelState::Inactive => {
                    self.start(&mut actions)
                }
                Some(ServiceStatus::Completed)
                    if matches!(self.state, RefuelState::Active | RefuelState::Paused) =>
                {
                    self.finish(&mut actions)
                }
                _ => {}
            },
            Signal::FuelHoseConnected(connected) => {
                self.hose_connected = connected;
                match (self.state, connected) {
                    (RefuelState::Active, false) => {
                        debug!("Fuel hose disconnected, pausing");
                        self.state = RefuelState::Paused;
                    }
                    (RefuelState::Paused, true) => {
                        debug!("Fuel hose connected, resuming");
                        self.state = RefuelState::Active;
                    }
                    _ => {}
                }
            }
            Signal::FuelQuantity(quantity) => {
                self.aircraft_fuel = quantity;
            }
            _ => {}
        }
        actions
    }

    fn on_tick(&mut self, _bus: &EventBus) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state != RefuelState::Active {
            return actions;
        }

        let next = (self.current + self.rate_per_tick).min(self.target);
        if next > self.current {
            self.current = next;
            actions.push(Action::SetFuel(self.current));
        }
        if (self.target - self.current).abs() < TARGET_TOLERANCE {
            self.finish(&mut actions);
        }
        actions
    }

    fn reset(&mut self, bus: &EventBus) {
        self.tracker.reset(bus);
        self.state = RefuelState::Inactive;
        self.target = 0.0;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn machine(planned: f64, start: f64, rate: f64) -> (RefuelMachine, EventBus) {
        let bus = EventBus::new();
        let mut machine = RefuelMachine::new(rate, FuelUnit::Kilograms);
        machine.set_planned(planned);
        machine.on_signal(&Signal::FuelQuantity(start), &bus);
        (machine, bus)
    }

    #[test]
    fn test_target_rounding() {
        assert_eq!(refuel_target(7050.0), 7100.0);
        assert_eq!(refuel_target(7000.0), 7000.0);
        assert_eq!(refuel_target(0.0), 0.0);
    }

    #[test]
    fn test_target_fixed_at_start() {
        let (mut machine, bus) = machine(7050.0, 2000.0, 100.0);
        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);

        let actions = machine.on_signal(&Signal::RefuelingState(5), &bus);

        assert_eq!(machine.target(), 7100.0);
        assert_eq!(machine.current(), 2000.0);
        assert_eq!(machine.state(), RefuelState::Active);
        assert_eq!(
            actions,
            vec![Action::RequestLoadsheet(LoadsheetKind::Preliminary)]
        );

        machine.set_planned(9000.0);
        assert_eq!(machine.target(), 7100.0);
    }

    #[test]
    fn test_waits_for_hose() {
        let (mut machine, bus) = machine(3000.0, 1000.0, 100.0);
        machine.on_signal(&Signal::RefuelingState(5), &bus);
        assert_eq!(machine.state(), RefuelState::Paused);
        assert!(machine.on_tick(&bus).is_empty());

        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);
        assert_eq!(machine.on_tick(&bus), vec![Action::SetFuel(1100.0)]);

        machine.on_signal(&Signal::FuelHoseConnected(false), &bus);
        assert_eq!(machine.state(), RefuelState::Paused);
        assert!(machine.on_tick(&bus).is_empty());
        assert_eq!(machine.current(), 1100.0);
    }

    #[test]
    fn test_non_decreasing_and_clamped() {
        let (mut machine, bus) = machine(1250.0, 1000.0, 120.0);
        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);
        machine.on_signal(&Signal::RefuelingState(5), &bus);

        let mut last = machine.current();
        for _ in 0..10 {
            machine.on_tick(&bus);
            assert!(machine.current() >= last);
            assert!(machine.current() <= machine.target());
            last = machine.current();
        }
        assert_eq!(machine.current(), 1300.0);
        assert_eq!(machine.state(), RefuelState::Completed);
    }

    #[test]
    fn test_reported_done_snaps_to_target() {
        let (mut machine, bus) = machine(5000.0, 1000.0, 50.0);
        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);
        machine.on_signal(&Signal::RefuelingState(5), &bus);
        machine.on_tick(&bus);

        let actions = machine.on_signal(&Signal::RefuelingState(6), &bus);

        assert_eq!(actions, vec![Action::SetFuel(5000.0)]);
        assert_eq!(machine.state(), RefuelState::Completed);
    }

    #[test]
    fn test_already_full_completes_without_writes() {
        let (mut machine, bus) = machine(4000.0, 4500.0, 50.0);
        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);

        machine.on_signal(&Signal::RefuelingState(5), &bus);

        assert_eq!(machine.state(), RefuelState::Completed);
        assert!(machine.on_tick(&bus).is_empty());
        assert!(machine
            .on_signal(&Signal::RefuelingState(6), &bus)
            .is_empty());
    }

    #[test]
    fn test_aircraft_fuel_does_not_move_active_session() {
        let (mut machine, bus) = machine(5000.0, 1000.0, 50.0);
        machine.on_signal(&Signal::FuelHoseConnected(true), &bus);
        machine.on_signal(&Signal::RefuelingState(5), &bus);

        machine.on_signal(&Signal::FuelQuantity(3000.0), &bus);

        assert_eq!(machine.current(), 1000.0);
    }

    proptest! {
        /// Fuel never decreases while active and never passes the target.
        #[test]
        fn prop_refuel_monotonic_and_bounded(
            planned in 0.0f64..20000.0,
            start in 0.0f64..20000.0,
            rate in 1.0f64..500.0,
        ) {
            let (mut machine, bus) = machine(planned, start, rate);
            machine.on_signal(&Signal::FuelHoseConnected(true), &bus);
            machine.on_signal(&Signal::RefuelingState(5), &bus);

            let mut last = machine.current();
            for _ in 0..200 {
                machine.on_tick(&bus);
                prop_assert!(machine.current() >= last);
                last = machine.current();
            }
            if machine.target() >= start {
                prop_assert!(machine.current() <= machine.target());
            }
        }
    }
}
