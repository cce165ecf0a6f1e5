//! Ground-service state machines and the loop that drives them.
//!
//! Machines are pure: they consume [`Signal`]s and return [`Action`]s. Only
//! the [`ServiceRunner`] touches the backends.

mod action;
mod automation;
mod boarding;
mod cargo;
mod catering;
mod equipment;
mod refuel;
mod runner;
mod seats;
mod signal;

pub use action::Action;
pub use automation::{
    AutomationConfig, AutomationError, AutomationExecutor, AutomationInputs, AutomationStep,
    ServiceAutomation,
};
pub use boarding::{BoardingMachine, DeboardingMachine, CARGO_DONE_PERCENT};
pub use cargo::{CargoMachine, CargoSession};
pub use catering::{CateringMachine, CATERING_DOOR};
pub use equipment::{GroundEquipmentController, DEFAULT_EQUIPMENT_SETTLE};
pub use refuel::{refuel_target, RefuelMachine, RefuelState, DEFAULT_REFUEL_RATE};
pub use runner::{ServiceRunner, ServicesConfig, DEFAULT_PLAN_REFRESH, DEFAULT_SERVICE_TICK};
pub use seats::{clamp_passengers, SeatError, SeatMap, SEAT_COUNT};
pub use signal::{Signal, SignalSnapshot, SignalTranslator};

use crate::events::EventBus;

/// A service state machine.
pub trait ServiceMachine {
    /// React to one signal.
    fn on_signal(&mut self, signal: &Signal, bus: &EventBus) -> Vec<Action>;

    /// Advance time-driven work by one service tick.
    fn on_tick(&mut self, _bus: &EventBus) -> Vec<Action> {
        Vec::new()
    }

    /// Return to the initial state for a new flight.
    fn reset(&mut self, bus: &EventBus);
}
