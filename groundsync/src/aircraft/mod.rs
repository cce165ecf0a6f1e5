//! Aircraft backend: variable names and actuators.

mod actuators;
mod keys;

pub use actuators::{AircraftActuators, Door, GroundEquipment};
pub use keys::{AircraftKeys, DEFAULT_AIRCRAFT_PREFIX};
