//! Flight phase tracking.

mod detector;
mod phase;

pub use detector::{PhaseDetector, PhaseInputs};
pub use phase::{FlightState, FlightStateMachine, PhaseHandler};
