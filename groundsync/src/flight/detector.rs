//! Derives flight phase changes from aircraft state.
//!
//! ```text
//! Preflight --plan loaded, on ground--> Departure --engines, brake off--> TaxiOut
//!     `--------------airborne----------------------------------------------> Flight
//! TaxiOut --airborne--> Flight --touchdown--> TaxiIn --engines off, brake set, stopped--> Arrival
//! Arrival --deboarding done--> Turnaround --new plan id--> Departure
//! ```

use super::phase::{FlightState, FlightStateMachine};

/// Ground speed (knots) below which the aircraft counts as stopped.
pub const STOPPED_GROUND_SPEED: f64 = 1.0;

/// Latest aircraft and turnaround facts. `None` means not observed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseInputs {
    pub on_ground: Option<bool>,
    pub engines_running: Option<bool>,
    pub parking_brake: Option<bool>,
    /// Knots. Unknown speed does not hold the aircraft in taxi.
    pub ground_speed: Option<f64>,
    /// A flight plan (possibly empty) has been loaded.
    pub plan_loaded: bool,
    /// Identifier of the loaded plan, when the source provides one.
    pub plan_id: Option<String>,
    pub deboarding_completed: bool,
}

/// Applies the phase rules, one transition per evaluation.
#[derive(Debug, Default)]
pub struct PhaseDetector {
    departed_plan: Option<String>,
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the rules for the current phase and apply at most one
    /// transition. Only legal edges are taken.
    pub fn evaluate(
        &mut self,
        machine: &mut FlightStateMachine,
        inputs: &PhaseInputs,
    ) -> Option<FlightState> {
        let next = self.next_phase(machine.current(), inputs)?;
        if !machine.can_transition_to(next) {
            return None;
        }
        if next == FlightState::Departure {
            self.departed_plan = inputs.plan_id.clone();
        }
        machine.transition_to(next);
        Some(next)
    }

    fn next_phase(&self, current: FlightState, inputs: &PhaseInputs) -> Option<FlightState> {
        let on_ground = inputs.on_ground?;
        match current {
            FlightState::Preflight if !on_ground => Some(FlightState::Flight),
            FlightState::Preflight if inputs.plan_loaded => Some(FlightState::Departure),
            FlightState::Departure => {
                let engines = inputs.engines_running?;
                let brake = inputs.parking_brake?;
                (engines && !brake).then_some(FlightState::TaxiOut)
            }
            FlightState::TaxiOut if !on_ground => Some(FlightState::Flight),
            FlightState::Flight if on_ground => Some(FlightState::TaxiIn),
            FlightState::TaxiIn => {
                let engines = inputs.engines_running?;
                let brake = inputs.parking_brake?;
                let stopped = inputs
                    .ground_speed
                    .map_or(true, |speed| speed.abs() < STOPPED_GROUND_SPEED);
                (!engines && brake && stopped).then_some(FlightState::Arrival)
            }
            FlightState::Arrival if inputs.deboarding_completed => Some(FlightState::Turnaround),
            FlightState::Turnaround => match (&inputs.plan_id, &self.departed_plan) {
                (Some(new), Some(old)) if new != old => Some(FlightState::Departure),
                (Some(_), None) => Some(FlightState::Departure),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn ground_inputs() -> PhaseInputs {
        PhaseInputs {
            on_ground: Some(true),
            engines_running: Some(false),
            parking_brake: Some(true),
            ground_speed: None,
            plan_loaded: true,
            plan_id: Some("1001".to_string()),
            deboarding_completed: false,
        }
    }

    #[test]
    fn test_full_cycle() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        let mut detector = PhaseDetector::new();
        let mut inputs = ground_inputs();

        assert_eq!(
            detector.evaluate(&mut machine, &inputs),
            Some(FlightState::Departure)
        );

        inputs.engines_running = Some(true);
        inputs.parking_brake = Some(false);
        assert_eq!(
            detector.evaluate(&mut machine, &inputs),
            Some(FlightState::TaxiOut)
        );

        inputs.on_ground = Some(false);
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::Flight));

        inputs.on_ground = Some(true);
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::TaxiIn));

        inputs.engines_running = Some(false);
        inputs.parking_brake = Some(true);
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::Arrival));

        inputs.deboarding_completed = true;
        assert_eq!(
            detector.evaluate(&mut machine, &inputs),
            Some(FlightState::Turnaround)
        );

        // same plan id keeps us in turnaround
        assert_eq!(detector.evaluate(&mut machine, &inputs), None);

        inputs.plan_id = Some("1002".to_string());
        assert_eq!(
            detector.evaluate(&mut machine, &inputs),
            Some(FlightState::Departure)
        );
    }

    #[test]
    fn test_airborne_start_goes_to_flight() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        let mut detector = PhaseDetector::new();
        let inputs = PhaseInputs {
            on_ground: Some(false),
            ..Default::default()
        };

        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::Flight));
    }

    #[test]
    fn test_unknown_inputs_hold_phase() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        let mut detector = PhaseDetector::new();

        assert_eq!(detector.evaluate(&mut machine, &PhaseInputs::default()), None);
        assert_eq!(machine.current(), FlightState::Preflight);
    }

    #[test]
    fn test_no_plan_stays_in_preflight() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        let mut detector = PhaseDetector::new();
        let inputs = PhaseInputs {
            plan_loaded: false,
            ..ground_inputs()
        };

        assert_eq!(detector.evaluate(&mut machine, &inputs), None);
    }

    #[test]
    fn test_arrival_waits_until_stopped() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        let mut detector = PhaseDetector::new();
        let mut inputs = PhaseInputs {
            on_ground: Some(false),
            ..ground_inputs()
        };
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::Flight));

        inputs.on_ground = Some(true);
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::TaxiIn));

        // brake set while still rolling
        inputs.ground_speed = Some(12.0);
        assert_eq!(detector.evaluate(&mut machine, &inputs), None);

        inputs.ground_speed = Some(0.2);
        assert_eq!(detector.evaluate(&mut machine, &inputs), Some(FlightState::Arrival));
    }
}
