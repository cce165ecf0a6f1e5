//! Turnaround/flight phase state machine.

use std::fmt;

use tracing::{info, warn};

use crate::events::{EventBus, FlightPhaseEvent};

/// Phase of the current turnaround or flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlightState {
    #[default]
    Preflight,
    Departure,
    TaxiOut,
    Flight,
    TaxiIn,
    Arrival,
    Turnaround,
}

impl FlightState {
    /// Phases reachable from this one.
    pub fn successors(&self) -> &'static [FlightState] {
        use FlightState::*;
        match self {
            Preflight => &[Departure, Flight],
            Departure => &[TaxiOut],
            TaxiOut => &[Flight],
            Flight => &[TaxiIn],
            TaxiIn => &[Arrival],
            Arrival => &[Turnaround],
            Turnaround => &[Departure],
        }
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlightState::Preflight => "preflight",
            FlightState::Departure => "departure",
            FlightState::TaxiOut => "taxi out",
            FlightState::Flight => "flight",
            FlightState::TaxiIn => "taxi in",
            FlightState::Arrival => "arrival",
            FlightState::Turnaround => "turnaround",
        };
        write!(f, "{}", s)
    }
}

/// Callback invoked with (previous, current) on every phase change.
pub type PhaseHandler = Box<dyn Fn(FlightState, FlightState) + Send + Sync>;

/// Holds the current phase and notifies listeners of changes.
pub struct FlightStateMachine {
    current: FlightState,
    previous: FlightState,
    handlers: Vec<PhaseHandler>,
    bus: EventBus,
}

impl FlightStateMachine {
    pub fn new(bus: EventBus) -> Self {
        Self {
            current: FlightState::Preflight,
            previous: FlightState::Preflight,
            handlers: Vec::new(),
            bus,
        }
    }

    pub fn current(&self) -> FlightState {
        self.current
    }

    pub fn previous(&self) -> FlightState {
        self.previous
    }

    /// Whether `to` is a legal successor of the current phase.
    pub fn can_transition_to(&self, to: FlightState) -> bool {
        self.current.successors().contains(&to)
    }

    /// Register a change handler.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(FlightState, FlightState) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Move to `to`. Returns false when already there.
    ///
    /// Edges outside the transition table are applied with a warning.
    pub fn transition_to(&mut self, to: FlightState) -> bool {
        if to == self.current {
            return false;
        }
        if !self.can_transition_to(to) {
            warn!(from = %self.current, to = %to, "Flight phase change outside transition table");
        }
        self.apply(to);
        true
    }

    /// Force `Preflight`. Always notifies.
    pub fn reset(&mut self) {
        self.apply(FlightState::Preflight);
    }

    fn apply(&mut self, to: FlightState) {
        self.previous = self.current;
        self.current = to;
        info!(from = %self.previous, to = %self.current, "Flight phase changed");
        for handler in &self.handlers {
            handler(self.previous, self.current);
        }
        self.bus.publish_flight_phase(FlightPhaseEvent {
            previous: self.previous,
            current: self.current,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_transition_table() {
        let machine = FlightStateMachine::new(EventBus::new());
        assert!(machine.can_transition_to(FlightState::Departure));
        assert!(machine.can_transition_to(FlightState::Flight));
        assert!(!machine.can_transition_to(FlightState::Arrival));
    }

    #[test]
    fn test_transition_notifies_once() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_flight_phase();
        let mut machine = FlightStateMachine::new(bus);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        machine.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(machine.transition_to(FlightState::Departure));
        assert!(!machine.transition_to(FlightState::Departure));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(machine.previous(), FlightState::Preflight);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.current, FlightState::Departure);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_off_table_edges_are_applied() {
        let mut machine = FlightStateMachine::new(EventBus::new());
        assert!(machine.transition_to(FlightState::Arrival));
        assert_eq!(machine.current(), FlightState::Arrival);
    }

    #[test]
    fn test_reset_always_emits() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_flight_phase();
        let mut machine = FlightStateMachine::new(bus);

        machine.reset();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.previous, FlightState::Preflight);
        assert_eq!(event.current, FlightState::Preflight);
    }
}
