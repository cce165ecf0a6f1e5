//! Typed event bus.
//!
//! One `tokio::sync::broadcast` channel per event kind. The bus is created
//! once at startup and handed to every component that publishes; consumers
//! (UI, tests) subscribe to the kinds they care about. Publishing never fails:
//! an event sent while nobody listens is simply dropped.

use tokio::sync::broadcast;

use crate::aircraft::GroundEquipment;
use crate::connection::ConnectionStep;
use crate::flight::FlightState;
use crate::ground_ops::{ServiceKind, ServiceStatus};
use crate::loadsheet::{LoadsheetKind, LoadsheetOutcome};
use crate::variables::VariableChange;

/// Default capacity of each channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Derived status of a ground service changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatusEvent {
    pub service: ServiceKind,
    pub previous: ServiceStatus,
    pub current: ServiceStatus,
}

/// Flight phase changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightPhaseEvent {
    pub previous: FlightState,
    pub current: FlightState,
}

/// One connection step changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub step: ConnectionStep,
    pub connected: bool,
}

/// Chocks, GPU or PCA changed on the aircraft side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentEvent {
    pub equipment: GroundEquipment,
    pub connected: bool,
}

/// A loadsheet attempt finished.
#[derive(Debug, Clone)]
pub struct LoadsheetEvent {
    pub kind: LoadsheetKind,
    pub outcome: LoadsheetOutcome,
}

/// Injected event bus with one channel per event kind.
#[derive(Clone)]
pub struct EventBus {
    variables: broadcast::Sender<VariableChange>,
    service_status: broadcast::Sender<ServiceStatusEvent>,
    flight_phase: broadcast::Sender<FlightPhaseEvent>,
    connectivity: broadcast::Sender<ConnectivityEvent>,
    equipment: broadcast::Sender<EquipmentEvent>,
    loadsheet: broadcast::Sender<LoadsheetEvent>,
}

impl EventBus {
    /// Create a bus with the default per-channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bus with a custom per-channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            variables: broadcast::channel(capacity).0,
            service_status: broadcast::channel(capacity).0,
            flight_phase: broadcast::channel(capacity).0,
            connectivity: broadcast::channel(capacity).0,
            equipment: broadcast::channel(capacity).0,
            loadsheet: broadcast::channel(capacity).0,
        }
    }

    pub fn publish_variable(&self, event: VariableChange) {
        let _ = self.variables.send(event);
    }

    pub fn publish_service_status(&self, event: ServiceStatusEvent) {
        let _ = self.service_status.send(event);
    }

    pub fn publish_flight_phase(&self, event: FlightPhaseEvent) {
        let _ = self.flight_phase.send(event);
    }

    pub fn publish_connectivity(&self, event: ConnectivityEvent) {
        let _ = self.connectivity.send(event);
    }

    pub fn publish_equipment(&self, event: EquipmentEvent) {
        let _ = self.equipment.send(event);
    }

    pub fn publish_loadsheet(&self, event: LoadsheetEvent) {
        let _ = self.loadsheet.send(event);
    }

    pub fn subscribe_variables(&self) -> broadcast::Receiver<VariableChange> {
        self.variables.subscribe()
    }

    pub fn subscribe_service_status(&self) -> broadcast::Receiver<ServiceStatusEvent> {
        self.service_status.subscribe()
    }

    pub fn subscribe_flight_phase(&self) -> broadcast::Receiver<FlightPhaseEvent> {
        self.flight_phase.subscribe()
    }

    pub fn subscribe_connectivity(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.connectivity.subscribe()
    }

    pub fn subscribe_equipment(&self) -> broadcast::Receiver<EquipmentEvent> {
        self.equipment.subscribe()
    }

    pub fn subscribe_loadsheet(&self) -> broadcast::Receiver<LoadsheetEvent> {
        self.loadsheet.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish_flight_phase(FlightPhaseEvent {
            previous: FlightState::Preflight,
            current: FlightState::Departure,
        });
    }

    #[test]
    fn test_subscribers_receive_their_kind_only() {
        let bus = EventBus::new();
        let mut phases = bus.subscribe_flight_phase();
        let mut equipment = bus.subscribe_equipment();

        bus.publish_flight_phase(FlightPhaseEvent {
            previous: FlightState::Preflight,
            current: FlightState::Flight,
        });

        assert_eq!(phases.try_recv().unwrap().current, FlightState::Flight);
        assert!(equipment.try_recv().is_err());
    }
}
