//! Variable names exposed by the aircraft backend.

use super::actuators::{Door, GroundEquipment};

/// Default prefix for aircraft variables.
pub const DEFAULT_AIRCRAFT_PREFIX: &str = "aircraft.";

/// Resolved aircraft variable names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AircraftKeys {
    pub forward_cargo_door: String,
    pub aft_cargo_door: String,
    pub forward_right_door: String,
    pub aft_right_door: String,

    pub chocks: String,
    pub gpu: String,
    pub pca: String,

    /// Total fuel on board, in the configured unit.
    pub fuel_quantity: String,
    pub passenger_count: String,
    /// Per-seat occupancy array, addressed as `name[index]`.
    pub seats: String,

    pub on_ground: String,
    pub engines_running: String,
    pub parking_brake: String,
    pub ground_speed: String,
}

impl AircraftKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        let key = |path: &str| format!("{}{}", prefix, path);
        Self {
            forward_cargo_door: key("doors.cargo_fwd"),
            aft_cargo_door: key("doors.cargo_aft"),
            forward_right_door: key("doors.pax_fwd_right"),
            aft_right_door: key("doors.pax_aft_right"),
            chocks: key("ground.chocks"),
            gpu: key("ground.gpu"),
            pca: key("ground.pca"),
            fuel_quantity: key("fuel.total"),
            passenger_count: key("payload.pax_count"),
            seats: key("payload.seats"),
            on_ground: key("state.on_ground"),
            engines_running: key("state.engines_running"),
            parking_brake: key("state.parking_brake"),
            ground_speed: key("state.ground_speed"),
        }
    }

    pub fn door(&self, door: Door) -> &str {
        match door {
            Door::ForwardCargo => &self.forward_cargo_door,
            Door::AftCargo => &self.aft_cargo_door,
            Door::ForwardRight => &self.forward_right_door,
            Door::AftRight => &self.aft_right_door,
        }
    }

    pub fn equipment(&self, equipment: GroundEquipment) -> &str {
        match equipment {
            GroundEquipment::Chocks => &self.chocks,
            GroundEquipment::Gpu => &self.gpu,
            GroundEquipment::Pca => &self.pca,
        }
    }

    /// Name of one seat element.
    pub fn seat(&self, index: usize) -> String {
        format!("{}[{}]", self.seats, index)
    }

    /// Names the service loop observes.
    pub fn observed(&self) -> Vec<&str> {
        vec![
            &self.chocks,
            &self.gpu,
            &self.pca,
            &self.fuel_quantity,
            &self.on_ground,
            &self.engines_running,
            &self.parking_brake,
            &self.ground_speed,
        ]
    }
}

impl Default for AircraftKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_AIRCRAFT_PREFIX)
    }
}
