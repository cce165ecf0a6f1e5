//! Variable names exposed by the ground-ops backend.
//!
//! Every name is a vendor prefix followed by a fixed suffix. The prefix is
//! configurable so the same code can drive a renamed or bridged add-on.

/// Default vendor prefix.
pub const DEFAULT_GROUND_OPS_PREFIX: &str = "FSDT_GSX_";

/// Resolved ground-ops variable names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundOpsKeys {
    /// Writing 1 opens the menu.
    pub menu_open: String,
    /// Zero-based index of the chosen menu line.
    pub menu_choice: String,
    /// True while the menu accepts a choice.
    pub menu_ready: String,

    pub boarding_state: String,
    pub deboarding_state: String,
    pub catering_state: String,
    pub refueling_state: String,
    pub pushback_state: String,
    pub jetway_state: String,
    pub stairs_state: String,

    pub fuel_hose_connected: String,
    pub passengers_boarded: String,
    pub passengers_deboarded: String,
    pub boarding_cargo_percent: String,
    pub deboarding_cargo_percent: String,

    /// Flipped by the ground crew when the catering truck wants the service door.
    pub catering_door_toggle: String,
    /// Flipped by the ground crew when the loader wants the cargo doors.
    pub cargo_door_toggle: String,
}

impl GroundOpsKeys {
    /// Build every name from a prefix.
    pub fn with_prefix(prefix: &str) -> Self {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);
        Self {
            menu_open: key("MENU_OPEN"),
            menu_choice: key("MENU_CHOICE"),
            menu_ready: key("MENU_READY"),
            boarding_state: key("BOARDING_STATE"),
            deboarding_state: key("DEBOARDING_STATE"),
            catering_state: key("CATERING_STATE"),
            refueling_state: key("REFUELING_STATE"),
            pushback_state: key("DEPARTURE_STATE"),
            jetway_state: key("JETWAY"),
            stairs_state: key("STAIRS"),
            fuel_hose_connected: key("FUELHOSE_CONNECTED"),
            passengers_boarded: key("NUMPASSENGERS_BOARDING_TOTAL"),
            passengers_deboarded: key("NUMPASSENGERS_DEBOARDING_TOTAL"),
            boarding_cargo_percent: key("BOARDING_CARGO_PERCENT"),
            deboarding_cargo_percent: key("DEBOARDING_CARGO_PERCENT"),
            catering_door_toggle: key("AIRCRAFT_SERVICE_1_TOGGLE"),
            cargo_door_toggle: key("AIRCRAFT_CARGO_1_TOGGLE"),
        }
    }

    /// Names the service loop observes (the menu variables are excluded).
    pub fn observed(&self) -> Vec<&str> {
        vec![
            &self.boarding_state,
            &self.deboarding_state,
            &self.catering_state,
            &self.refueling_state,
            &self.pushback_state,
            &self.jetway_state,
            &self.stairs_state,
            &self.fuel_hose_connected,
            &self.passengers_boarded,
            &self.passengers_deboarded,
            &self.boarding_cargo_percent,
            &self.deboarding_cargo_percent,
            &self.catering_door_toggle,
            &self.cargo_door_toggle,
        ]
    }
}

impl Default for GroundOpsKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_GROUND_OPS_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let keys = GroundOpsKeys::default();
        assert_eq!(keys.boarding_state, "FSDT_GSX_BOARDING_STATE");
        assert_eq!(keys.menu_choice, "FSDT_GSX_MENU_CHOICE");
    }

    #[test]
    fn test_custom_prefix_applies_everywhere() {
        let keys = GroundOpsKeys::with_prefix("gsx/");
        assert!(keys.observed().iter().all(|k| k.starts_with("gsx/")));
        assert_eq!(keys.menu_ready, "gsx/MENU_READY");
    }
}
