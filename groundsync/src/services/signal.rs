//! Translation of raw variable changes into typed signals.

use crate::aircraft::AircraftKeys;
use crate::ground_ops::{GroundOpsKeys, ServiceStatus, SERVICE_STATES};
use crate::variables::{VarValue, VariableChange};

/// A variable change the service machines understand.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    BoardingState(i64),
    DeboardingState(i64),
    CateringState(i64),
    RefuelingState(i64),
    PushbackState(i64),
    Jetway(i64),
    Stairs(i64),

    PassengersBoarded(i64),
    PassengersDeboarded(i64),
    CargoBoardPercent(f64),
    CargoDeboardPercent(f64),
    FuelHoseConnected(bool),
    /// The crew asked for the catering door (rising edge).
    CateringDoorToggle,
    /// The crew asked for the cargo doors (rising edge).
    CargoDoorToggle,

    Chocks(bool),
    Gpu(bool),
    Pca(bool),
    OnGround(bool),
    EnginesRunning(bool),
    ParkingBrake(bool),
    GroundSpeed(f64),
    FuelQuantity(f64),
}

/// Maps variable names of both backends to [`Signal`]s.
#[derive(Debug, Clone)]
pub struct SignalTranslator {
    ground: GroundOpsKeys,
    aircraft: AircraftKeys,
}

impl SignalTranslator {
    pub fn new(ground: GroundOpsKeys, aircraft: AircraftKeys) -> Self {
        Self { ground, aircraft }
    }

    /// Every name that produces signals.
    pub fn observed(&self) -> Vec<String> {
        self.ground
            .observed()
            .into_iter()
            .chain(self.aircraft.observed())
            .map(str::to_string)
            .collect()
    }

    /// Translate one change. Unknown names and unusable values yield `None`.
    pub fn translate(&self, change: &VariableChange) -> Option<Signal> {
        let g = &self.ground;
        let a = &self.aircraft;
        let name = change.name.as_str();
        let new = &change.new;

        let signal = if name == g.boarding_state {
            Signal::BoardingState(new.as_i64()?)
        } else if name == g.deboarding_state {
            Signal::DeboardingState(new.as_i64()?)
        } else if name == g.catering_state {
            Signal::CateringState(new.as_i64()?)
        } else if name == g.refueling_state {
            Signal::RefuelingState(new.as_i64()?)
        } else if name == g.pushback_state {
            Signal::PushbackState(new.as_i64()?)
        } else if name == g.jetway_state {
            Signal::Jetway(new.as_i64()?)
        } else if name == g.stairs_state {
            Signal::Stairs(new.as_i64()?)
        } else if name == g.passengers_boarded {
            Signal::PassengersBoarded(new.as_i64()?)
        } else if name == g.passengers_deboarded {
            Signal::PassengersDeboarded(new.as_i64()?)
        } else if name == g.boarding_cargo_percent {
            Signal::CargoBoardPercent(new.as_f64()?)
        } else if name == g.deboarding_cargo_percent {
            Signal::CargoDeboardPercent(new.as_f64()?)
        } else if name == g.fuel_hose_connected {
            Signal::FuelHoseConnected(new.as_bool())
        } else if name == g.catering_door_toggle {
            return rising_edge(&change.old, new).then_some(Signal::CateringDoorToggle);
        } else if name == g.cargo_door_toggle {
            return rising_edge(&change.old, new).then_some(Signal::CargoDoorToggle);
        } else if name == a.chocks {
            Signal::Chocks(new.as_bool())
        } else if name == a.gpu {
            Signal::Gpu(new.as_bool())
        } else if name == a.pca {
            Signal::Pca(new.as_bool())
        } else if name == a.on_ground {
            Signal::OnGround(new.as_bool())
        } else if name == a.engines_running {
            Signal::EnginesRunning(new.as_bool())
        } else if name == a.parking_brake {
            Signal::ParkingBrake(new.as_bool())
        } else if name == a.ground_speed {
            Signal::GroundSpeed(new.as_f64()?)
        } else if name == a.fuel_quantity {
            Signal::FuelQuantity(new.as_f64()?)
        } else {
            return None;
        };
        Some(signal)
    }
}

fn rising_edge(old: &VarValue, new: &VarValue) -> bool {
    !old.as_bool() && new.as_bool()
}

/// Latest ground-ops service values, kept whatever the flight phase.
///
/// Ground ops may start a service before the matching phase begins (boarding
/// called while the plan is still loading). A new session replays what was
/// last reported so its machines pick up where ground ops already is. Door
/// toggles are edges and are never kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSnapshot {
    boarding: Option<i64>,
    deboarding: Option<i64>,
    catering: Option<i64>,
    refueling: Option<i64>,
    passengers_boarded: Option<i64>,
    passengers_deboarded: Option<i64>,
    cargo_board: Option<f64>,
    cargo_deboard: Option<f64>,
    fuel_hose: Option<bool>,
}

impl SignalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `signal` if it carries ground-ops service state.
    pub fn record(&mut self, signal: &Signal) {
        match *signal {
            Signal::BoardingState(code) => self.boarding = Some(code),
            Signal::DeboardingState(code) => self.deboarding = Some(code),
            Signal::CateringState(code) => self.catering = Some(code),
            Signal::RefuelingState(code) => self.refueling = Some(code),
            Signal::PassengersBoarded(n) => self.passengers_boarded = Some(n),
            Signal::PassengersDeboarded(n) => self.passengers_deboarded = Some(n),
            Signal::CargoBoardPercent(p) => self.cargo_board = Some(p),
            Signal::CargoDeboardPercent(p) => self.cargo_deboard = Some(p),
            Signal::FuelHoseConnected(v) => self.fuel_hose = Some(v),
            _ => {}
        }
    }

    /// Signals that bring fresh departure machines up to date.
    ///
    /// Service states are replayed only while requested or in progress: a
    /// `done` left over from the previous flight must not complete the new
    /// one. The hose comes before refueling and states before counts.
    pub fn departure(&self) -> Vec<Signal> {
        let mut signals = Vec::new();
        signals.extend(self.fuel_hose.map(Signal::FuelHoseConnected));
        signals.extend(in_progress(self.refueling).map(Signal::RefuelingState));
        signals.extend(in_progress(self.catering).map(Signal::CateringState));
        signals.extend(in_progress(self.boarding).map(Signal::BoardingState));
        signals.extend(self.passengers_boarded.map(Signal::PassengersBoarded));
        signals.extend(self.cargo_board.map(Signal::CargoBoardPercent));
        signals
    }

    /// Signals that bring fresh arrival machines up to date.
    pub fn arrival(&self) -> Vec<Signal> {
        let mut signals = Vec::new();
        signals.extend(in_progress(self.deboarding).map(Signal::DeboardingState));
        signals.extend(self.passengers_deboarded.map(Signal::PassengersDeboarded));
        signals.extend(self.cargo_deboard.map(Signal::CargoDeboardPercent));
        signals
    }
}

fn in_progress(code: Option<i64>) -> Option<i64> {
    code.filter(|code| {
        matches!(
            SERVICE_STATES.map(*code),
            ServiceStatus::Requested | ServiceStatus::Active
        )
    })
}
