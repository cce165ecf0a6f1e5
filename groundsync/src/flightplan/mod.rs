//! Flight plan retrieval.
//!
//! The service loop needs three numbers from the dispatch plan: planned
//! block fuel, its unit and the passenger count. Sources are pluggable so
//! tests and offline sessions can supply a fixed plan.

mod simbrief;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

pub use simbrief::{SimbriefSource, SIMBRIEF_FETCH_URL};

/// Errors raised while fetching or parsing a flight plan.
#[derive(Debug, Error)]
pub enum FlightPlanError {
    #[error("Flight plan request failed: {0}")]
    Http(String),

    #[error("Flight plan service returned status {0}")]
    Status(u16),

    #[error("Malformed flight plan: {0}")]
    Format(String),

    #[error("No flight plan source configured")]
    NotConfigured,
}

/// Unit of fuel quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FuelUnit {
    #[default]
    Kilograms,
    Pounds,
}

impl FromStr for FuelUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" => Ok(FuelUnit::Kilograms),
            "lb" | "lbs" => Ok(FuelUnit::Pounds),
            other => Err(format!("unknown fuel unit '{}', expected kg or lb", other)),
        }
    }
}

impl fmt::Display for FuelUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelUnit::Kilograms => write!(f, "kg"),
            FuelUnit::Pounds => write!(f, "lb"),
        }
    }
}

/// The parts of a dispatch plan the turnaround needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightPlan {
    /// Identifier of the plan; a new id means a new flight.
    pub id: Option<String>,
    pub units: FuelUnit,
    /// Planned ramp fuel in `units`.
    pub planned_fuel: f64,
    /// Planned passengers. May be negative in broken plans; consumers validate.
    pub passengers: i64,
}

impl FlightPlan {
    /// Plan fuel expressed in `unit`.
    pub fn fuel_in(&self, unit: FuelUnit) -> f64 {
        const LB_PER_KG: f64 = 2.204_622_62;
        match (self.units, unit) {
            (FuelUnit::Kilograms, FuelUnit::Pounds) => self.planned_fuel * LB_PER_KG,
            (FuelUnit::Pounds, FuelUnit::Kilograms) => self.planned_fuel / LB_PER_KG,
            _ => self.planned_fuel,
        }
    }
}

/// Supplies the current flight plan.
#[async_trait]
pub trait FlightPlanSource: Send + Sync {
    async fn fetch(&self) -> Result<FlightPlan, FlightPlanError>;
}

/// A fixed plan, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticFlightPlan {
    plan: FlightPlan,
}

impl StaticFlightPlan {
    pub fn new(plan: FlightPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl FlightPlanSource for StaticFlightPlan {
    async fn fetch(&self) -> Result<FlightPlan, FlightPlanError> {
        Ok(self.plan.clone())
    }
}
