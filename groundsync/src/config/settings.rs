//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::flightplan::FuelUnit;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Simulator connection
    pub connection: ConnectionSettings,
    /// Variable polling and service tick
    pub observer: ObserverSettings,
    /// Ground-ops add-on variables and menu
    pub ground_ops: GroundOpsSettings,
    /// Service behaviour and automation
    pub services: ServicesSettings,
    /// Loadsheet server
    pub loadsheet: LoadsheetSettings,
    /// Flight plan source
    pub flightplan: FlightPlanSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Simulator web API and connection chain.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    /// Delay between reconnection attempts.
    pub retry_delay_secs: u64,
    /// How long to wait for the session to report ready.
    pub session_timeout_secs: u64,
    /// Variable that resolves once an aircraft is loaded.
    pub aircraft_probe: String,
    /// Variable that turns truthy once the session is running.
    pub session_ready: String,
}

#[derive(Debug, Clone)]
pub struct ObserverSettings {
    /// Variable poll interval. Values below 10 ms are clamped.
    pub poll_interval_ms: u64,
    /// Interval of the service tick (refuel progress, plan refresh).
    pub service_tick_ms: u64,
}

#[derive(Debug, Clone)]
pub struct GroundOpsSettings {
    /// Prefix of the add-on's variables.
    pub prefix: String,
    /// Menu text file; detected from the simulator install when unset.
    pub menu_file: Option<PathBuf>,
    pub menu_ready_timeout_ms: u64,
    pub operator_settle_ms: u64,
    pub operator_extra_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServicesSettings {
    /// Open cargo doors while cargo is loaded or unloaded.
    pub open_cargo_doors: bool,
    /// Fuel added per service tick while refueling.
    pub refuel_rate: f64,
    /// Unit of the aircraft's fuel variable.
    pub fuel_unit: FuelUnit,
    pub auto_refuel: bool,
    pub call_catering: bool,
    pub auto_boarding: bool,
    pub auto_deboarding: bool,
    pub auto_ground_equipment: bool,
    /// Pause between ground equipment actions.
    pub equipment_settle_ms: u64,
}

#[derive(Debug, Clone)]
pub struct LoadsheetSettings {
    pub base_url: String,
    /// Minimum time between two attempts of the same kind.
    pub min_interval_secs: u64,
    /// Total requests per attempt.
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Probe the server's health endpoint before requesting.
    pub probe_health: bool,
}

#[derive(Debug, Clone)]
pub struct FlightPlanSettings {
    /// SimBrief pilot id; no plan is fetched when unset.
    pub simbrief_user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path.
    pub file: PathBuf,
}
