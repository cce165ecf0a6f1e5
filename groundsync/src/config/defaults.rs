//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::flightplan::FuelUnit;

// =============================================================================
// [connection]
// =============================================================================

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// [observer]
// =============================================================================

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_SERVICE_TICK_MS: u64 = 1000;

// =============================================================================
// [ground_ops]
// =============================================================================

pub const DEFAULT_MENU_READY_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_OPERATOR_SETTLE_MS: u64 = 1000;
pub const DEFAULT_OPERATOR_EXTRA_DELAY_MS: u64 = 1500;

// =============================================================================
// [services]
// =============================================================================

pub const DEFAULT_EQUIPMENT_SETTLE_MS: u64 = 1500;

// =============================================================================
// [loadsheet]
// =============================================================================

pub const DEFAULT_LOADSHEET_MIN_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_LOADSHEET_MAX_RETRIES: u32 = 3;
pub const DEFAULT_LOADSHEET_TIMEOUT_SECS: u64 = 10;

/// Default log file (~/.groundsync/groundsync.log).
pub fn default_log_file() -> PathBuf {
    super::config_directory().join("groundsync.log")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
                session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
                aircraft_probe: crate::xplane::DEFAULT_AIRCRAFT_PROBE.to_string(),
                session_ready: crate::xplane::DEFAULT_SESSION_READY.to_string(),
            },
            observer: ObserverSettings {
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
                service_tick_ms: DEFAULT_SERVICE_TICK_MS,
            },
            ground_ops: GroundOpsSettings {
                prefix: crate::ground_ops::DEFAULT_GROUND_OPS_PREFIX.to_string(),
                menu_file: None,
                menu_ready_timeout_ms: DEFAULT_MENU_READY_TIMEOUT_MS,
                operator_settle_ms: DEFAULT_OPERATOR_SETTLE_MS,
                operator_extra_delay_ms: DEFAULT_OPERATOR_EXTRA_DELAY_MS,
            },
            services: ServicesSettings {
                open_cargo_doors: true,
                refuel_rate: crate::services::DEFAULT_REFUEL_RATE,
                fuel_unit: FuelUnit::Kilograms,
                auto_refuel: false,
                call_catering: false,
                auto_boarding: false,
                auto_deboarding: false,
                auto_ground_equipment: false,
                equipment_settle_ms: DEFAULT_EQUIPMENT_SETTLE_MS,
            },
            loadsheet: LoadsheetSettings {
                base_url: crate::loadsheet::DEFAULT_LOADSHEET_URL.to_string(),
                min_interval_secs: DEFAULT_LOADSHEET_MIN_INTERVAL_SECS,
                max_retries: DEFAULT_LOADSHEET_MAX_RETRIES,
                timeout_secs: DEFAULT_LOADSHEET_TIMEOUT_SECS,
                probe_health: true,
            },
            flightplan: FlightPlanSettings {
                simbrief_user_id: None,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
