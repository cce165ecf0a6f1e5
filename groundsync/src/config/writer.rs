//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let menu_file = config
        .ground_ops
        .menu_file
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();
    let simbrief_user_id = config
        .flightplan
        .simbrief_user_id
        .as_deref()
        .unwrap_or("");

    format!(
        r#"[connection]
; Simulator web API address (X-Plane 12: Settings > Network, default port 8086)
host = {}
port = {}
; Seconds to wait before retrying a failed connection (default: 5)
retry_delay_secs = {}
; Seconds to wait for the session to become ready after an aircraft loads (default: 120)
session_timeout_secs = {}
; Variable that only resolves once an aircraft is loaded
aircraft_probe = {}
; Variable that turns true once the session is running
session_ready = {}

[observer]
; How often subscribed variables are polled, in milliseconds (default: 100, minimum: 10)
poll_interval_ms = {}
; Service tick in milliseconds; drives refuel progress (default: 1000)
service_tick_ms = {}

[ground_ops]
; Prefix of the ground services add-on variables (default: FSDT_GSX_)
prefix = {}
; File the add-on writes its current menu text to
; If empty, <X-Plane 12>/Output/gsx/menu is used when the install can be detected
menu_file = {}
; Milliseconds to wait for the menu to report ready (default: 2000)
menu_ready_timeout_ms = {}
; Milliseconds to let an operator prompt settle before reading it (default: 1000)
operator_settle_ms = {}
; Extra milliseconds to wait after choosing an operator (default: 1500)
operator_extra_delay_ms = {}

[services]
; Open the cargo doors while cargo is loaded or unloaded
open_cargo_doors = {}
; Fuel added per service tick while the fuel hose is connected (default: 28)
refuel_rate = {}
; Unit of the aircraft fuel quantity: kg or lb
fuel_unit = {}
; Automatic service calls through the add-on menu (all off by default)
auto_refuel = {}
call_catering = {}
auto_boarding = {}
auto_deboarding = {}
; Connect chocks, GPU, PCA, jetway and stairs on arrival, remove them after boarding
auto_ground_equipment = {}
; Milliseconds between ground equipment actions (default: 1500)
equipment_settle_ms = {}

[loadsheet]
; Base URL of the aircraft's loadsheet server
base_url = {}
; Minimum seconds between two requests of the same loadsheet (default: 30)
min_interval_secs = {}
; Total requests per loadsheet before giving up (default: 3)
max_retries = {}
; Request timeout in seconds, capped at 30 (default: 10)
timeout_secs = {}
; Check the server's health endpoint before requesting
probe_health = {}

[flightplan]
; SimBrief pilot id used to fetch the latest flight plan
; If empty, no flight plan is fetched and passengers/fuel default to zero
simbrief_user_id = {}

[logging]
; Log file location
file = {}
"#,
        config.connection.host,
        config.connection.port,
        config.connection.retry_delay_secs,
        config.connection.session_timeout_secs,
        config.connection.aircraft_probe,
        config.connection.session_ready,
        config.observer.poll_interval_ms,
        config.observer.service_tick_ms,
        config.ground_ops.prefix,
        menu_file,
        config.ground_ops.menu_ready_timeout_ms,
        config.ground_ops.operator_settle_ms,
        config.ground_ops.operator_extra_delay_ms,
        config.services.open_cargo_doors,
        config.services.refuel_rate,
        config.services.fuel_unit,
        config.services.auto_refuel,
        config.services.call_catering,
        config.services.auto_boarding,
        config.services.auto_deboarding,
        config.services.auto_ground_equipment,
        config.services.equipment_settle_ms,
        config.loadsheet.base_url,
        config.loadsheet.min_interval_secs,
        config.loadsheet.max_retries,
        config.loadsheet.timeout_secs,
        config.loadsheet.probe_health,
        simbrief_user_id,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
pub(super) fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
