//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::defaults::MIN_POLL_INTERVAL_MS;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::flightplan::FuelUnit;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [connection] section
    if let Some(section) = ini.section(Some("connection")) {
        let s = Section::new("connection", section);
        if let Some(v) = s.string("host") {
            config.connection.host = v;
        }
        if let Some(v) = s.number("port", "must be a port number (1-65535)")? {
            if v == 0 {
                return Err(s.invalid("port", "0", "must be a port number (1-65535)"));
            }
            config.connection.port = v;
        }
        if let Some(v) = s.number("retry_delay_secs", "must be a positive integer (seconds)")? {
            config.connection.retry_delay_secs = v;
        }
        if let Some(v) = s.number("session_timeout_secs", "must be a positive integer (seconds)")? {
            config.connection.session_timeout_secs = v;
        }
        if let Some(v) = s.string("aircraft_probe") {
            config.connection.aircraft_probe = v;
        }
        if let Some(v) = s.string("session_ready") {
            config.connection.session_ready = v;
        }
    }

    // [observer] section
    if let Some(section) = ini.section(Some("observer")) {
        let s = Section::new("observer", section);
        if let Some(v) = s.number::<u64>("poll_interval_ms", "must be a positive integer (ms)")? {
            if v < MIN_POLL_INTERVAL_MS {
                tracing::warn!(
                    requested = v,
                    min = MIN_POLL_INTERVAL_MS,
                    "poll_interval_ms below minimum, clamping"
                );
            }
            config.observer.poll_interval_ms = v.max(MIN_POLL_INTERVAL_MS);
        }
        if let Some(v) = s.number::<u64>("service_tick_ms", "must be a positive integer (ms)")? {
            if v == 0 {
                return Err(s.invalid("service_tick_ms", "0", "must be greater than zero"));
            }
            config.observer.service_tick_ms = v;
        }
    }

    // [ground_ops] section
    if let Some(section) = ini.section(Some("ground_ops")) {
        let s = Section::new("ground_ops", section);
        if let Some(v) = s.string("prefix") {
            config.ground_ops.prefix = v;
        }
        if let Some(v) = s.string("menu_file") {
            config.ground_ops.menu_file = Some(expand_tilde(&v));
        }
        if let Some(v) = s.number("menu_ready_timeout_ms", "must be a positive integer (ms)")? {
            config.ground_ops.menu_ready_timeout_ms = v;
        }
        if let Some(v) = s.number("operator_settle_ms", "must be a positive integer (ms)")? {
            config.ground_ops.operator_settle_ms = v;
        }
        if let Some(v) = s.number("operator_extra_delay_ms", "must be a positive integer (ms)")? {
            config.ground_ops.operator_extra_delay_ms = v;
        }
    }

    // [services] section
    if let Some(section) = ini.section(Some("services")) {
        let s = Section::new("services", section);
        if let Some(v) = s.boolean("open_cargo_doors")? {
            config.services.open_cargo_doors = v;
        }
        if let Some(v) = s.number::<f64>("refuel_rate", "must be a positive number")? {
            if !(v > 0.0 && v.is_finite()) {
                return Err(s.invalid("refuel_rate", &v.to_string(), "must be a positive number"));
            }
            config.services.refuel_rate = v;
        }
        if let Some(v) = s.get("fuel_unit") {
            config.services.fuel_unit = v
                .parse::<FuelUnit>()
                .map_err(|_| s.invalid("fuel_unit", v, "must be 'kg' or 'lb'"))?;
        }
        if let Some(v) = s.boolean("auto_refuel")? {
            config.services.auto_refuel = v;
        }
        if let Some(v) = s.boolean("call_catering")? {
            config.services.call_catering = v;
        }
        if let Some(v) = s.boolean("auto_boarding")? {
            config.services.auto_boarding = v;
        }
        if let Some(v) = s.boolean("auto_deboarding")? {
            config.services.auto_deboarding = v;
        }
        if let Some(v) = s.boolean("auto_ground_equipment")? {
            config.services.auto_ground_equipment = v;
        }
        if let Some(v) = s.number("equipment_settle_ms", "must be a positive integer (ms)")? {
            config.services.equipment_settle_ms = v;
        }
    }

    // [loadsheet] section
    if let Some(section) = ini.section(Some("loadsheet")) {
        let s = Section::new("loadsheet", section);
        if let Some(v) = s.string("base_url") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(s.invalid(
                    "base_url",
                    &v,
                    "must be a URL starting with 'http://' or 'https://'",
                ));
            }
            config.loadsheet.base_url = v;
        }
        if let Some(v) = s.number("min_interval_secs", "must be a positive integer (seconds)")? {
            config.loadsheet.min_interval_secs = v;
        }
        if let Some(v) = s.number::<u32>("max_retries", "must be a positive integer")? {
            if v == 0 {
                return Err(s.invalid("max_retries", "0", "must be at least 1"));
            }
            config.loadsheet.max_retries = v;
        }
        if let Some(v) = s.number::<u64>("timeout_secs", "must be a positive integer (seconds)")? {
            if v == 0 {
                return Err(s.invalid("timeout_secs", "0", "must be greater than zero"));
            }
            config.loadsheet.timeout_secs = v;
        }
        if let Some(v) = s.boolean("probe_health")? {
            config.loadsheet.probe_health = v;
        }
    }

    // [flightplan] section
    if let Some(section) = ini.section(Some("flightplan")) {
        let s = Section::new("flightplan", section);
        if let Some(v) = s.string("simbrief_user_id") {
            config.flightplan.simbrief_user_id = Some(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let s = Section::new("logging", section);
        if let Some(v) = s.string("file") {
            config.logging.file = expand_tilde(&v);
        }
    }

    Ok(config)
}

/// One INI section with typed accessors. Empty values count as unset.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.props.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    fn number<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError> {
        self.get(key)
            .map(|v| v.parse::<T>().map_err(|_| self.invalid(key, v, reason)))
            .transpose()
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigFileError> {
        self.get(key)
            .map(|v| {
                parse_bool(v)
                    .ok_or_else(|| self.invalid(key, v, "must be true/false, yes/no, 1/0, or on/off"))
            })
            .transpose()
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
