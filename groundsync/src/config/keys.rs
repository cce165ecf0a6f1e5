//! Configuration key access and validation.
//!
//! Type-safe access to single configuration values by `section.key` name,
//! used by `config get`, `config set` and `config list`.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use super::parser::{expand_tilde, parse_bool};
use super::settings::ConfigFile;
use super::writer::path_to_string;
use crate::flightplan::FuelUnit;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ConnectionHost,
    ConnectionPort,
    ConnectionRetryDelaySecs,
    ConnectionSessionTimeoutSecs,
    ConnectionAircraftProbe,
    ConnectionSessionReady,

    ObserverPollIntervalMs,
    ObserverServiceTickMs,

    GroundOpsPrefix,
    GroundOpsMenuFile,
    GroundOpsMenuReadyTimeoutMs,
    GroundOpsOperatorSettleMs,
    GroundOpsOperatorExtraDelayMs,

    ServicesOpenCargoDoors,
    ServicesRefuelRate,
    ServicesFuelUnit,
    ServicesAutoRefuel,
    ServicesCallCatering,
    ServicesAutoBoarding,
    ServicesAutoDeboarding,
    ServicesAutoGroundEquipment,
    ServicesEquipmentSettleMs,

    LoadsheetBaseUrl,
    LoadsheetMinIntervalSecs,
    LoadsheetMaxRetries,
    LoadsheetTimeoutSecs,
    LoadsheetProbeHealth,

    FlightplanSimbriefUserId,

    LoggingFile,
}

/// Value rule of a key.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Text,
    OptionalText,
    Port,
    PositiveInteger,
    Integer { min: u64 },
    PositiveNumber,
    Boolean,
    FuelUnit,
    Url,
    Path,
    OptionalPath,
}

impl Rule {
    fn check(self, value: &str) -> Result<(), String> {
        let v = value.trim();
        match self {
            Rule::Text | Rule::Path => {
                if v.is_empty() {
                    Err("must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            Rule::OptionalText | Rule::OptionalPath => Ok(()),
            Rule::Port => match v.parse::<u16>() {
                Ok(p) if p > 0 => Ok(()),
                _ => Err("must be a port number (1-65535)".to_string()),
            },
            Rule::PositiveInteger => match v.parse::<u64>() {
                Ok(n) if n > 0 => Ok(()),
                _ => Err("must be a positive integer".to_string()),
            },
            Rule::Integer { min } => match v.parse::<u64>() {
                Ok(n) if n >= min => Ok(()),
                _ => Err(format!("must be an integer of at least {}", min)),
            },
            Rule::PositiveNumber => match v.parse::<f64>() {
                Ok(n) if n > 0.0 && n.is_finite() => Ok(()),
                _ => Err("must be a positive number".to_string()),
            },
            Rule::Boolean => parse_bool(v)
                .map(|_| ())
                .ok_or_else(|| "must be true/false, yes/no, 1/0, or on/off".to_string()),
            Rule::FuelUnit => v.parse::<FuelUnit>().map(|_| ()),
            Rule::Url => {
                if v.starts_with("http://") || v.starts_with("https://") {
                    Ok(())
                } else {
                    Err("must be a URL starting with 'http://' or 'https://'".to_string())
                }
            }
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == lower)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the canonical key name (e.g., "loadsheet.base_url").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ConnectionHost => "connection.host",
            ConfigKey::ConnectionPort => "connection.port",
            ConfigKey::ConnectionRetryDelaySecs => "connection.retry_delay_secs",
            ConfigKey::ConnectionSessionTimeoutSecs => "connection.session_timeout_secs",
            ConfigKey::ConnectionAircraftProbe => "connection.aircraft_probe",
            ConfigKey::ConnectionSessionReady => "connection.session_ready",
            ConfigKey::ObserverPollIntervalMs => "observer.poll_interval_ms",
            ConfigKey::ObserverServiceTickMs => "observer.service_tick_ms",
            ConfigKey::GroundOpsPrefix => "ground_ops.prefix",
            ConfigKey::GroundOpsMenuFile => "ground_ops.menu_file",
            ConfigKey::GroundOpsMenuReadyTimeoutMs => "ground_ops.menu_ready_timeout_ms",
            ConfigKey::GroundOpsOperatorSettleMs => "ground_ops.operator_settle_ms",
            ConfigKey::GroundOpsOperatorExtraDelayMs => "ground_ops.operator_extra_delay_ms",
            ConfigKey::ServicesOpenCargoDoors => "services.open_cargo_doors",
            ConfigKey::ServicesRefuelRate => "services.refuel_rate",
            ConfigKey::ServicesFuelUnit => "services.fuel_unit",
            ConfigKey::ServicesAutoRefuel => "services.auto_refuel",
            ConfigKey::ServicesCallCatering => "services.call_catering",
            ConfigKey::ServicesAutoBoarding => "services.auto_boarding",
            ConfigKey::ServicesAutoDeboarding => "services.auto_deboarding",
            ConfigKey::ServicesAutoGroundEquipment => "services.auto_ground_equipment",
            ConfigKey::ServicesEquipmentSettleMs => "services.equipment_settle_ms",
            ConfigKey::LoadsheetBaseUrl => "loadsheet.base_url",
            ConfigKey::LoadsheetMinIntervalSecs => "loadsheet.min_interval_secs",
            ConfigKey::LoadsheetMaxRetries => "loadsheet.max_retries",
            ConfigKey::LoadsheetTimeoutSecs => "loadsheet.timeout_secs",
            ConfigKey::LoadsheetProbeHealth => "loadsheet.probe_health",
            ConfigKey::FlightplanSimbriefUserId => "flightplan.simbrief_user_id",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Get the section name (e.g., "loadsheet").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "base_url").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    fn rule(&self) -> Rule {
        match self {
            ConfigKey::ConnectionHost
            | ConfigKey::ConnectionAircraftProbe
            | ConfigKey::ConnectionSessionReady
            | ConfigKey::GroundOpsPrefix => Rule::Text,
            ConfigKey::ConnectionPort => Rule::Port,
            ConfigKey::ConnectionRetryDelaySecs
            | ConfigKey::ConnectionSessionTimeoutSecs
            | ConfigKey::LoadsheetMaxRetries
            | ConfigKey::LoadsheetTimeoutSecs
            | ConfigKey::ObserverServiceTickMs => Rule::PositiveInteger,
            ConfigKey::ObserverPollIntervalMs => Rule::Integer {
                min: super::MIN_POLL_INTERVAL_MS,
            },
            ConfigKey::GroundOpsMenuReadyTimeoutMs
            | ConfigKey::GroundOpsOperatorSettleMs
            | ConfigKey::GroundOpsOperatorExtraDelayMs
            | ConfigKey::ServicesEquipmentSettleMs
            | ConfigKey::LoadsheetMinIntervalSecs => Rule::Integer { min: 0 },
            ConfigKey::GroundOpsMenuFile => Rule::OptionalPath,
            ConfigKey::ServicesRefuelRate => Rule::PositiveNumber,
            ConfigKey::ServicesFuelUnit => Rule::FuelUnit,
            ConfigKey::ServicesOpenCargoDoors
            | ConfigKey::ServicesAutoRefuel
            | ConfigKey::ServicesCallCatering
            | ConfigKey::ServicesAutoBoarding
            | ConfigKey::ServicesAutoDeboarding
            | ConfigKey::ServicesAutoGroundEquipment
            | ConfigKey::LoadsheetProbeHealth => Rule::Boolean,
            ConfigKey::LoadsheetBaseUrl => Rule::Url,
            ConfigKey::FlightplanSimbriefUserId => Rule::OptionalText,
            ConfigKey::LoggingFile => Rule::Path,
        }
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::ConnectionHost => config.connection.host.clone(),
            ConfigKey::ConnectionPort => config.connection.port.to_string(),
            ConfigKey::ConnectionRetryDelaySecs => config.connection.retry_delay_secs.to_string(),
            ConfigKey::ConnectionSessionTimeoutSecs => {
                config.connection.session_timeout_secs.to_string()
            }
            ConfigKey::ConnectionAircraftProbe => config.connection.aircraft_probe.clone(),
            ConfigKey::ConnectionSessionReady => config.connection.session_ready.clone(),
            ConfigKey::ObserverPollIntervalMs => config.observer.poll_interval_ms.to_string(),
            ConfigKey::ObserverServiceTickMs => config.observer.service_tick_ms.to_string(),
            ConfigKey::GroundOpsPrefix => config.ground_ops.prefix.clone(),
            ConfigKey::GroundOpsMenuFile => config
                .ground_ops
                .menu_file
                .as_ref()
                .map(|p| path_to_string(p))
                .unwrap_or_default(),
            ConfigKey::GroundOpsMenuReadyTimeoutMs => {
                config.ground_ops.menu_ready_timeout_ms.to_string()
            }
            ConfigKey::GroundOpsOperatorSettleMs => config.ground_ops.operator_settle_ms.to_string(),
            ConfigKey::GroundOpsOperatorExtraDelayMs => {
                config.ground_ops.operator_extra_delay_ms.to_string()
            }
            ConfigKey::ServicesOpenCargoDoors => config.services.open_cargo_doors.to_string(),
            ConfigKey::ServicesRefuelRate => config.services.refuel_rate.to_string(),
            ConfigKey::ServicesFuelUnit => config.services.fuel_unit.to_string(),
            ConfigKey::ServicesAutoRefuel => config.services.auto_refuel.to_string(),
            ConfigKey::ServicesCallCatering => config.services.call_catering.to_string(),
            ConfigKey::ServicesAutoBoarding => config.services.auto_boarding.to_string(),
            ConfigKey::ServicesAutoDeboarding => config.services.auto_deboarding.to_string(),
            ConfigKey::ServicesAutoGroundEquipment => {
                config.services.auto_ground_equipment.to_string()
            }
            ConfigKey::ServicesEquipmentSettleMs => {
                config.services.equipment_settle_ms.to_string()
            }
            ConfigKey::LoadsheetBaseUrl => config.loadsheet.base_url.clone(),
            ConfigKey::LoadsheetMinIntervalSecs => config.loadsheet.min_interval_secs.to_string(),
            ConfigKey::LoadsheetMaxRetries => config.loadsheet.max_retries.to_string(),
            ConfigKey::LoadsheetTimeoutSecs => config.loadsheet.timeout_secs.to_string(),
            ConfigKey::LoadsheetProbeHealth => config.loadsheet.probe_health.to_string(),
            ConfigKey::FlightplanSimbriefUserId => config
                .flightplan
                .simbrief_user_id
                .clone()
                .unwrap_or_default(),
            ConfigKey::LoggingFile => path_to_string(&config.logging.file),
        }
    }

    /// Validate a value according to this key's rule.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.rule()
            .check(value)
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    /// Set a value on a config file after validating it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        self.validate(value)?;
        let v = value.trim();
        let invalid = |reason: String| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason,
        };
        let int = || v.parse::<u64>().map_err(|e| invalid(e.to_string()));
        let flag = || parse_bool(v).unwrap_or(false);

        match self {
            ConfigKey::ConnectionHost => config.connection.host = v.to_string(),
            ConfigKey::ConnectionPort => {
                config.connection.port = v.parse().map_err(|_| invalid("bad port".into()))?
            }
            ConfigKey::ConnectionRetryDelaySecs => config.connection.retry_delay_secs = int()?,
            ConfigKey::ConnectionSessionTimeoutSecs => {
                config.connection.session_timeout_secs = int()?
            }
            ConfigKey::ConnectionAircraftProbe => config.connection.aircraft_probe = v.to_string(),
            ConfigKey::ConnectionSessionReady => config.connection.session_ready = v.to_string(),
            ConfigKey::ObserverPollIntervalMs => config.observer.poll_interval_ms = int()?,
            ConfigKey::ObserverServiceTickMs => config.observer.service_tick_ms = int()?,
            ConfigKey::GroundOpsPrefix => config.ground_ops.prefix = v.to_string(),
            ConfigKey::GroundOpsMenuFile => {
                config.ground_ops.menu_file = optional_path(v);
            }
            ConfigKey::GroundOpsMenuReadyTimeoutMs => {
                config.ground_ops.menu_ready_timeout_ms = int()?
            }
            ConfigKey::GroundOpsOperatorSettleMs => config.ground_ops.operator_settle_ms = int()?,
            ConfigKey::GroundOpsOperatorExtraDelayMs => {
                config.ground_ops.operator_extra_delay_ms = int()?
            }
            ConfigKey::ServicesOpenCargoDoors => config.services.open_cargo_doors = flag(),
            ConfigKey::ServicesRefuelRate => {
                config.services.refuel_rate = v.parse().map_err(|_| invalid("bad number".into()))?
            }
            ConfigKey::ServicesFuelUnit => config.services.fuel_unit = v.parse().map_err(invalid)?,
            ConfigKey::ServicesAutoRefuel => config.services.auto_refuel = flag(),
            ConfigKey::ServicesCallCatering => config.services.call_catering = flag(),
            ConfigKey::ServicesAutoBoarding => config.services.auto_boarding = flag(),
            ConfigKey::ServicesAutoDeboarding => config.services.auto_deboarding = flag(),
            ConfigKey::ServicesAutoGroundEquipment => {
                config.services.auto_ground_equipment = flag()
            }
            ConfigKey::ServicesEquipmentSettleMs => config.services.equipment_settle_ms = int()?,
            ConfigKey::LoadsheetBaseUrl => config.loadsheet.base_url = v.to_string(),
            ConfigKey::LoadsheetMinIntervalSecs => config.loadsheet.min_interval_secs = int()?,
            ConfigKey::LoadsheetMaxRetries => {
                config.loadsheet.max_retries =
                    v.parse().map_err(|_| invalid("bad integer".into()))?
            }
            ConfigKey::LoadsheetTimeoutSecs => config.loadsheet.timeout_secs = int()?,
            ConfigKey::LoadsheetProbeHealth => config.loadsheet.probe_health = flag(),
            ConfigKey::FlightplanSimbriefUserId => {
                config.flightplan.simbrief_user_id = (!v.is_empty()).then(|| v.to_string())
            }
            ConfigKey::LoggingFile => config.logging.file = expand_tilde(v),
        }
        Ok(())
    }

    /// Get all supported configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ConnectionHost,
            ConfigKey::ConnectionPort,
            ConfigKey::ConnectionRetryDelaySecs,
            ConfigKey::ConnectionSessionTimeoutSecs,
            ConfigKey::ConnectionAircraftProbe,
            ConfigKey::ConnectionSessionReady,
            ConfigKey::ObserverPollIntervalMs,
            ConfigKey::ObserverServiceTickMs,
            ConfigKey::GroundOpsPrefix,
            ConfigKey::GroundOpsMenuFile,
            ConfigKey::GroundOpsMenuReadyTimeoutMs,
            ConfigKey::GroundOpsOperatorSettleMs,
            ConfigKey::GroundOpsOperatorExtraDelayMs,
            ConfigKey::ServicesOpenCargoDoors,
            ConfigKey::ServicesRefuelRate,
            ConfigKey::ServicesFuelUnit,
            ConfigKey::ServicesAutoRefuel,
            ConfigKey::ServicesCallCatering,
            ConfigKey::ServicesAutoBoarding,
            ConfigKey::ServicesAutoDeboarding,
            ConfigKey::ServicesAutoGroundEquipment,
            ConfigKey::ServicesEquipmentSettleMs,
            ConfigKey::LoadsheetBaseUrl,
            ConfigKey::LoadsheetMinIntervalSecs,
            ConfigKey::LoadsheetMaxRetries,
            ConfigKey::LoadsheetTimeoutSecs,
            ConfigKey::LoadsheetProbeHealth,
            ConfigKey::FlightplanSimbriefUserId,
            ConfigKey::LoggingFile,
        ]
    }
}

/// Convert empty string to None, non-empty to Some path with tilde expansion.
fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(expand_tilde(value))
    }
}
