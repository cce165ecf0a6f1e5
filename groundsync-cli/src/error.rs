//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use groundsync::config::ConfigFileError;
use groundsync::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Runtime or context construction failed
    Service(ServiceError),
    /// Loadsheet command failed
    Loadsheet(String),
    /// Failed to start the async runtime
    Runtime(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Service(ServiceError::SimulatorNotRunning) => {
                eprintln!();
                eprintln!("GroundSync could not reach X-Plane. Make sure:");
                eprintln!("  1. X-Plane 12 is running with an aircraft loaded");
                eprintln!("  2. The web API is enabled (Settings > Network)");
                eprintln!("  3. connection.host and connection.port match the simulator");
            }
            CliError::Loadsheet(_) => {
                eprintln!();
                eprintln!("Check that the aircraft is loaded and loadsheet.base_url is correct.");
                eprintln!("Use 'groundsync config get loadsheet.base_url' to see the current value.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Service(e) => write!(f, "{}", e),
            CliError::Loadsheet(msg) => write!(f, "Loadsheet error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Service(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
