//! Loadsheet commands - call the aircraft's loadsheet server without a session.

use std::time::Duration;

use clap::Subcommand;
use groundsync::config::ConfigFile;
use groundsync::events::EventBus;
use groundsync::loadsheet::{
    HttpLoadsheetClient, LoadsheetConfig, LoadsheetCoordinator, LoadsheetKind, LoadsheetOutcome,
};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Loadsheet subcommands.
#[derive(Debug, Subcommand)]
pub enum LoadsheetCommands {
    /// Generate a loadsheet now
    Generate {
        /// Loadsheet type: preliminary or final
        kind: LoadsheetKind,
    },

    /// Check that the loadsheet server answers
    Health,

    /// Ask the server to resend the last loadsheet
    Resend,

    /// Delete stored loadsheets on the server
    Clear,
}

/// Run a loadsheet subcommand.
pub fn run(command: LoadsheetCommands) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("loadsheet");

    let coordinator = build_coordinator(runner.config())?;
    runner.block_on(execute(&coordinator, command))?
}

fn build_coordinator(
    config: &ConfigFile,
) -> Result<LoadsheetCoordinator<HttpLoadsheetClient>, CliError> {
    let transport = HttpLoadsheetClient::new(
        &config.loadsheet.base_url,
        Duration::from_secs(config.loadsheet.timeout_secs),
    )
    .map_err(|e| CliError::Loadsheet(e.to_string()))?;

    Ok(LoadsheetCoordinator::new(
        transport,
        LoadsheetConfig {
            min_interval: Duration::from_secs(config.loadsheet.min_interval_secs),
            max_retries: config.loadsheet.max_retries,
            probe_health: config.loadsheet.probe_health,
            ..LoadsheetConfig::default()
        },
        EventBus::new(),
    ))
}

async fn execute(
    coordinator: &LoadsheetCoordinator<HttpLoadsheetClient>,
    command: LoadsheetCommands,
) -> Result<(), CliError> {
    let failed = |e: groundsync::loadsheet::LoadsheetError| CliError::Loadsheet(e.to_string());

    match command {
        LoadsheetCommands::Generate { kind } => {
            println!("Generating {} loadsheet...", kind);
            match coordinator.generate(kind).await.map_err(failed)? {
                LoadsheetOutcome::Success { body } => {
                    println!("{} loadsheet generated.", kind);
                    print_body(&body);
                    Ok(())
                }
                LoadsheetOutcome::Failed {
                    status, message, ..
                } => Err(CliError::Loadsheet(match status {
                    Some(status) => format!("{} (status {})", message, status),
                    None => message,
                })),
            }
        }
        LoadsheetCommands::Health => {
            coordinator.health().await.map_err(failed)?;
            println!("Loadsheet server is healthy.");
            Ok(())
        }
        LoadsheetCommands::Resend => {
            let body = coordinator.resend().await.map_err(failed)?;
            println!("Last loadsheet resent.");
            print_body(&body);
            Ok(())
        }
        LoadsheetCommands::Clear => {
            let body = coordinator.clear().await.map_err(failed)?;
            println!("Stored loadsheets cleared.");
            print_body(&body);
            Ok(())
        }
    }
}

fn print_body(body: &str) {
    let body = body.trim();
    if !body.is_empty() {
        println!("  {}", body);
    }
}
