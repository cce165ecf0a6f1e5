//! GroundSync CLI - Command-line interface
//!
//! Runs the synchronizer against a local X-Plane session and exposes the
//! configuration and loadsheet helpers.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::loadsheet::LoadsheetCommands;

#[derive(Parser)]
#[command(name = "groundsync")]
#[command(version = groundsync::VERSION)]
#[command(about = "Keep X-Plane and GSX-style ground services in sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the simulator and synchronize until Ctrl-C
    Run {
        /// Log at debug level regardless of RUST_LOG
        #[arg(long)]
        debug: bool,
    },

    /// Inspect or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Talk to the aircraft's loadsheet server directly
    #[command(subcommand)]
    Loadsheet(LoadsheetCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { debug } => commands::run::run(debug),
        Commands::Config(command) => commands::config::run(command),
        Commands::Loadsheet(command) => commands::loadsheet::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
