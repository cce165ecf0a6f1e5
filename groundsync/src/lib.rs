//! GroundSync - keeps a simulated aircraft and a ground-services add-on on one
//! turnaround timeline.
//!
//! The library polls named variables on both sides, derives service and
//! flight-phase state from them, and writes the matching doors, fuel,
//! passengers and seats back to the aircraft.
//!
//! # High-Level API
//!
//! ```ignore
//! use groundsync::config::ConfigFile;
//! use groundsync::service::{GroundSyncRuntime, XPlaneContext};
//! use tokio_util::sync::CancellationToken;
//!
//! let context = XPlaneContext::from_config(&ConfigFile::load()?)?;
//! GroundSyncRuntime::new(context).run(CancellationToken::new()).await?;
//! ```
//!
//! # Layers
//!
//! - [`variables`]: backend abstraction and the polling observer
//! - [`ground_ops`], [`aircraft`]: the two backends' names, menu and actuators
//! - [`flight`], [`services`]: flight phase and per-service state machines
//! - [`connection`], [`loadsheet`], [`flightplan`]: external links
//! - [`xplane`]: the simulator web API backend
//! - [`service`]: runtime wiring

pub mod aircraft;
pub mod config;
pub mod connection;
pub mod events;
pub mod flight;
pub mod flightplan;
pub mod ground_ops;
pub mod loadsheet;
pub mod logging;
pub mod service;
pub mod services;
pub mod variables;
pub mod xplane;

/// Version of the GroundSync library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
