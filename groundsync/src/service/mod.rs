//! Runtime wiring.
//!
//! [`AppContext`] holds every long-lived component built from configuration;
//! [`GroundSyncRuntime`] connects to the simulator and runs service sessions
//! on top of it until cancelled.
//!
//! ```ignore
//! use groundsync::config::ConfigFile;
//! use groundsync::service::{GroundSyncRuntime, XPlaneContext};
//!
//! let context = XPlaneContext::from_config(&ConfigFile::load()?)?;
//! let runtime = GroundSyncRuntime::new(context);
//! runtime.run(cancel).await?;
//! ```

mod context;
mod error;
mod runtime;

pub use context::{AppContext, RuntimeSettings, XPlaneContext, DEFAULT_HEALTH_INTERVAL};
pub use error::ServiceError;
pub use runtime::GroundSyncRuntime;
