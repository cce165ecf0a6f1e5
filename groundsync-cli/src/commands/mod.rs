//! CLI command implementations.
//!
//! - [`config`] - Configuration management (path, list, init, get, set)
//! - [`loadsheet`] - Direct loadsheet server calls
//! - [`run`] - Main command (connect and synchronize)

pub mod config;
pub mod loadsheet;
pub mod run;
