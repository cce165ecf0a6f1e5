//! User configuration (`~/.groundsync/config.ini`).
//!
//! Settings structs live in [`settings`], constants and `Default` in
//! [`defaults`], INI parsing in `parser`, the commented writer in `writer`,
//! and key-by-key access for the CLI in [`keys`].

mod defaults;
mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::*;
