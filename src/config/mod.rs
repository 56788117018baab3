// src/config/mod.rs

//! Graph files for the `dagrun` binary.
//!
//! - [`model`]: the TOML-backed data model.
//! - [`loader`]: reading a file from disk.
//! - [`validate`]: dependency and acyclicity checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, DefaultSection, RawConfigFile, TaskConfig};
