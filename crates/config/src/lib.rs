//! User preferences: where the shared drop location and local working
//! copies live, who the user is, and which collaborator hooks to use.
//!
//! Config files: `realay.toml`, `realay.yaml`, or `realay.json`.
//! Searched in `./` then `~/.config/realay/`, falling back to a legacy
//! `~/.realayprefs` JSON file.

pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{HooksConfig, LocalizeMode, RealayConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
