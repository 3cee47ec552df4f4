//! Network definitions and engine settings.
//!
//! This crate provides:
//! - Typed Rust structs for Bayesian network files (JSON, YAML, TOML)
//! - Structural and opt-in probability validation
//! - Settings resolution (CLI → env → XDG → defaults)
//! - Config snapshots for reproducible runs

pub mod network;
pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use network::{Cpt, CptRow, DocumentFormat, Network, NetworkSummary, Node};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use settings::{Settings, TraversalMode};
pub use snapshot::ConfigSnapshot;
pub use validate::{
    validate_cpt, validate_network, validate_probabilities, validate_settings, ValidationError,
    ValidationResult,
};

/// Schema version for settings files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// JSON Schema of the network file format.
pub fn network_schema() -> schemars::Schema {
    schemars::schema_for!(Network)
}
