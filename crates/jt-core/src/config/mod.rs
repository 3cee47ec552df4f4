//! Settings and network loading for jt-core.
//!
//! Paths are resolved by `jt_config::resolve_config` (CLI > env > config dir > user
//! dir > system > defaults). Settings fall back to built-in defaults; a network
//! file is required. Both files are hashed into a [`ConfigSnapshot`].

pub use jt_config::{
    ConfigPaths, ConfigSnapshot, ConfigSource, DocumentFormat, Network, Settings, ValidationError,
};

use jt_config::{resolve_config, validate_network, validate_probabilities, validate_settings};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{ErrorCategory, ErrorReport};
use crate::logging::event_names;

/// Errors that can occur while loading settings or a network.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no network file given and none found (set JT_NETWORK or pass a path)")]
    MissingNetwork,

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("invalid network in {path}: {source}")]
    InvalidNetwork {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Whether the failure is in the network document itself.
    pub fn is_network_error(&self) -> bool {
        matches!(self, ConfigError::InvalidNetwork { .. })
    }

    /// Stable code: an invalid network reports its validation code, the
    /// rest use 40-49.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::MissingNetwork => 40,
            ConfigError::IoError { .. } => 41,
            ConfigError::InvalidSettings { .. } => 42,
            ConfigError::InvalidNetwork { source, .. } => source.code(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            category: if self.is_network_error() {
                ErrorCategory::Network
            } else {
                ErrorCategory::Config
            },
            message: self.to_string(),
            recoverable: true,
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit settings file.
    pub settings_path: Option<PathBuf>,
    /// Explicit network file.
    pub network_path: Option<PathBuf>,
    /// Also require every distribution to sum to 1, regardless of settings.
    pub strict_probabilities: bool,
}

/// Loaded inputs with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub settings: Settings,
    pub network: Network,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve and load settings only.
pub fn load_settings(options: &ConfigOptions) -> Result<(Settings, ConfigPaths, Option<String>), ConfigError> {
    let paths = resolve_config(options.settings_path.as_deref(), options.network_path.as_deref());
    let Some(path) = paths.settings.clone() else {
        debug!(target: event_names::CONFIG_DEFAULT_USED, "no settings file, using defaults");
        return Ok((Settings::default(), paths, None));
    };
    let raw = read(&path)?;
    let settings = Settings::from_str_format(&raw, DocumentFormat::from_path(&path))
        .and_then(|s| validate_settings(&s).map(|_| s))
        .map_err(|source| ConfigError::InvalidSettings {
            path: path.clone(),
            source,
        })?;
    info!(
        target: event_names::CONFIG_LOADED,
        path = %path.display(),
        source = %paths.settings_source,
        "settings loaded"
    );
    Ok((settings, paths, Some(raw)))
}

/// Load settings and the network, validating both.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let (settings, paths, settings_raw) = load_settings(options)?;
    let path = paths.network.clone().ok_or(ConfigError::MissingNetwork)?;
    let raw = read(&path)?;

    let strict = options.strict_probabilities || settings.validation.strict_probabilities;
    let network = parse_network(&raw, &path, strict, settings.validation.tolerance)?;

    let snapshot = ConfigSnapshot::new(
        &settings,
        Some(&network),
        &paths,
        settings_raw.as_deref(),
        Some(&raw),
    );
    info!(
        target: event_names::NETWORK_LOADED,
        path = %path.display(),
        variables = network.len(),
        config_id = snapshot.short_id(),
        "network loaded"
    );
    Ok(ResolvedConfig {
        settings,
        network,
        paths,
        snapshot,
    })
}

fn parse_network(raw: &str, path: &Path, strict: bool, tolerance: f64) -> Result<Network, ConfigError> {
    let invalid = |source: ValidationError| {
        tracing::warn!(
            target: event_names::NETWORK_INVALID,
            path = %path.display(),
            code = source.code(),
            "{}",
            source
        );
        ConfigError::InvalidNetwork {
            path: path.to_path_buf(),
            source,
        }
    };
    let network = Network::from_str_format(raw, DocumentFormat::from_path(path)).map_err(invalid)?;
    validate_network(&network).map_err(invalid)?;
    if strict {
        validate_probabilities(&network, tolerance).map_err(invalid)?;
    }
    Ok(network)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })
}
