//! Configuration snapshots for reproducible runs.
//!
//! A snapshot records which settings and network a run used, with content
//! hashes, so two reports can be checked for identical inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::network::{Network, NetworkSummary};
use crate::resolve::{ConfigPaths, ConfigSource};
use crate::settings::Settings;

/// A frozen snapshot of the inputs of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// SHA-256 of the settings file content.
    #[serde(default)]
    pub settings_hash: Option<String>,

    #[serde(default)]
    pub settings_path: Option<String>,

    pub settings_source: String,

    /// SHA-256 of the network file content.
    #[serde(default)]
    pub network_hash: Option<String>,

    #[serde(default)]
    pub network_path: Option<String>,

    pub network_source: String,

    /// Hash over both inputs (for quick comparison).
    pub combined_hash: String,

    pub summary: SnapshotSummary,
}

/// Key values for quick reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub traversal: String,
    pub strip_simplicial: bool,
    pub strict_probabilities: bool,
    #[serde(default)]
    pub network: Option<NetworkSummary>,
}

impl ConfigSnapshot {
    /// Create a snapshot from loaded inputs and their raw file contents.
    pub fn new(
        settings: &Settings,
        network: Option<&Network>,
        paths: &ConfigPaths,
        settings_raw: Option<&str>,
        network_raw: Option<&str>,
    ) -> Self {
        let settings_hash = settings_raw.map(hash_content);
        let network_hash = network_raw.map(hash_content);
        let combined_hash = hash_content(&format!(
            "{}:{}",
            settings_hash.as_deref().unwrap_or("none"),
            network_hash.as_deref().unwrap_or("none")
        ));

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            settings_hash,
            settings_path: paths.settings.as_ref().map(|p| p.display().to_string()),
            settings_source: paths.settings_source.to_string(),
            network_hash,
            network_path: paths.network.as_ref().map(|p| p.display().to_string()),
            network_source: paths.network_source.to_string(),
            combined_hash,
            summary: SnapshotSummary::new(settings, network),
        }
    }

    /// Snapshot with default settings and no network.
    pub fn defaults_only() -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            settings_hash: None,
            settings_path: None,
            settings_source: ConfigSource::Default.to_string(),
            network_hash: None,
            network_path: None,
            network_source: ConfigSource::Default.to_string(),
            combined_hash: hash_content("none:none"),
            summary: SnapshotSummary::new(&Settings::default(), None),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same inputs as `other`.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// First 12 hex chars of the combined hash.
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

impl SnapshotSummary {
    fn new(settings: &Settings, network: Option<&Network>) -> Self {
        Self {
            traversal: settings.propagation.traversal.to_string(),
            strip_simplicial: settings.propagation.strip_simplicial,
            strict_probabilities: settings.validation.strict_probabilities,
            network: network.map(Network::summary),
        }
    }
}

/// Hex SHA-256 of `content`.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
