//! Locating the settings and network documents.
//!
//! Each document is looked up independently:
//! 1. explicit CLI path (returned even when missing, so the read error surfaces)
//! 2. its environment variable (`JT_SETTINGS`, `JT_NETWORK`)
//! 3. `$JT_CONFIG_DIR/<stem>.<ext>`
//! 4. `<user config dir>/jtree/<stem>.<ext>`
//! 5. `/etc/jtree/<stem>.<ext>`
//!
//! `<ext>` is tried as json, yaml, yml, toml in that order.

use std::path::{Path, PathBuf};

pub const ENV_SETTINGS_PATH: &str = "JT_SETTINGS";
pub const ENV_NETWORK_PATH: &str = "JT_NETWORK";
pub const ENV_CONFIG_DIR: &str = "JT_CONFIG_DIR";

const APP_NAME: &str = "jtree";
const EXTENSIONS: [&str; 4] = ["json", "yaml", "yml", "toml"];

/// Where a document came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    /// Path named by the document's own environment variable.
    EnvVar,
    /// Found under `JT_CONFIG_DIR`.
    ConfigDir,
    UserConfig,
    SystemConfig,
    /// Nothing found.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConfigSource::Cli => "cli",
            ConfigSource::EnvVar => "env",
            ConfigSource::ConfigDir => "config-dir",
            ConfigSource::UserConfig => "user-config",
            ConfigSource::SystemConfig => "system-config",
            ConfigSource::Default => "default",
        };
        f.write_str(label)
    }
}

/// Resolved document paths with their provenance.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `None` means built-in settings.
    pub settings: Option<PathBuf>,
    /// `None` means no network was found; callers decide whether that is fatal.
    pub network: Option<PathBuf>,
    pub settings_source: ConfigSource,
    pub network_source: ConfigSource,
}

#[derive(Debug, Clone, Copy)]
struct DocumentKind {
    env: &'static str,
    stem: &'static str,
}

const SETTINGS: DocumentKind = DocumentKind {
    env: ENV_SETTINGS_PATH,
    stem: "settings",
};

const NETWORK: DocumentKind = DocumentKind {
    env: ENV_NETWORK_PATH,
    stem: "network",
};

pub fn resolve_config(cli_settings: Option<&Path>, cli_network: Option<&Path>) -> ConfigPaths {
    let dirs = search_dirs();
    let (settings, settings_source) = locate(SETTINGS, cli_settings, &dirs);
    let (network, network_source) = locate(NETWORK, cli_network, &dirs);
    ConfigPaths {
        settings,
        network,
        settings_source,
        network_source,
    }
}

fn locate(
    kind: DocumentKind,
    cli: Option<&Path>,
    dirs: &[(ConfigSource, PathBuf)],
) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli {
        return (Some(path.to_path_buf()), ConfigSource::Cli);
    }
    if let Some(path) = std::env::var_os(kind.env)
        .map(PathBuf::from)
        .filter(|p| p.is_file())
    {
        return (Some(path), ConfigSource::EnvVar);
    }
    dirs.iter()
        .find_map(|(source, dir)| find_document(dir, kind.stem).map(|p| (Some(p), *source)))
        .unwrap_or((None, ConfigSource::Default))
}

/// Directories searched after the CLI and environment paths, in order.
fn search_dirs() -> Vec<(ConfigSource, PathBuf)> {
    let mut dirs = Vec::with_capacity(3);
    if let Some(dir) = std::env::var_os(ENV_CONFIG_DIR) {
        dirs.push((ConfigSource::ConfigDir, PathBuf::from(dir)));
    }
    if let Some(dir) = user_config_dir() {
        dirs.push((ConfigSource::UserConfig, dir));
    }
    dirs.push((ConfigSource::SystemConfig, system_config_dir()));
    dirs
}

/// First existing `<stem>.<ext>` in `dir`.
pub fn find_document(dir: &Path, stem: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

/// `~/.config/jtree` on Linux; platform equivalent elsewhere.
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME))
}

pub fn system_config_dir() -> PathBuf {
    Path::new("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_labels() {
        let labels: Vec<String> = [
            ConfigSource::Cli,
            ConfigSource::EnvVar,
            ConfigSource::ConfigDir,
            ConfigSource::UserConfig,
            ConfigSource::SystemConfig,
            ConfigSource::Default,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            labels,
            ["cli", "env", "config-dir", "user-config", "system-config", "default"]
        );
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let missing = Path::new("/definitely/not/here/net.json");
        let paths = resolve_config(None, Some(missing));
        assert_eq!(paths.network.as_deref(), Some(missing));
        assert_eq!(paths.network_source, ConfigSource::Cli);
    }

    #[test]
    fn test_find_document_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_document(dir.path(), "network").is_none());
        std::fs::write(dir.path().join("network.toml"), "").unwrap();
        std::fs::write(dir.path().join("network.yaml"), "").unwrap();
        assert_eq!(
            find_document(dir.path(), "network").unwrap(),
            dir.path().join("network.yaml")
        );
        std::fs::write(dir.path().join("network.json"), "{}").unwrap();
        assert_eq!(
            find_document(dir.path(), "network").unwrap(),
            dir.path().join("network.json")
        );
    }

    #[test]
    fn test_system_dir_is_last() {
        let dirs = search_dirs();
        assert_eq!(
            dirs.last(),
            Some(&(ConfigSource::SystemConfig, PathBuf::from("/etc/jtree")))
        );
    }
}
