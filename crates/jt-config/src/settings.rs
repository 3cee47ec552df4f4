//! Engine settings (`settings.json`).
//!
//! Every section is optional in the file; missing sections take defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::network::{parse_document, DocumentFormat};
use crate::validate::{ValidationError, ValidationResult};

/// Largest accepted output precision (decimal places).
pub const MAX_PRECISION: u32 = 15;

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub schema_version: String,
    pub propagation: PropagationSettings,
    pub output: OutputSettings,
    pub validation: ValidationSettings,
}

/// How evidence is pushed through the junction forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PropagationSettings {
    pub traversal: TraversalMode,
    /// Strip already-simplicial nodes before greedy elimination.
    pub strip_simplicial: bool,
}

/// Tree traversal used by collect/distribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    #[default]
    Recursive,
    /// Explicit stack; safe on very deep trees.
    Iterative,
}

impl std::fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalMode::Recursive => write!(f, "recursive"),
            TraversalMode::Iterative => write!(f, "iterative"),
        }
    }
}

impl std::str::FromStr for TraversalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recursive" => Ok(TraversalMode::Recursive),
            "iterative" | "stack" => Ok(TraversalMode::Iterative),
            _ => Err(format!("unknown traversal mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputSettings {
    /// Decimal places for reported marginals; `None` reports raw values.
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValidationSettings {
    /// Reject networks whose distributions do not sum to 1.
    pub strict_probabilities: bool,
    pub tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            propagation: PropagationSettings::default(),
            output: OutputSettings::default(),
            validation: ValidationSettings::default(),
        }
    }
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            traversal: TraversalMode::Recursive,
            strip_simplicial: true,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            strict_probabilities: false,
            tolerance: 1e-6,
        }
    }
}

impl Settings {
    /// Load settings from a file; the format follows the file extension.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str_format(&content, DocumentFormat::from_path(path))
    }

    /// Parse settings from a JSON string.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        parse_document(json, DocumentFormat::Json)
    }

    pub fn from_str_format(content: &str, format: DocumentFormat) -> ValidationResult<Self> {
        parse_document(content, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let s = Settings::from_json("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.propagation.strip_simplicial);
        assert_eq!(s.propagation.traversal, TraversalMode::Recursive);
    }

    #[test]
    fn test_partial_sections() {
        let s = Settings::from_json(
            r#"{"propagation": {"traversal": "iterative"}, "output": {"precision": 4}}"#,
        )
        .unwrap();
        assert_eq!(s.propagation.traversal, TraversalMode::Iterative);
        assert!(s.propagation.strip_simplicial);
        assert_eq!(s.output.precision, Some(4));
        assert_eq!(s.validation.tolerance, 1e-6);
    }

    #[test]
    fn test_traversal_parse_display() {
        assert_eq!("STACK".parse::<TraversalMode>().unwrap(), TraversalMode::Iterative);
        assert_eq!(TraversalMode::Recursive.to_string(), "recursive");
        assert!("sideways".parse::<TraversalMode>().is_err());
    }

    #[test]
    fn test_unknown_traversal_rejected() {
        let err = Settings::from_json(r#"{"propagation": {"traversal": "bfs"}}"#).unwrap_err();
        assert_eq!(err.code(), 61);
    }
}
