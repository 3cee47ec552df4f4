//! Bayesian network definition types.
//!
//! A network is a map from variable name to [`Node`]. The CPT shape is fixed
//! when the document is parsed: a state → probability map for parentless
//! nodes, a list of `{when, then}` rows otherwise.
//!
//! ```json
//! {
//!   "RAIN": { "states": ["T", "F"], "cpt": { "T": 0.2, "F": 0.8 } },
//!   "SPRINKLER": {
//!     "states": ["T", "F"],
//!     "parents": ["RAIN"],
//!     "cpt": [
//!       { "when": { "RAIN": "T" }, "then": { "T": 0.01, "F": 0.99 } },
//!       { "when": { "RAIN": "F" }, "then": { "T": 0.4, "F": 0.6 } }
//!     ]
//!   }
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// A discrete Bayesian network keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Network {
    nodes: BTreeMap<String, Node>,
}

/// One random variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    /// Identifier; filled from the map key when omitted.
    #[serde(default)]
    pub id: String,
    /// Ordered, distinct state names.
    pub states: Vec<String>,
    /// Parent variable names.
    #[serde(default)]
    pub parents: Vec<String>,
    pub cpt: Cpt,
}

/// Conditional probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cpt {
    /// One row per full assignment of the parents.
    Conditional(Vec<CptRow>),
    /// Prior over the states of a parentless node.
    Leaf(BTreeMap<String, f64>),
}

/// A row of a conditional CPT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CptRow {
    /// Parent → state.
    pub when: BTreeMap<String, String>,
    /// State → probability.
    pub then: BTreeMap<String, f64>,
}

/// Serialization formats accepted for network and settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Pick a format from a file extension; unknown extensions read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            Some("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Yaml => write!(f, "yaml"),
            DocumentFormat::Toml => write!(f, "toml"),
        }
    }
}

/// Deserialize a document in the given format.
pub(crate) fn parse_document<T>(content: &str, format: DocumentFormat) -> ValidationResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    match format {
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e))),
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid YAML: {}", e))),
        DocumentFormat::Toml => toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e))),
    }
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a network file; the format follows the file extension.
    ///
    /// Only parsing happens here. Call [`crate::validate::validate_network`]
    /// before compiling.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str_format(&content, DocumentFormat::from_path(path))
    }

    /// Parse a network from a JSON string.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        Self::from_str_format(json, DocumentFormat::Json)
    }

    /// Parse a network document and fill missing node ids from their keys.
    pub fn from_str_format(content: &str, format: DocumentFormat) -> ValidationResult<Self> {
        let mut network: Network = parse_document(content, format)?;
        network.fill_ids();
        Ok(network)
    }

    fn fill_ids(&mut self) {
        for (name, node) in &mut self.nodes {
            if node.id.is_empty() {
                node.id = name.clone();
            }
        }
    }

    /// Insert or replace a node. An empty id is set to `name`.
    pub fn insert(&mut self, name: impl Into<String>, mut node: Node) -> Option<Node> {
        let name = name.into();
        if node.id.is_empty() {
            node.id = name.clone();
        }
        self.nodes.insert(name, node)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Each variable with its parent list, for moralization.
    pub fn families(&self) -> impl Iterator<Item = (&str, &[String])> + Clone {
        self.nodes
            .iter()
            .map(|(k, v)| (k.as_str(), v.parents.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize back to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Counts used by snapshots and the `compile` report.
    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            variables: self.nodes.len(),
            arcs: self.nodes.values().map(|n| n.parents.len()).sum(),
            max_states: self.nodes.values().map(|n| n.states.len()).max().unwrap_or(0),
            max_parents: self.nodes.values().map(|n| n.parents.len()).max().unwrap_or(0),
            roots: self.nodes.values().filter(|n| n.parents.is_empty()).count(),
        }
    }
}

/// Shape counts of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkSummary {
    pub variables: usize,
    pub arcs: usize,
    pub max_states: usize,
    pub max_parents: usize,
    pub roots: usize,
}

impl Node {
    /// A parentless node with the given prior.
    pub fn leaf<S: Into<String>>(states: impl IntoIterator<Item = S>, probs: &[f64]) -> Self {
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        let cpt = states.iter().cloned().zip(probs.iter().copied()).collect();
        Self {
            id: String::new(),
            states,
            parents: Vec::new(),
            cpt: Cpt::Leaf(cpt),
        }
    }

    /// A node with parents. `rows` pairs each parent assignment (in
    /// `parents` order) with a distribution in `states` order.
    pub fn conditional<S, P>(
        states: impl IntoIterator<Item = S>,
        parents: impl IntoIterator<Item = P>,
        rows: &[(&[&str], &[f64])],
    ) -> Self
    where
        S: Into<String>,
        P: Into<String>,
    {
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        let parents: Vec<String> = parents.into_iter().map(Into::into).collect();
        let cpt_rows = rows
            .iter()
            .map(|(when, then)| CptRow {
                when: parents
                    .iter()
                    .cloned()
                    .zip(when.iter().map(|s| s.to_string()))
                    .collect(),
                then: states.iter().cloned().zip(then.iter().copied()).collect(),
            })
            .collect();
        Self {
            id: String::new(),
            states,
            parents,
            cpt: Cpt::Conditional(cpt_rows),
        }
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }
}

impl Cpt {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Cpt::Leaf(_))
    }

    /// Every state name the table assigns a probability to.
    pub fn declared_states(&self) -> BTreeSet<&str> {
        match self {
            Cpt::Leaf(probs) => probs.keys().map(String::as_str).collect(),
            Cpt::Conditional(rows) => rows
                .iter()
                .flat_map(|r| r.then.keys().map(String::as_str))
                .collect(),
        }
    }

    /// Every parent name the rows condition on (empty for leaf tables).
    pub fn referenced_parents(&self) -> BTreeSet<&str> {
        match self {
            Cpt::Leaf(_) => BTreeSet::new(),
            Cpt::Conditional(rows) => rows
                .iter()
                .flat_map(|r| r.when.keys().map(String::as_str))
                .collect(),
        }
    }

    /// Probability of `state` given a parent assignment.
    ///
    /// Leaf tables ignore `parents`. Conditional tables use the row whose
    /// `when` agrees with `parents` on every key it names.
    pub fn probability(&self, state: &str, parents: &BTreeMap<String, String>) -> Option<f64> {
        match self {
            Cpt::Leaf(probs) => probs.get(state).copied(),
            Cpt::Conditional(rows) => rows
                .iter()
                .find(|r| r.when.iter().all(|(p, s)| parents.get(p) == Some(s)))
                .and_then(|r| r.then.get(state).copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRINKLER: &str = r#"{
        "RAIN": { "states": ["T", "F"], "cpt": { "T": 0.2, "F": 0.8 } },
        "SPRINKLER": {
            "states": ["T", "F"],
            "parents": ["RAIN"],
            "cpt": [
                { "when": { "RAIN": "T" }, "then": { "T": 0.01, "F": 0.99 } },
                { "when": { "RAIN": "F" }, "then": { "T": 0.4, "F": 0.6 } }
            ]
        }
    }"#;

    #[test]
    fn test_parse_json_picks_cpt_variant() {
        let net = Network::from_json(SPRINKLER).unwrap();
        assert_eq!(net.len(), 2);
        assert!(net.get("RAIN").unwrap().cpt.is_leaf());
        assert!(!net.get("SPRINKLER").unwrap().cpt.is_leaf());
    }

    #[test]
    fn test_ids_filled_from_keys() {
        let net = Network::from_json(SPRINKLER).unwrap();
        assert_eq!(net.get("RAIN").unwrap().id, "RAIN");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
RAIN:
  states: [T, F]
  cpt: { T: 0.2, F: 0.8 }
"#;
        let net = Network::from_str_format(yaml, DocumentFormat::Yaml).unwrap();
        assert_eq!(net.get("RAIN").unwrap().states, vec!["T", "F"]);
    }

    #[test]
    fn test_parse_toml() {
        let doc = r#"
[RAIN]
states = ["T", "F"]
cpt = { T = 0.2, F = 0.8 }

[WET]
states = ["T", "F"]
parents = ["RAIN"]

[[WET.cpt]]
when = { RAIN = "T" }
then = { T = 0.9, F = 0.1 }

[[WET.cpt]]
when = { RAIN = "F" }
then = { T = 0.1, F = 0.9 }
"#;
        let net = Network::from_str_format(doc, DocumentFormat::Toml).unwrap();
        let wet = net.get("WET").unwrap();
        assert_eq!(wet.parents, vec!["RAIN"]);
        match &wet.cpt {
            Cpt::Conditional(rows) => assert_eq!(rows.len(), 2),
            Cpt::Leaf(_) => panic!("expected conditional cpt"),
        }
    }

    #[test]
    fn test_malformed_document() {
        let err = Network::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.TOML")), DocumentFormat::Toml);
        assert_eq!(DocumentFormat::from_path(Path::new("a")), DocumentFormat::Json);
    }

    #[test]
    fn test_builders_and_lookup() {
        let mut net = Network::new();
        net.insert("A", Node::leaf(["T", "F"], &[0.3, 0.7]));
        net.insert(
            "B",
            Node::conditional(
                ["T", "F"],
                ["A"],
                &[(&["T"], &[0.9, 0.1]), (&["F"], &[0.2, 0.8])],
            ),
        );
        let b = net.get("B").unwrap();
        let mut given = BTreeMap::new();
        given.insert("A".to_string(), "F".to_string());
        assert_eq!(b.cpt.probability("T", &given), Some(0.2));
        assert_eq!(b.cpt.referenced_parents().into_iter().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(b.state_index("F"), Some(1));
        assert_eq!(net.summary().arcs, 1);
    }

    #[test]
    fn test_roundtrip_json_preserves_network() {
        let net = Network::from_json(SPRINKLER).unwrap();
        let again = Network::from_json(&net.to_json().unwrap()).unwrap();
        assert_eq!(net, again);
    }
}
