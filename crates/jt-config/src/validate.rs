//! Validation errors and semantic checks for networks and settings.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::network::{Cpt, Network, Node};
use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Network and settings validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Unknown reference in {field}: {name}")]
    UnknownReference { field: String, name: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::UnknownReference { .. } => 64,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }

    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structural validation: everything junction-tree compilation relies on.
///
/// Probability sums are not checked here; see [`validate_probabilities`].
pub fn validate_network(network: &Network) -> ValidationResult<()> {
    for (name, node) in network.nodes() {
        validate_node_shape(network, name, node)?;
    }
    check_acyclic(network)?;
    for (name, node) in network.nodes() {
        validate_cpt(network, name, &node.cpt)?;
    }
    Ok(())
}

fn validate_node_shape(network: &Network, name: &str, node: &Node) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::invalid("<root>", "variable names must be non-empty"));
    }
    if !node.id.is_empty() && node.id != name {
        return Err(ValidationError::invalid(
            format!("{}.id", name),
            format!("id {:?} does not match its key", node.id),
        ));
    }

    if node.states.is_empty() {
        return Err(ValidationError::invalid(
            format!("{}.states", name),
            "at least one state is required",
        ));
    }
    let mut seen = BTreeSet::new();
    for state in &node.states {
        if state.is_empty() {
            return Err(ValidationError::invalid(
                format!("{}.states", name),
                "state names must be non-empty",
            ));
        }
        if !seen.insert(state.as_str()) {
            return Err(ValidationError::invalid(
                format!("{}.states", name),
                format!("duplicate state {:?}", state),
            ));
        }
    }

    let mut seen = BTreeSet::new();
    for parent in &node.parents {
        if parent == name {
            return Err(ValidationError::invalid(
                format!("{}.parents", name),
                "a variable cannot be its own parent",
            ));
        }
        if !network.contains(parent) {
            return Err(ValidationError::UnknownReference {
                field: format!("{}.parents", name),
                name: parent.clone(),
            });
        }
        if !seen.insert(parent.as_str()) {
            return Err(ValidationError::invalid(
                format!("{}.parents", name),
                format!("duplicate parent {:?}", parent),
            ));
        }
    }
    Ok(())
}

/// Kahn's algorithm over parent → child arcs.
fn check_acyclic(network: &Network) -> ValidationResult<()> {
    let mut indegree: BTreeMap<&str, usize> = network
        .nodes()
        .map(|(name, node)| (name, node.parents.len()))
        .collect();
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, node) in network.nodes() {
        for parent in &node.parents {
            children.entry(parent.as_str()).or_default().push(name);
        }
    }

    let mut ready: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    let mut ordered = 0usize;
    while let Some(n) = ready.pop_front() {
        ordered += 1;
        for child in children.get(n).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(child) {
                *d -= 1;
                if *d == 0 {
                    ready.push_back(*child);
                }
            }
        }
    }

    if ordered == network.len() {
        return Ok(());
    }
    let cyclic: Vec<&str> = indegree
        .iter()
        .filter(|(_, d)| **d > 0)
        .map(|(n, _)| *n)
        .collect();
    Err(ValidationError::SemanticError(format!(
        "parent arcs form a cycle through {}",
        cyclic.join(", ")
    )))
}

/// Check a CPT against the declared states and parents of `name`.
///
/// Used for every node of a network and for distribution replacement. The
/// table must be dense: one row per parent assignment, one entry per state.
pub fn validate_cpt(network: &Network, name: &str, cpt: &Cpt) -> ValidationResult<()> {
    let node = network.get(name).ok_or_else(|| ValidationError::UnknownReference {
        field: "<root>".to_string(),
        name: name.to_string(),
    })?;
    let field = format!("{}.cpt", name);
    let states: BTreeSet<&str> = node.states.iter().map(String::as_str).collect();

    match cpt {
        Cpt::Leaf(probs) => {
            if !node.parents.is_empty() {
                return Err(ValidationError::invalid(
                    field,
                    "a variable with parents needs conditional rows",
                ));
            }
            check_distribution(&field, &states, probs)?;
        }
        Cpt::Conditional(rows) => {
            if node.parents.is_empty() {
                return Err(ValidationError::invalid(
                    field,
                    "a parentless variable needs a state → probability map",
                ));
            }
            let parents: BTreeSet<&str> = node.parents.iter().map(String::as_str).collect();
            let mut seen: BTreeSet<Vec<(&str, &str)>> = BTreeSet::new();

            for (i, row) in rows.iter().enumerate() {
                let row_field = format!("{}[{}]", field, i);
                let named: BTreeSet<&str> = row.when.keys().map(String::as_str).collect();
                if named != parents {
                    return Err(ValidationError::invalid(
                        format!("{}.when", row_field),
                        format!(
                            "conditions on {{{}}}, parents are {{{}}}",
                            named.into_iter().collect::<Vec<_>>().join(", "),
                            node.parents.join(", ")
                        ),
                    ));
                }
                for (parent, state) in &row.when {
                    let known = network.get(parent).is_some_and(|p| p.has_state(state));
                    if !known {
                        return Err(ValidationError::UnknownReference {
                            field: format!("{}.when.{}", row_field, parent),
                            name: state.clone(),
                        });
                    }
                }
                let key: Vec<(&str, &str)> = row
                    .when
                    .iter()
                    .map(|(p, s)| (p.as_str(), s.as_str()))
                    .collect();
                if !seen.insert(key) {
                    return Err(ValidationError::invalid(
                        format!("{}.when", row_field),
                        "duplicate parent assignment",
                    ));
                }
                check_distribution(&format!("{}.then", row_field), &states, &row.then)?;
            }

            let expected: usize = node
                .parents
                .iter()
                .filter_map(|p| network.get(p))
                .map(|p| p.states.len())
                .product();
            if rows.len() != expected {
                return Err(ValidationError::invalid(
                    field,
                    format!("expected {} rows, got {}", expected, rows.len()),
                ));
            }
        }
    }
    Ok(())
}

fn check_distribution(
    field: &str,
    states: &BTreeSet<&str>,
    probs: &BTreeMap<String, f64>,
) -> ValidationResult<()> {
    let declared: BTreeSet<&str> = probs.keys().map(String::as_str).collect();
    if &declared != states {
        return Err(ValidationError::invalid(
            field,
            format!(
                "states {{{}}} do not match declared {{{}}}",
                declared.into_iter().collect::<Vec<_>>().join(", "),
                states.iter().copied().collect::<Vec<_>>().join(", ")
            ),
        ));
    }
    for (state, p) in probs {
        if !p.is_finite() || *p < 0.0 {
            return Err(ValidationError::invalid(
                format!("{}.{}", field, state),
                format!("must be finite and non-negative, got {}", p),
            ));
        }
    }
    Ok(())
}

/// Opt-in check that every distribution sums to 1 within `tolerance`.
pub fn validate_probabilities(network: &Network, tolerance: f64) -> ValidationResult<()> {
    for (name, node) in network.nodes() {
        match &node.cpt {
            Cpt::Leaf(probs) => check_sum(&format!("{}.cpt", name), probs, tolerance)?,
            Cpt::Conditional(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    check_sum(&format!("{}.cpt[{}].then", name, i), &row.then, tolerance)?;
                }
            }
        }
    }
    Ok(())
}

fn check_sum(field: &str, probs: &BTreeMap<String, f64>, tolerance: f64) -> ValidationResult<()> {
    let sum: f64 = probs.values().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(ValidationError::SemanticError(format!(
            "{} must sum to 1.0, got {}",
            field, sum
        )));
    }
    Ok(())
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    let tol = settings.validation.tolerance;
    if !tol.is_finite() || tol <= 0.0 || tol >= 1.0 {
        return Err(ValidationError::invalid(
            "validation.tolerance",
            format!("Must be in (0, 1), got {}", tol),
        ));
    }

    if let Some(p) = settings.output.precision {
        if p > crate::settings::MAX_PRECISION {
            return Err(ValidationError::invalid(
                "output.precision",
                format!("Must be at most {}, got {}", crate::settings::MAX_PRECISION, p),
            ));
        }
    }

    Ok(())
}
