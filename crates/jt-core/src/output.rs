//! Command payloads and their renderings.
//!
//! Every command builds a serializable report. JSON wraps it in an
//! [`Envelope`] with run metadata; `md` and `summary` render the same data
//! for people.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use jt_config::NetworkSummary;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;
use crate::inference::{CompiledTopology, Marginals};

/// Version of the JSON payload layout.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Output format for command payloads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON (default)
    #[default]
    Json,
    /// Markdown tables
    Md,
    /// One line per command
    Summary,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Md => write!(f, "md"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

/// Human renderings of a report.
pub trait Render {
    fn markdown(&self) -> String;
    fn summary(&self) -> String;
}

/// Run metadata wrapped around every JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(run_id: &str, command: &str, payload: T) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            command: command.to_string(),
            payload,
        }
    }
}

/// Render `payload` in `format`.
pub fn render<T: Serialize + Render>(
    format: OutputFormat,
    run_id: &str,
    command: &str,
    payload: &T,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&Envelope::new(run_id, command, payload))?,
        OutputFormat::Md => payload.markdown(),
        OutputFormat::Summary => payload.summary(),
    })
}

/// `check` result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckReport {
    pub status: String,
    pub network_path: Option<String>,
    pub config_id: String,
    pub strict_probabilities: bool,
    pub network: NetworkSummary,
}

impl Render for CheckReport {
    fn markdown(&self) -> String {
        let mut out = String::from("# Network Check\n\n");
        let _ = writeln!(out, "Status: {}", self.status);
        if let Some(path) = &self.network_path {
            let _ = writeln!(out, "Network: {}", path);
        }
        let _ = writeln!(out, "Config: {}", self.config_id);
        let _ = writeln!(
            out,
            "Probabilities: {}",
            if self.strict_probabilities { "strict" } else { "structural only" }
        );
        out.push('\n');
        out.push_str("| Variables | Arcs | Roots | Max states | Max parents |\n");
        out.push_str("|---|---|---|---|---|\n");
        let n = &self.network;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            n.variables, n.arcs, n.roots, n.max_states, n.max_parents
        );
        out
    }

    fn summary(&self) -> String {
        format!(
            "[{}] check {}: {} variables, {} arcs",
            self.config_id, self.status, self.network.variables, self.network.arcs
        )
    }
}

/// One clique of the compiled forest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CliqueReport {
    pub id: usize,
    pub members: Vec<String>,
    pub table_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeparatorReport {
    pub a: usize,
    pub b: usize,
    pub shared: Vec<String>,
}

/// `compile` result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompileReport {
    pub variables: usize,
    pub elimination_order: Vec<String>,
    pub fill_edges: Vec<(String, String)>,
    pub cliques: Vec<CliqueReport>,
    pub candidate_separators: usize,
    pub separators: Vec<SeparatorReport>,
    pub components: usize,
    pub treewidth: usize,
    pub table_size: usize,
    pub running_intersection: bool,
}

impl CompileReport {
    pub fn from_topology(topology: &CompiledTopology) -> Self {
        let forest = topology.forest();
        let cliques = forest
            .cliques
            .iter()
            .enumerate()
            .map(|(id, members)| CliqueReport {
                id,
                members: members.clone(),
                table_rows: topology
                    .cardinalities(topology.clique_scope(id))
                    .iter()
                    .product(),
            })
            .collect();
        let separators = forest
            .separators
            .iter()
            .map(|s| SeparatorReport {
                a: s.a,
                b: s.b,
                shared: s.shared.clone(),
            })
            .collect();
        Self {
            variables: topology.variables().len(),
            elimination_order: topology.elimination_order().to_vec(),
            fill_edges: topology.fill_edges().to_vec(),
            cliques,
            candidate_separators: forest.candidates.len(),
            separators,
            components: forest.components.len(),
            treewidth: topology.treewidth(),
            table_size: topology.table_size(),
            running_intersection: forest.verify_running_intersection(),
        }
    }
}

impl Render for CompileReport {
    fn markdown(&self) -> String {
        let mut out = String::from("# Junction Forest\n\n");
        let _ = writeln!(
            out,
            "Variables: {} | Cliques: {} | Components: {} | Treewidth: {}\n",
            self.variables,
            self.cliques.len(),
            self.components,
            self.treewidth
        );
        out.push_str("## Cliques\n\n| Id | Members | Rows |\n|---|---|---|\n");
        for c in &self.cliques {
            let _ = writeln!(out, "| {} | {} | {} |", c.id, c.members.join(", "), c.table_rows);
        }
        out.push_str("\n## Separators\n\n| Cliques | Shared |\n|---|---|\n");
        for s in &self.separators {
            let _ = writeln!(out, "| {} - {} | {} |", s.a, s.b, s.shared.join(", "));
        }
        if !self.fill_edges.is_empty() {
            out.push_str("\n## Fill edges\n\n");
            for (a, b) in &self.fill_edges {
                let _ = writeln!(out, "- {} - {}", a, b);
            }
        }
        out
    }

    fn summary(&self) -> String {
        format!(
            "compiled {} variables: {} cliques, {} separators, {} fill edges, treewidth {}",
            self.variables,
            self.cliques.len(),
            self.separators.len(),
            self.fill_edges.len(),
            self.treewidth
        )
    }
}

/// `infer` result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InferReport {
    pub evidence: BTreeMap<String, String>,
    pub evidence_probability: f64,
    pub marginals: Marginals,
}

impl Render for InferReport {
    fn markdown(&self) -> String {
        let mut out = String::from("# Posterior Marginals\n\n");
        if !self.evidence.is_empty() {
            let _ = writeln!(out, "Evidence: {}", pairs(&self.evidence));
            let _ = writeln!(out, "P(evidence): {}\n", self.evidence_probability);
        }
        out.push_str("| Variable | State | Probability |\n|---|---|---|\n");
        for (name, row) in &self.marginals {
            for (state, p) in row {
                let _ = writeln!(out, "| {} | {} | {} |", name, state, p);
            }
        }
        out
    }

    fn summary(&self) -> String {
        self.marginals
            .iter()
            .map(|(name, row)| {
                let states = row
                    .iter()
                    .map(|(s, p)| format!("{}={}", s, p))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{}: {}", name, states)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `query` result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryReport {
    pub event: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub given: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub evidence: BTreeMap<String, String>,
    /// NaN (serialized as null) when the condition is impossible.
    pub probability: f64,
}

impl QueryReport {
    fn expression(&self) -> String {
        let mut expr = format!("P({}", pairs(&self.event));
        if !self.given.is_empty() {
            let _ = write!(expr, " | {}", pairs(&self.given));
        }
        expr.push(')');
        expr
    }
}

impl Render for QueryReport {
    fn markdown(&self) -> String {
        let mut out = String::from("# Query\n\n");
        if !self.evidence.is_empty() {
            let _ = writeln!(out, "Evidence: {}\n", pairs(&self.evidence));
        }
        let _ = writeln!(out, "{} = {}", self.expression(), self.probability);
        out
    }

    fn summary(&self) -> String {
        format!("{} = {}", self.expression(), self.probability)
    }
}

/// Error payload for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorOutput {
    pub status: String,
    pub exit_code: i32,
    pub exit_code_name: String,
    pub error: ErrorReport,
}

impl Render for ErrorOutput {
    fn markdown(&self) -> String {
        format!(
            "# Error\n\nCode: {} ({})\n\n{}\n",
            self.error.code, self.exit_code_name, self.error.message
        )
    }

    fn summary(&self) -> String {
        format!("error {}: {}", self.exit_code_name, self.error.message)
    }
}

fn pairs(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}
