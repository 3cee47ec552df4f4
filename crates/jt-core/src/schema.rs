//! JSON Schema generation for input documents and command payloads.
//!
//! ```bash
//! jt-core schema            # network file format
//! jt-core schema --list
//! jt-core schema QueryReport
//! jt-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::error::ErrorReport;
pub use crate::output::{
    CheckReport, CliqueReport, CompileReport, ErrorOutput, InferReport, QueryReport,
    SeparatorReport,
};
pub use jt_config::Settings;

/// Schema generated when no name is given.
pub const DEFAULT_SCHEMA: &str = "Network";

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Input documents
        ("Network", "Network file: variables, states, parents and CPTs"),
        ("Settings", "settings.json: propagation, output and validation"),
        // Command payloads
        ("CheckReport", "Result of `check`"),
        ("CompileReport", "Result of `compile`: cliques, separators, fill edges"),
        ("CliqueReport", "One clique of the junction forest"),
        ("SeparatorReport", "One accepted separator"),
        ("InferReport", "Result of `infer`: posterior marginals"),
        ("QueryReport", "Result of `query`: joint or conditional probability"),
        ("ErrorOutput", "Payload written to stderr on failure"),
        ("ErrorReport", "Error code, category and message"),
    ]
}

/// Generate the JSON Schema of a type by name; `None` if unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "Network" => jt_config::network_schema(),
        "Settings" => schema_for!(Settings),
        "CheckReport" => schema_for!(CheckReport),
        "CompileReport" => schema_for!(CompileReport),
        "CliqueReport" => schema_for!(CliqueReport),
        "SeparatorReport" => schema_for!(SeparatorReport),
        "InferReport" => schema_for!(InferReport),
        "QueryReport" => schema_for!(QueryReport),
        "ErrorOutput" => schema_for!(ErrorOutput),
        "ErrorReport" => schema_for!(ErrorReport),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

/// Every available schema keyed by type name.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}

/// Schema output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// Pretty-printed JSON (default)
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

pub fn format_schema(schema: &Value, format: SchemaFormat) -> Result<String, serde_json::Error> {
    match format {
        SchemaFormat::Json => serde_json::to_string_pretty(schema),
        SchemaFormat::JsonCompact => serde_json::to_string(schema),
    }
}
