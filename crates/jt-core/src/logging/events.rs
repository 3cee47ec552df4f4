//! Structured event definitions for logging.
//!
//! Every JSONL line carries a `run_id` and the pipeline `stage` it was
//! emitted from, so a single CLI invocation can be followed end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and settings resolution.
    Init,
    /// Reading and validating the network file.
    Load,
    /// Moralize, triangulate, cliques, junction forest.
    Compile,
    /// Evidence and distribution changes.
    Evidence,
    /// Potential initialization and collect/distribute.
    Propagate,
    /// Marginal and joint queries.
    Query,
    /// Rendering command output.
    Report,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Init,
        Stage::Load,
        Stage::Compile,
        Stage::Evidence,
        Stage::Propagate,
        Stage::Query,
        Stage::Report,
    ];

    /// Inverse of [`Stage::as_str`].
    pub fn parse(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Compile => "compile",
            Stage::Evidence => "evidence",
            Stage::Propagate => "propagate",
            Stage::Query => "query",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable event names, used as tracing targets for JSONL output.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const NETWORK_LOADED: &str = "network.loaded";
    pub const NETWORK_INVALID: &str = "network.invalid";

    pub const COMPILE_FINISHED: &str = "compile.finished";

    pub const EVIDENCE_CHANGED: &str = "evidence.changed";

    pub const PROPAGATE_FINISHED: &str = "propagate.finished";

    pub const QUERY_ANSWERED: &str = "query.answered";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// One JSONL line. `run_id` and `stage` are absent outside a run span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Event name, e.g. `compile.finished`.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional structured fields (stable keys).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(level: Level, event: impl Into<String>) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id: None,
            stage: None,
            message: None,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field; values that fail to serialize are skipped.
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Correlation data shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }

    /// Context with a freshly generated run id.
    pub fn generate() -> Self {
        Self::new(super::generate_run_id())
    }

    /// Span carrying `run_id` and `stage`; the JSONL layer copies both
    /// onto every event emitted inside it.
    pub fn span(&self, stage: Stage) -> tracing::Span {
        tracing::info_span!("jt", run_id = %self.run_id, stage = stage.as_str())
    }
}
