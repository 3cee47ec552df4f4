//! Engine error types.
//!
//! Every variant has a stable numeric code and a category so CLI callers can
//! react without parsing messages:
//!
//! ```json
//! { "code": 21, "category": "query", "message": "unknown state \"MAYBE\" for variable RAIN" }
//! ```

use jt_config::ValidationError;
use jt_graph::GraphError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The network definition cannot be compiled.
    Network,
    /// A query or evidence names something the network does not have.
    Query,
    /// A replacement CPT does not fit its variable.
    Distribution,
    /// Settings or input files could not be loaded.
    Config,
    /// Broken invariant inside the engine.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Query => "query",
            ErrorCategory::Distribution => "distribution",
            ErrorCategory::Config => "config",
            ErrorCategory::Internal => "internal",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid network: {0}")]
    InvalidNetwork(#[from] ValidationError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown state {state:?} for variable {variable}")]
    UnknownState { variable: String, state: String },

    #[error("event must name at least one variable")]
    EmptyEvent,

    #[error("precision {places} exceeds the maximum of {max} decimal places")]
    InvalidPrecision { places: u32, max: u32 },

    #[error("distribution for {variable} does not match its declaration: {reason}")]
    DistributionMismatch { variable: String, reason: String },

    #[error("compiled topology does not match the network structure")]
    TopologyMismatch,

    #[error("joint table has {rows} rows, enumeration limit is {limit}")]
    EnumerationLimit { rows: u128, limit: u128 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable error code:
    /// - 10-19: network
    /// - 20-29: query
    /// - 30-39: distribution
    /// - 90: internal
    pub fn code(&self) -> u32 {
        match self {
            EngineError::InvalidNetwork(_) => 10,
            EngineError::Graph(_) => 11,
            EngineError::TopologyMismatch => 12,
            EngineError::EnumerationLimit { .. } => 13,
            EngineError::UnknownVariable(_) => 20,
            EngineError::UnknownState { .. } => 21,
            EngineError::EmptyEvent => 22,
            EngineError::InvalidPrecision { .. } => 23,
            EngineError::DistributionMismatch { .. } => 30,
            EngineError::Internal(_) => 90,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::InvalidNetwork(_)
            | EngineError::Graph(_)
            | EngineError::TopologyMismatch
            | EngineError::EnumerationLimit { .. } => ErrorCategory::Network,
            EngineError::UnknownVariable(_)
            | EngineError::UnknownState { .. }
            | EngineError::EmptyEvent
            | EngineError::InvalidPrecision { .. } => ErrorCategory::Query,
            EngineError::DistributionMismatch { .. } => ErrorCategory::Distribution,
            EngineError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller can fix this by changing its input.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Internal(_))
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            category: self.category(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
        }
    }
}

/// Serializable form of an error for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorReport {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_categories() {
        let e = EngineError::UnknownState {
            variable: "RAIN".into(),
            state: "MAYBE".into(),
        };
        assert_eq!(e.code(), 21);
        assert_eq!(e.category(), ErrorCategory::Query);
        assert_eq!(e.to_string(), "unknown state \"MAYBE\" for variable RAIN");
        assert!(e.is_recoverable());

        assert_eq!(EngineError::EmptyEvent.category(), ErrorCategory::Query);
        let precision = EngineError::InvalidPrecision { places: 40, max: 15 };
        assert_eq!(precision.code(), 23);
        assert_eq!(precision.category(), ErrorCategory::Query);
        assert!(!EngineError::Internal("x".into()).is_recoverable());
    }

    #[test]
    fn test_from_validation_error() {
        let e: EngineError = ValidationError::SemanticError("cycle".into()).into();
        assert_eq!(e.category(), ErrorCategory::Network);
        assert!(e.to_string().contains("cycle"));
    }

    #[test]
    fn test_report_json() {
        let json = serde_json::to_value(EngineError::EmptyEvent.report()).unwrap();
        assert_eq!(json["code"], 22);
        assert_eq!(json["category"], "query");
        assert_eq!(json["recoverable"], true);
    }
}
