//! Errors raised by graph transforms.

use thiserror::Error;

/// Errors from graph construction and compilation steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("self-loop on node {0} is not allowed")]
    SelfLoop(String),

    #[error("elimination order does not cover the graph: {0}")]
    OrderMismatch(String),

    #[error("clique {0} is out of range")]
    CliqueOutOfRange(usize),
}
