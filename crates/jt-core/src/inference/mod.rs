//! Exact inference: clique potentials, propagation and the query facade.

pub mod engine;
pub mod initialize;
pub mod potential;
pub mod propagate;
pub mod strategy;
pub mod topology;

pub use engine::{EngineOptions, InferAllOptions, InferenceEngine, Marginals};
pub use potential::Potential;
pub use propagate::{propagate, Propagation, SeparatorStore, TraversalMode};
pub use strategy::{EnumerationStrategy, InferenceStrategy, DEFAULT_ENUMERATION_LIMIT};
pub use topology::{CompiledTopology, VariableInfo};
