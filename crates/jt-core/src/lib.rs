//! Junction-tree exact inference for discrete Bayesian networks.
//!
//! - `inference`: compiled topology, clique potentials, collect/distribute
//!   propagation and the [`InferenceEngine`] query facade
//! - `config`: settings and network loading with provenance
//! - `logging`: tracing setup (human or JSONL on stderr)
//! - `output`: command payloads for the `jt-core` binary
//! - `schema`: JSON Schemas of input documents and payloads
//!
//! ```ignore
//! use jt_core::{InferenceEngine, Network};
//!
//! let network = Network::from_file("sprinkler.json".as_ref())?;
//! let mut engine = InferenceEngine::new(network)?;
//! engine.set_evidence([("GRASS_WET", "T")])?;
//! let p = engine.infer([("RAIN", "T")])?;
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod inference;
pub mod logging;
pub mod output;
pub mod schema;

pub use error::{EngineError, ErrorCategory, ErrorReport, Result};
pub use inference::{
    CompiledTopology, EngineOptions, EnumerationStrategy, InferAllOptions, InferenceEngine,
    InferenceStrategy, Marginals, TraversalMode,
};
pub use jt_config::{Cpt, CptRow, Network, Node};
