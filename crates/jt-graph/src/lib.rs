//! Graph transforms behind junction-tree compilation.
//!
//! Everything here works on plain string node ids and knows nothing about
//! probabilities:
//! - [`graph::Graph`]: mutable undirected graph
//! - [`moral`]: directed families → moral graph
//! - [`triangulate`]: greedy minimum-neighbor elimination
//! - [`cliques`]: elimination cliques and Bron–Kerbosch maximal cliques
//! - [`junction`]: separator candidates and the maximum-weight spanning forest

pub mod cliques;
pub mod error;
pub mod graph;
pub mod junction;
pub mod moral;
pub mod triangulate;

pub use cliques::{elimination_cliques, maximal_cliques, CliqueSet};
pub use error::GraphError;
pub use graph::Graph;
pub use junction::{JunctionForest, Separator};
pub use moral::moralize;
pub use triangulate::{triangulate, TriangulateOptions, Triangulation};
