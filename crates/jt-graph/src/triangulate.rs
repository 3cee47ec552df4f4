//! Greedy triangulation by minimum-neighbor elimination.
//!
//! Minimum fill-in is NP-hard, so the elimination order is chosen greedily:
//! always eliminate the remaining node with the fewest remaining neighbors,
//! breaking ties by node id. Eliminating a node connects all of its remaining
//! neighbors; those fill edges are what make the result chordal.

use serde::Serialize;

use crate::graph::Graph;

/// Options for [`triangulate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangulateOptions {
    /// Eliminate already-simplicial nodes first. They never need fill
    /// edges, so this only shrinks the working set for the greedy loop.
    pub strip_simplicial: bool,
}

impl Default for TriangulateOptions {
    fn default() -> Self {
        Self {
            strip_simplicial: true,
        }
    }
}

/// Result of triangulating a graph.
#[derive(Debug, Clone, Serialize)]
pub struct Triangulation {
    /// Chordal supergraph of the input.
    pub graph: Graph,
    /// Nodes in the order they were eliminated.
    pub elimination_order: Vec<String>,
    /// Edges added during elimination, each as `(smaller, larger)`.
    pub fill_edges: Vec<(String, String)>,
}

/// Triangulate `graph` and record the elimination order.
pub fn triangulate(graph: &Graph, options: TriangulateOptions) -> Triangulation {
    let mut result = graph.clone();
    let mut working = graph.clone();
    let mut elimination_order = Vec::with_capacity(graph.node_count());
    let mut fill_edges = Vec::new();

    if options.strip_simplicial {
        // Removing a simplicial node can make its neighbors simplicial, so
        // sweep until nothing changes.
        loop {
            let simplicial: Vec<String> = working
                .nodes()
                .filter(|id| working.is_simplicial(id))
                .map(str::to_string)
                .collect();
            if simplicial.is_empty() {
                break;
            }
            for id in simplicial {
                // An earlier removal in this sweep may have changed it.
                if working.is_simplicial(&id) {
                    working.remove_node(&id);
                    elimination_order.push(id);
                }
            }
        }
    }

    while let Some(node) = min_neighbor_node(&working) {
        let neighbors = working.neighbors_of(&node);
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                if !working.has_edge(a, b) {
                    // Both endpoints exist in both graphs, so these cannot fail.
                    let _ = working.add_edge(a, b);
                    if result.add_edge(a, b).unwrap_or(false) {
                        fill_edges.push(ordered_pair(a, b));
                    }
                }
            }
        }
        working.remove_node(&node);
        elimination_order.push(node);
    }

    Triangulation {
        graph: result,
        elimination_order,
        fill_edges,
    }
}

/// The remaining node with the fewest neighbors; ties go to the smallest id.
fn min_neighbor_node(working: &Graph) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for id in working.nodes() {
        let degree = working.degree(id);
        match best {
            Some((_, d)) if d <= degree => {}
            _ => best = Some((id, degree)),
        }
    }
    best.map(|(id, _)| id.to_string())
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
