//! Clique enumeration over a triangulated graph.
//!
//! [`elimination_cliques`] is the compilation path: it walks the elimination
//! order produced by triangulation, so each candidate is a node plus its
//! later-eliminated neighbors. [`maximal_cliques`] is a general Bron–Kerbosch
//! enumerator for standalone analysis.

use std::collections::BTreeSet;

use crate::error::GraphError;
use crate::graph::Graph;

/// Cliques as sorted node-id lists, indexed by discovery order.
pub type CliqueSet = Vec<Vec<String>>;

/// Enumerate cliques along an elimination order.
///
/// For every node, the candidate is the node plus each later-ordered node
/// adjacent to every member assembled so far. A candidate equal to or
/// contained in an earlier clique is dropped, which leaves exactly the
/// maximal cliques when `order` is a perfect elimination ordering.
pub fn elimination_cliques(graph: &Graph, order: &[String]) -> Result<CliqueSet, GraphError> {
    check_order(graph, order)?;

    let mut cliques: CliqueSet = Vec::new();
    let mut seen: Vec<BTreeSet<&str>> = Vec::new();

    for (i, node) in order.iter().enumerate() {
        let mut members: Vec<&str> = vec![node.as_str()];
        for later in &order[i + 1..] {
            if members.iter().all(|m| graph.has_edge(m, later)) {
                members.push(later.as_str());
            }
        }

        let set: BTreeSet<&str> = members.iter().copied().collect();
        if seen.iter().any(|existing| set.is_subset(existing)) {
            continue;
        }
        cliques.push(set.iter().map(|s| s.to_string()).collect());
        seen.push(set);
    }

    Ok(cliques)
}

fn check_order(graph: &Graph, order: &[String]) -> Result<(), GraphError> {
    if order.len() != graph.node_count() {
        return Err(GraphError::OrderMismatch(format!(
            "order has {} nodes, graph has {}",
            order.len(),
            graph.node_count()
        )));
    }
    let mut seen = BTreeSet::new();
    for id in order {
        if !graph.has_node(id) {
            return Err(GraphError::UnknownNode(id.clone()));
        }
        if !seen.insert(id.as_str()) {
            return Err(GraphError::OrderMismatch(format!("{} appears twice", id)));
        }
    }
    Ok(())
}

/// All maximal cliques via Bron–Kerbosch with pivoting.
///
/// Output is sorted (members within a clique, then cliques lexicographically).
pub fn maximal_cliques(graph: &Graph) -> CliqueSet {
    let mut out = Vec::new();
    let candidates: BTreeSet<String> = graph.nodes().map(str::to_string).collect();
    bron_kerbosch(graph, Vec::new(), candidates, BTreeSet::new(), &mut out);
    for clique in &mut out {
        clique.sort();
    }
    out.sort();
    out
}

fn bron_kerbosch(
    graph: &Graph,
    current: Vec<String>,
    mut candidates: BTreeSet<String>,
    mut excluded: BTreeSet<String>,
    out: &mut CliqueSet,
) {
    if candidates.is_empty() && excluded.is_empty() {
        if !current.is_empty() {
            out.push(current);
        }
        return;
    }

    // Pivot on the node covering the most candidates.
    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .max_by_key(|u| {
            graph
                .neighbor_set(u)
                .map(|n| n.intersection(&candidates).count())
                .unwrap_or(0)
        })
        .cloned();
    let pivot_neighbors = pivot
        .as_deref()
        .and_then(|p| graph.neighbor_set(p))
        .cloned()
        .unwrap_or_default();

    let branch: Vec<String> = candidates
        .iter()
        .filter(|v| !pivot_neighbors.contains(*v))
        .cloned()
        .collect();

    for v in branch {
        let neighbors = graph.neighbor_set(&v).cloned().unwrap_or_default();
        let mut next = current.clone();
        next.push(v.clone());
        bron_kerbosch(
            graph,
            next,
            candidates.intersection(&neighbors).cloned().collect(),
            excluded.intersection(&neighbors).cloned().collect(),
            out,
        );
        candidates.remove(&v);
        excluded.insert(v);
    }
}
