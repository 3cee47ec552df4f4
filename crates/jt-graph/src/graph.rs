//! Mutable undirected graph over string node ids.
//!
//! Adjacency is kept in ordered maps so every traversal (and therefore every
//! compiled artifact downstream) is deterministic for a given node set.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::GraphError;

/// Undirected simple graph. Edges are unordered pairs; no self-loops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph holding the given nodes and no edges.
    pub fn with_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        graph
    }

    /// Add a node. Returns false if it was already present.
    pub fn add_node(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.adjacency.contains_key(&id) {
            return false;
        }
        self.adjacency.insert(id, BTreeSet::new());
        true
    }

    /// Remove a node together with its incident edges.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(neighbors) = self.adjacency.remove(id) else {
            return false;
        };
        for neighbor in neighbors {
            if let Some(set) = self.adjacency.get_mut(&neighbor) {
                set.remove(id);
            }
        }
        true
    }

    /// Add an undirected edge between two existing nodes.
    ///
    /// Re-adding an existing edge is a no-op and returns `Ok(false)`.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<bool, GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop(a.to_string()));
        }
        for id in [a, b] {
            if !self.adjacency.contains_key(id) {
                return Err(GraphError::UnknownNode(id.to_string()));
            }
        }
        let inserted = self
            .adjacency
            .get_mut(a)
            .map(|set| set.insert(b.to_string()))
            .unwrap_or(false);
        if let Some(set) = self.adjacency.get_mut(b) {
            set.insert(a.to_string());
        }
        Ok(inserted)
    }

    /// Remove the edge between `a` and `b` in both directions.
    pub fn remove_edge(&mut self, a: &str, b: &str) -> bool {
        let removed = self
            .adjacency
            .get_mut(a)
            .map(|set| set.remove(b))
            .unwrap_or(false);
        if let Some(set) = self.adjacency.get_mut(b) {
            set.remove(a);
        }
        removed
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Whether `a` and `b` share an edge. Symmetric.
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .map(|set| set.contains(b))
            .unwrap_or(false)
    }

    /// Alias of [`Graph::has_edge`].
    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.has_edge(a, b)
    }

    /// Node ids in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// Each undirected edge once, as `(smaller, larger)`.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for (a, neighbors) in &self.adjacency {
            for b in neighbors {
                if a < b {
                    edges.push((a.clone(), b.clone()));
                }
            }
        }
        edges
    }

    /// Neighbor ids of `id` in sorted order (empty for unknown nodes).
    pub fn neighbors_of(&self, id: &str) -> Vec<String> {
        self.adjacency
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn neighbor_set(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(id)
    }

    pub fn degree(&self, id: &str) -> usize {
        self.adjacency.get(id).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Whether every pair of the given nodes is adjacent.
    pub fn is_complete<'a, I>(&self, nodes: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let nodes: Vec<&str> = nodes.into_iter().collect();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if a != b && !self.has_edge(a, b) {
                    return false;
                }
            }
        }
        true
    }

    /// A node is simplicial when its neighborhood is complete.
    pub fn is_simplicial(&self, id: &str) -> bool {
        match self.adjacency.get(id) {
            Some(neighbors) => self.is_complete(neighbors.iter().map(String::as_str)),
            None => false,
        }
    }

    /// Connected components, each sorted, ordered by their smallest node id.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.adjacency.keys() {
            if seen.contains(start.as_str()) {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(start.as_str());
            seen.insert(start.as_str());

            while let Some(id) = queue.pop_front() {
                component.push(id.to_string());
                if let Some(neighbors) = self.adjacency.get(id) {
                    for n in neighbors {
                        if seen.insert(n.as_str()) {
                            queue.push_back(n.as_str());
                        }
                    }
                }
            }
            component.sort();
            components.push(component);
        }

        components
    }

    /// Chordality test via maximum cardinality search.
    ///
    /// MCS visits nodes so that the reverse visit order is a perfect
    /// elimination ordering iff the graph is chordal; each visited node's
    /// earlier-visited neighbors must then form a clique.
    pub fn is_chordal(&self) -> bool {
        let mut weight: BTreeMap<&str, usize> =
            self.adjacency.keys().map(|k| (k.as_str(), 0)).collect();
        let mut position: BTreeMap<&str, usize> = BTreeMap::new();

        for step in 0..self.adjacency.len() {
            let next = weight
                .iter()
                .filter(|(id, _)| !position.contains_key(*id))
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(id, _)| *id);
            let Some(node) = next else {
                break;
            };
            position.insert(node, step);

            let earlier: Vec<&str> = self.adjacency[node]
                .iter()
                .map(String::as_str)
                .filter(|n| position.contains_key(n) && *n != node)
                .collect();
            if !self.is_complete(earlier.iter().copied()) {
                return false;
            }

            for n in &self.adjacency[node] {
                if !position.contains_key(n.as_str()) {
                    if let Some(w) = weight.get_mut(n.as_str()) {
                        *w += 1;
                    }
                }
            }
        }

        true
    }
}
