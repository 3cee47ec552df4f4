//! Separator sets and the junction forest.
//!
//! Every pair of cliques with a non-empty intersection is a candidate edge
//! weighted by the intersection size. A maximum-weight spanning forest over
//! those candidates (Kruskal with union-find) is a junction tree per
//! connected component when the cliques come from a chordal graph.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::cliques::CliqueSet;
use crate::error::GraphError;

/// Shared variables between two cliques.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Separator {
    /// Lower clique id.
    pub a: usize,
    /// Higher clique id.
    pub b: usize,
    /// Sorted intersection of the two cliques' members.
    pub shared: Vec<String>,
}

impl Separator {
    pub fn weight(&self) -> usize {
        self.shared.len()
    }

    /// The clique on the other side of this separator.
    pub fn other(&self, clique: usize) -> usize {
        if clique == self.a {
            self.b
        } else {
            self.a
        }
    }
}

/// Cliques connected by the accepted separators.
#[derive(Debug, Clone, Serialize)]
pub struct JunctionForest {
    /// Cliques in discovery order; the index is the clique id.
    pub cliques: CliqueSet,
    /// Every non-empty pairwise intersection, before pruning.
    pub candidates: Vec<Separator>,
    /// Accepted separators (the forest's edges).
    pub separators: Vec<Separator>,
    /// Clique ids per connected component; the first id is the root.
    pub components: Vec<Vec<usize>>,
    /// Per clique: `(neighbor clique, separator index)`.
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl JunctionForest {
    /// Build the junction forest over `cliques`.
    pub fn build(cliques: CliqueSet) -> Self {
        let candidates = candidate_separators(&cliques);

        let mut ranked: Vec<&Separator> = candidates.iter().collect();
        // Stable: equal weights keep pair discovery order.
        ranked.sort_by(|x, y| y.weight().cmp(&x.weight()));

        let mut sets = DisjointSet::new(cliques.len());
        let mut separators = Vec::new();
        for sep in ranked {
            if sets.union(sep.a, sep.b) {
                separators.push(sep.clone());
            }
        }

        let mut adjacency = vec![Vec::new(); cliques.len()];
        for (idx, sep) in separators.iter().enumerate() {
            adjacency[sep.a].push((sep.b, idx));
            adjacency[sep.b].push((sep.a, idx));
        }
        for list in &mut adjacency {
            list.sort();
        }

        let components = components(&adjacency);

        Self {
            cliques,
            candidates,
            separators,
            components,
            adjacency,
        }
    }

    /// Number of cliques.
    pub fn len(&self) -> usize {
        self.cliques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    /// Neighbors of a clique as `(neighbor, separator index)`, sorted.
    pub fn neighbors(&self, clique: usize) -> Result<&[(usize, usize)], GraphError> {
        self.adjacency
            .get(clique)
            .map(Vec::as_slice)
            .ok_or(GraphError::CliqueOutOfRange(clique))
    }

    /// First clique id of every component.
    pub fn roots(&self) -> Vec<usize> {
        self.components.iter().filter_map(|c| c.first().copied()).collect()
    }

    /// Largest clique size minus one.
    pub fn treewidth(&self) -> usize {
        self.cliques
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Accepted separator between two adjacent cliques.
    pub fn separator_between(&self, a: usize, b: usize) -> Option<&Separator> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.separators.iter().find(|s| s.a == lo && s.b == hi)
    }

    /// Check the running-intersection property.
    ///
    /// The cliques containing a variable induce a sub-forest; it is connected
    /// exactly when it has one edge fewer than it has cliques.
    pub fn verify_running_intersection(&self) -> bool {
        let mut holders: BTreeMap<&str, usize> = BTreeMap::new();
        for clique in &self.cliques {
            for v in clique {
                *holders.entry(v.as_str()).or_insert(0) += 1;
            }
        }
        let mut links: BTreeMap<&str, usize> = BTreeMap::new();
        for sep in &self.separators {
            for v in &sep.shared {
                *links.entry(v.as_str()).or_insert(0) += 1;
            }
        }
        holders
            .iter()
            .all(|(v, count)| links.get(v).copied().unwrap_or(0) + 1 == *count)
    }
}

fn candidate_separators(cliques: &CliqueSet) -> Vec<Separator> {
    let sets: Vec<BTreeSet<&str>> = cliques
        .iter()
        .map(|c| c.iter().map(String::as_str).collect())
        .collect();

    let mut out = Vec::new();
    for a in 0..sets.len() {
        for b in (a + 1)..sets.len() {
            let shared: Vec<String> = sets[a]
                .intersection(&sets[b])
                .map(|s| s.to_string())
                .collect();
            if !shared.is_empty() {
                out.push(Separator { a, b, shared });
            }
        }
    }
    out
}

fn components(adjacency: &[Vec<(usize, usize)>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; adjacency.len()];
    let mut out = Vec::new();
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(c) = queue.pop_front() {
            members.push(c);
            for &(n, _) in &adjacency[c] {
                if !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
        members.sort_unstable();
        out.push(members);
    }
    out
}

/// Union-find with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(sets: &[&[&str]]) -> CliqueSet {
        sets.iter()
            .map(|s| s.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_chain_of_cliques() {
        let forest = JunctionForest::build(cs(&[&["A", "B"], &["B", "C"], &["C", "D"]]));
        assert_eq!(forest.candidates.len(), 2);
        assert_eq!(forest.separators.len(), 2);
        assert_eq!(forest.components, vec![vec![0, 1, 2]]);
        assert_eq!(forest.roots(), vec![0]);
        assert!(forest.verify_running_intersection());
        assert_eq!(forest.treewidth(), 1);
    }

    #[test]
    fn test_prefers_heavier_separator() {
        // {A,B,C} and {B,C,D} share two variables; {C,E} shares only C.
        let forest = JunctionForest::build(cs(&[&["A", "B", "C"], &["C", "E"], &["B", "C", "D"]]));
        assert_eq!(forest.candidates.len(), 3);
        assert_eq!(forest.separators.len(), 2);
        let heavy = forest.separator_between(0, 2).unwrap();
        assert_eq!(heavy.shared, vec!["B".to_string(), "C".to_string()]);
        assert!(forest.verify_running_intersection());
    }

    #[test]
    fn test_disconnected_cliques_form_forest() {
        let forest = JunctionForest::build(cs(&[&["A", "B"], &["X"], &["B", "C"]]));
        assert_eq!(forest.components.len(), 2);
        assert_eq!(forest.roots(), vec![0, 1]);
        assert_eq!(forest.neighbors(1).unwrap(), &[] as &[(usize, usize)]);
    }

    #[test]
    fn test_neighbor_out_of_range() {
        let forest = JunctionForest::build(cs(&[&["A"]]));
        assert_eq!(forest.neighbors(3), Err(GraphError::CliqueOutOfRange(3)));
    }

    #[test]
    fn test_broken_running_intersection_detected() {
        let mut forest = JunctionForest::build(cs(&[&["A", "B"], &["B", "C"], &["A", "C"]]));
        // A triangle of pairwise cliques is not a junction tree: one of the
        // three variables loses connectivity once a cycle edge is pruned.
        assert!(!forest.verify_running_intersection());
        forest.separators.clear();
        assert!(!forest.verify_running_intersection());
    }

    #[test]
    fn test_other_side() {
        let sep = Separator {
            a: 1,
            b: 4,
            shared: vec!["X".into()],
        };
        assert_eq!(sep.other(1), 4);
        assert_eq!(sep.other(4), 1);
        assert_eq!(sep.weight(), 1);
    }
}
