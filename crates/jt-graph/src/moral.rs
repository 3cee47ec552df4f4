//! Moralization: directed families → undirected moral graph.

use crate::error::GraphError;
use crate::graph::Graph;

/// Build the moral graph of a directed network.
///
/// `families` yields each node with its parent list. The result has one
/// edge per (parent, child) pair plus an edge between every pair of parents
/// sharing a child. Parents must themselves appear as nodes.
pub fn moralize<'a, I, P>(families: I) -> Result<Graph, GraphError>
where
    I: IntoIterator<Item = (&'a str, P)> + Clone,
    P: AsRef<[String]>,
{
    let mut graph = Graph::with_nodes(families.clone().into_iter().map(|(node, _)| node));

    for (node, parents) in families {
        let parents = parents.as_ref();
        for parent in parents {
            graph.add_edge(parent, node)?;
        }
        for (i, a) in parents.iter().enumerate() {
            for b in &parents[i + 1..] {
                if a != b {
                    graph.add_edge(a, b)?;
                }
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fam(parents: &[&str]) -> Vec<String> {
        parents.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_marries_co_parents() {
        let families = vec![
            ("A", fam(&[])),
            ("B", fam(&[])),
            ("C", fam(&["A", "B"])),
        ];
        let g = moralize(families.iter().map(|(n, p)| (*n, p.as_slice()))).unwrap();
        assert!(g.has_edge("A", "C"));
        assert!(g.has_edge("B", "C"));
        assert!(g.has_edge("A", "B"));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let forward = vec![
            ("A", fam(&[])),
            ("B", fam(&["A"])),
            ("C", fam(&["A"])),
            ("D", fam(&["B", "C"])),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let g1 = moralize(forward.iter().map(|(n, p)| (*n, p.as_slice()))).unwrap();
        let g2 = moralize(reversed.iter().map(|(n, p)| (*n, p.as_slice()))).unwrap();
        assert_eq!(g1, g2);
        assert!(g1.has_edge("B", "C"));
    }

    #[test]
    fn test_unknown_parent_is_error() {
        let families = vec![("B", fam(&["A"]))];
        let err = moralize(families.iter().map(|(n, p)| (*n, p.as_slice()))).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode("A".into()));
    }
}
