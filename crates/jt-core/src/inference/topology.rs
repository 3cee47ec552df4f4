//! Compiled junction-forest topology.
//!
//! Built once per network structure (names, states, parents) and never
//! mutated. Engines share it through `Arc`; CPT values and evidence live in
//! the engine, so changing them never rebuilds the topology.

use std::collections::BTreeMap;

use jt_config::{validate_network, Network};
use jt_graph::{elimination_cliques, moralize, triangulate, JunctionForest, TriangulateOptions};
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};

/// One variable as seen by the compiled topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub states: Vec<String>,
    /// Parent names in declaration order.
    pub parents: Vec<String>,
    /// Parent indices in declaration order.
    #[serde(skip)]
    pub parent_indices: Vec<usize>,
}

impl VariableInfo {
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }
}

/// Immutable result of compiling a network structure.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledTopology {
    /// Variables sorted by name; the position is the variable index.
    variables: Vec<VariableInfo>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
    forest: JunctionForest,
    /// Clique members as sorted variable indices.
    clique_scopes: Vec<Vec<usize>>,
    /// Accepted separators' shared variables as sorted indices.
    separator_scopes: Vec<Vec<usize>>,
    /// Per variable: the clique that holds its CPT factor.
    factor_home: Vec<usize>,
    /// Per clique: position of its component in `forest.components`.
    #[serde(skip)]
    clique_component: Vec<usize>,
    elimination_order: Vec<String>,
    fill_edges: Vec<(String, String)>,
}

impl CompiledTopology {
    /// Validate `network` structurally and compile its junction forest.
    pub fn compile(network: &Network, options: TriangulateOptions) -> Result<Self> {
        validate_network(network)?;

        let variables: Vec<VariableInfo> = network
            .nodes()
            .map(|(name, node)| VariableInfo {
                name: name.to_string(),
                states: node.states.clone(),
                parents: node.parents.clone(),
                parent_indices: Vec::new(),
            })
            .collect();
        let index: BTreeMap<String, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i))
            .collect();
        let variables = variables
            .into_iter()
            .map(|mut v| {
                v.parent_indices = v.parents.iter().filter_map(|p| index.get(p).copied()).collect();
                v
            })
            .collect::<Vec<_>>();

        let moral = moralize(network.families())?;
        let triangulated = triangulate(&moral, options);
        let cliques = elimination_cliques(&triangulated.graph, &triangulated.elimination_order)?;
        let forest = JunctionForest::build(cliques);

        let to_indices = |names: &[String]| -> Result<Vec<usize>> {
            let mut idx = names
                .iter()
                .map(|n| {
                    index
                        .get(n)
                        .copied()
                        .ok_or_else(|| EngineError::Internal(format!("clique member {} unknown", n)))
                })
                .collect::<Result<Vec<_>>>()?;
            idx.sort_unstable();
            Ok(idx)
        };
        let clique_scopes = forest
            .cliques
            .iter()
            .map(|c| to_indices(c.as_slice()))
            .collect::<Result<Vec<_>>>()?;
        let separator_scopes = forest
            .separators
            .iter()
            .map(|s| to_indices(&s.shared))
            .collect::<Result<Vec<_>>>()?;

        let mut factor_home = Vec::with_capacity(variables.len());
        for (var, info) in variables.iter().enumerate() {
            let home = clique_scopes
                .iter()
                .position(|scope| {
                    scope.binary_search(&var).is_ok()
                        && info
                            .parent_indices
                            .iter()
                            .all(|p| scope.binary_search(p).is_ok())
                })
                .ok_or_else(|| {
                    EngineError::Internal(format!("no clique holds the family of {}", info.name))
                })?;
            factor_home.push(home);
        }

        let mut clique_component = vec![0; clique_scopes.len()];
        for (component, members) in forest.components.iter().enumerate() {
            for &clique in members {
                clique_component[clique] = component;
            }
        }

        debug!(
            variables = variables.len(),
            cliques = clique_scopes.len(),
            separators = separator_scopes.len(),
            components = forest.components.len(),
            fill_edges = triangulated.fill_edges.len(),
            treewidth = forest.treewidth(),
            "compiled junction forest"
        );

        Ok(Self {
            variables,
            index,
            forest,
            clique_scopes,
            separator_scopes,
            factor_home,
            clique_component,
            elimination_order: triangulated.elimination_order,
            fill_edges: triangulated.fill_edges,
        })
    }

    /// Whether `network` has exactly the structure this topology was built
    /// from (names, ordered states, parents).
    pub fn matches(&self, network: &Network) -> bool {
        network.len() == self.variables.len()
            && network.nodes().zip(&self.variables).all(|((name, node), info)| {
                name == info.name && node.states == info.states && node.parents == info.parents
            })
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    pub fn variable(&self, var: usize) -> &VariableInfo {
        &self.variables[var]
    }

    /// Index of a variable by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn forest(&self) -> &JunctionForest {
        &self.forest
    }

    pub fn clique_count(&self) -> usize {
        self.clique_scopes.len()
    }

    pub fn clique_scope(&self, clique: usize) -> &[usize] {
        &self.clique_scopes[clique]
    }

    pub fn separator_scope(&self, separator: usize) -> &[usize] {
        &self.separator_scopes[separator]
    }

    pub fn cardinalities(&self, scope: &[usize]) -> Vec<usize> {
        scope.iter().map(|&v| self.variables[v].cardinality()).collect()
    }

    pub fn factor_home(&self, var: usize) -> usize {
        self.factor_home[var]
    }

    /// Component of the junction forest that holds `var`, indexed like
    /// `forest().components`.
    pub fn component_of(&self, var: usize) -> usize {
        self.clique_component[self.factor_home[var]]
    }

    /// Variables whose factor is assigned to `clique`.
    pub fn factors_in(&self, clique: usize) -> impl Iterator<Item = usize> + '_ {
        self.factor_home
            .iter()
            .enumerate()
            .filter(move |(_, home)| **home == clique)
            .map(|(var, _)| var)
    }

    /// Smallest clique holding every variable in `vars` (ties: lowest id).
    pub fn covering_clique(&self, vars: &[usize]) -> Option<usize> {
        self.clique_scopes
            .iter()
            .enumerate()
            .filter(|(_, scope)| vars.iter().all(|v| scope.binary_search(v).is_ok()))
            .min_by_key(|(id, scope)| (scope.len(), *id))
            .map(|(id, _)| id)
    }

    pub fn elimination_order(&self) -> &[String] {
        &self.elimination_order
    }

    pub fn fill_edges(&self) -> &[(String, String)] {
        &self.fill_edges
    }

    pub fn treewidth(&self) -> usize {
        self.forest.treewidth()
    }

    /// Number of rows across all clique tables.
    pub fn table_size(&self) -> usize {
        self.clique_scopes
            .iter()
            .map(|s| self.cardinalities(s).iter().product::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jt_config::Node;

    fn chain() -> Network {
        let mut net = Network::new();
        net.insert("A", Node::leaf(["t", "f"], &[0.5, 0.5]));
        net.insert(
            "B",
            Node::conditional(["t", "f"], ["A"], &[(&["t"], &[0.9, 0.1]), (&["f"], &[0.2, 0.8])]),
        );
        net.insert(
            "C",
            Node::conditional(["t", "f"], ["B"], &[(&["t"], &[0.7, 0.3]), (&["f"], &[0.1, 0.9])]),
        );
        net
    }

    #[test]
    fn test_chain_compiles_to_two_cliques() {
        let topo = CompiledTopology::compile(&chain(), TriangulateOptions::default()).unwrap();
        assert_eq!(topo.clique_count(), 2);
        assert_eq!(topo.forest().separators.len(), 1);
        assert_eq!(topo.separator_scope(0), &[1]);
        assert!(topo.fill_edges().is_empty());
        assert_eq!(topo.treewidth(), 1);
    }

    #[test]
    fn test_every_factor_has_a_home() {
        let topo = CompiledTopology::compile(&chain(), TriangulateOptions::default()).unwrap();
        for var in 0..topo.variables().len() {
            let scope = topo.clique_scope(topo.factor_home(var));
            assert!(scope.contains(&var));
            for p in &topo.variable(var).parent_indices {
                assert!(scope.contains(p));
            }
        }
        let total: usize = (0..topo.clique_count()).map(|c| topo.factors_in(c).count()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_covering_clique() {
        let topo = CompiledTopology::compile(&chain(), TriangulateOptions::default()).unwrap();
        let a = topo.index_of("A").unwrap();
        let b = topo.index_of("B").unwrap();
        let c = topo.index_of("C").unwrap();
        assert!(topo.covering_clique(&[a, b]).is_some());
        assert!(topo.covering_clique(&[a, c]).is_none());
        assert!(topo.covering_clique(&[b]).is_some());
    }

    #[test]
    fn test_component_of_separates_disconnected_parts() {
        let mut net = chain();
        net.insert("D", Node::leaf(["x", "y"], &[0.4, 0.6]));
        let topo = CompiledTopology::compile(&net, TriangulateOptions::default()).unwrap();
        assert_eq!(topo.forest().components.len(), 2);
        let a = topo.component_of(topo.index_of("A").unwrap());
        let c = topo.component_of(topo.index_of("C").unwrap());
        let d = topo.component_of(topo.index_of("D").unwrap());
        assert_eq!(a, c);
        assert_ne!(a, d);
        assert!(topo.forest().components[d].contains(&topo.factor_home(topo.index_of("D").unwrap())));
    }

    #[test]
    fn test_matches_structure_only() {
        let net = chain();
        let topo = CompiledTopology::compile(&net, TriangulateOptions::default()).unwrap();
        assert!(topo.matches(&net));

        let mut changed = net.clone();
        changed.insert("D", Node::leaf(["x"], &[1.0]));
        assert!(!topo.matches(&changed));

        let mut reweighted = net;
        reweighted.insert("A", Node::leaf(["t", "f"], &[0.1, 0.9]));
        assert!(topo.matches(&reweighted));
    }

    #[test]
    fn test_invalid_network_rejected() {
        let mut net = chain();
        net.get_mut("C").unwrap().parents.push("Z".into());
        let err = CompiledTopology::compile(&net, TriangulateOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidNetwork(_)));
    }
}
