//! Inference facade over a compiled junction forest.
//!
//! The engine owns the network's CPTs, the current evidence and lazily
//! propagated clique tables. Any change to evidence or distributions drops
//! the tables and the marginal cache; the next query recomputes them. The
//! compiled topology is shared and never rebuilt by the engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use jt_config::settings::MAX_PRECISION;
use jt_config::{validate_cpt, validate_network, Cpt, Network, Settings};
use jt_graph::TriangulateOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::initialize::{build_factor, initial_potentials};
use super::potential::Potential;
use super::propagate::{collect_mass, normalize_all, propagate, TraversalMode};
use super::topology::CompiledTopology;
use crate::error::{EngineError, Result};

/// Posterior marginals: variable → state → probability.
pub type Marginals = BTreeMap<String, BTreeMap<String, f64>>;

/// Engine construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub traversal: TraversalMode,
    pub strip_simplicial: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            traversal: TraversalMode::Recursive,
            strip_simplicial: true,
        }
    }
}

impl From<&Settings> for EngineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            traversal: settings.propagation.traversal,
            strip_simplicial: settings.propagation.strip_simplicial,
        }
    }
}

/// Options for [`InferenceEngine::infer_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferAllOptions {
    /// Round every probability to this many decimal places; `Some(0)` is
    /// the same as `None`. At most `MAX_PRECISION`.
    pub precision: Option<u32>,
}

#[derive(Debug, Clone)]
struct Propagated {
    tables: Vec<Potential>,
    /// Per component, P(evidence in that component) before normalization.
    component_mass: Vec<f64>,
}

impl Propagated {
    fn evidence_mass(&self) -> f64 {
        self.component_mass.iter().product()
    }
}

/// Exact inference over one network.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    network: Network,
    topology: Arc<CompiledTopology>,
    /// Dense CPT factor per variable index.
    factors: Vec<Potential>,
    /// Variable index → observed state index.
    evidence: BTreeMap<usize, usize>,
    traversal: TraversalMode,
    propagated: Option<Propagated>,
    marginals: Option<Marginals>,
}

impl InferenceEngine {
    /// Validate and compile `network` with default options.
    pub fn new(network: Network) -> Result<Self> {
        Self::with_options(network, EngineOptions::default())
    }

    pub fn with_options(network: Network, options: EngineOptions) -> Result<Self> {
        let topology = CompiledTopology::compile(
            &network,
            TriangulateOptions {
                strip_simplicial: options.strip_simplicial,
            },
        )?;
        let mut engine = Self::assemble(network, Arc::new(topology))?;
        engine.traversal = options.traversal;
        Ok(engine)
    }

    /// Reuse a topology compiled from a network with the same structure.
    /// The CPT values of `network` may differ.
    pub fn with_topology(network: Network, topology: Arc<CompiledTopology>) -> Result<Self> {
        validate_network(&network)?;
        if !topology.matches(&network) {
            return Err(EngineError::TopologyMismatch);
        }
        Self::assemble(network, topology)
    }

    fn assemble(network: Network, topology: Arc<CompiledTopology>) -> Result<Self> {
        let factors = topology
            .variables()
            .iter()
            .enumerate()
            .map(|(var, info)| {
                let node = network
                    .get(&info.name)
                    .ok_or_else(|| EngineError::UnknownVariable(info.name.clone()))?;
                build_factor(&topology, var, &node.cpt)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            network,
            topology,
            factors,
            evidence: BTreeMap::new(),
            traversal: TraversalMode::default(),
            propagated: None,
            marginals: None,
        })
    }

    /// Shared handle to the compiled topology.
    pub fn topology(&self) -> Arc<CompiledTopology> {
        Arc::clone(&self.topology)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn traversal(&self) -> TraversalMode {
        self.traversal
    }

    /// Switch traversal mode. Results do not depend on it, so nothing is
    /// invalidated.
    pub fn set_traversal(&mut self, mode: TraversalMode) {
        self.traversal = mode;
    }

    // ---- introspection ----

    pub fn has_variable(&self, name: &str) -> bool {
        self.topology.index_of(name).is_some()
    }

    /// Variable names in sorted order.
    pub fn variables(&self) -> Vec<&str> {
        self.topology.variables().iter().map(|v| v.name.as_str()).collect()
    }

    pub fn parents(&self, name: &str) -> Result<&[String]> {
        let var = self.var(name)?;
        Ok(&self.topology.variable(var).parents)
    }

    pub fn has_parent(&self, name: &str, parent: &str) -> Result<bool> {
        Ok(self.parents(name)?.iter().any(|p| p == parent))
    }

    /// Declared states of a variable, in declaration order.
    pub fn levels(&self, name: &str) -> Result<&[String]> {
        let var = self.var(name)?;
        Ok(&self.topology.variable(var).states)
    }

    pub fn has_level(&self, name: &str, state: &str) -> Result<bool> {
        Ok(self.levels(name)?.iter().any(|s| s == state))
    }

    // ---- distributions ----

    /// Copy of a variable's CPT.
    pub fn distribution(&self, name: &str) -> Result<Cpt> {
        self.network
            .get(name)
            .map(|node| node.cpt.clone())
            .ok_or_else(|| EngineError::UnknownVariable(name.to_string()))
    }

    /// Replace a variable's CPT. On any mismatch with the declared states
    /// or parents nothing changes.
    pub fn set_distribution(&mut self, name: &str, cpt: Cpt) -> Result<()> {
        let var = self.var(name)?;
        validate_cpt(&self.network, name, &cpt).map_err(|e| EngineError::DistributionMismatch {
            variable: name.to_string(),
            reason: e.to_string(),
        })?;
        let factor = build_factor(&self.topology, var, &cpt)?;
        let node = self
            .network
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownVariable(name.to_string()))?;
        node.cpt = cpt;
        self.factors[var] = factor;
        debug!(variable = name, "distribution replaced");
        self.invalidate();
        Ok(())
    }

    // ---- evidence ----

    pub fn has_evidence_for(&self, name: &str) -> Result<bool> {
        let var = self.var(name)?;
        Ok(self.evidence.contains_key(&var))
    }

    /// Current evidence by name.
    pub fn evidence(&self) -> BTreeMap<String, String> {
        self.evidence
            .iter()
            .map(|(&var, &state)| {
                let info = self.topology.variable(var);
                (info.name.clone(), info.states[state].clone())
            })
            .collect()
    }

    /// Replace all evidence. Every pair is checked before anything changes.
    pub fn set_evidence<I, K, V>(&mut self, evidence: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let resolved = self.resolve(evidence)?;
        let next: BTreeMap<usize, usize> = resolved.into_iter().collect();
        if next != self.evidence {
            self.evidence = next;
            debug!(observed = self.evidence.len(), "evidence set");
            self.invalidate();
        }
        Ok(())
    }

    /// Set or change individual observations, keeping the rest.
    pub fn update_evidence<I, K, V>(&mut self, evidence: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let resolved = self.resolve(evidence)?;
        let mut changed = false;
        for (var, state) in resolved {
            if self.evidence.insert(var, state) != Some(state) {
                changed = true;
            }
        }
        if changed {
            debug!(observed = self.evidence.len(), "evidence updated");
            self.invalidate();
        }
        Ok(())
    }

    /// Drop observations of the named variables. Returns whether anything
    /// was removed.
    pub fn remove_evidence<I, K>(&mut self, names: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let vars = names
            .into_iter()
            .map(|n| self.var(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut removed = false;
        for var in vars {
            removed |= self.evidence.remove(&var).is_some();
        }
        if removed {
            debug!(observed = self.evidence.len(), "evidence removed");
            self.invalidate();
        }
        Ok(removed)
    }

    pub fn remove_all_evidence(&mut self) -> bool {
        if self.evidence.is_empty() {
            return false;
        }
        self.evidence.clear();
        debug!("evidence cleared");
        self.invalidate();
        true
    }

    // ---- queries ----

    /// P(event, current evidence) / P(current evidence): the posterior
    /// probability of a joint assignment.
    ///
    /// An event naming one variable with two different states has
    /// probability 0.
    pub fn infer<I, K, V>(&mut self, event: I) -> Result<f64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs = self.resolve(event)?;
        if pairs.is_empty() {
            return Err(EngineError::EmptyEvent);
        }
        self.infer_resolved(&pairs)
    }

    /// P(event | given) under the current evidence.
    ///
    /// Computed as `infer(event ∧ given) / infer(given)`; a `given` with
    /// probability 0 yields NaN. An empty `given` is unconditional.
    pub fn conditional<I, J, K, V, K2, V2>(&mut self, event: I, given: J) -> Result<f64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        J: IntoIterator<Item = (K2, V2)>,
        K2: AsRef<str>,
        V2: AsRef<str>,
    {
        let event = self.resolve(event)?;
        let given = self.resolve(given)?;
        if event.is_empty() {
            return Err(EngineError::EmptyEvent);
        }
        if given.is_empty() {
            return self.infer_resolved(&event);
        }
        let mut both = event;
        both.extend_from_slice(&given);
        let joint = self.infer_resolved(&both)?;
        let condition = self.infer_resolved(&given)?;
        trace!(joint, condition, "conditional");
        Ok(joint / condition)
    }

    /// Posterior marginals of every variable. The full-precision table is
    /// cached; a positive `precision` rounds a copy, zero leaves it unrounded.
    pub fn infer_all(&mut self, options: InferAllOptions) -> Result<Marginals> {
        if let Some(places) = options.precision {
            if places > MAX_PRECISION {
                return Err(EngineError::InvalidPrecision {
                    places,
                    max: MAX_PRECISION,
                });
            }
        }
        if self.marginals.is_none() {
            let topology = Arc::clone(&self.topology);
            let mut all = Marginals::new();
            for (var, info) in topology.variables().iter().enumerate() {
                let mut row = BTreeMap::new();
                for (state, label) in info.states.iter().enumerate() {
                    let p = match self.evidence.get(&var).copied() {
                        Some(observed) if observed == state => 1.0,
                        Some(_) => 0.0,
                        None => self.infer_resolved(&[(var, state)])?,
                    };
                    row.insert(label.clone(), p);
                }
                all.insert(info.name.clone(), row);
            }
            self.marginals = Some(all);
        }
        let cached = self
            .marginals
            .as_ref()
            .ok_or_else(|| EngineError::Internal("marginal cache missing".into()))?;
        Ok(match options.precision {
            Some(places) if places > 0 => round_marginals(cached, places),
            _ => cached.clone(),
        })
    }

    /// P(current evidence) under the network's joint distribution.
    pub fn evidence_probability(&mut self) -> Result<f64> {
        self.ensure_propagated()?;
        Ok(self.propagated.as_ref().map_or(0.0, Propagated::evidence_mass))
    }

    /// Normalized clique tables after propagation, by clique id.
    pub fn clique_tables(&mut self) -> Result<&[Potential]> {
        self.ensure_propagated()?;
        self.propagated
            .as_ref()
            .map(|p| p.tables.as_slice())
            .ok_or_else(|| EngineError::Internal("propagation missing".into()))
    }

    // ---- internals ----

    fn var(&self, name: &str) -> Result<usize> {
        self.topology
            .index_of(name)
            .ok_or_else(|| EngineError::UnknownVariable(name.to_string()))
    }

    fn resolve<I, K, V>(&self, pairs: I) -> Result<Vec<(usize, usize)>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(name, state)| {
                let (name, state) = (name.as_ref(), state.as_ref());
                let var = self.var(name)?;
                let idx = self.topology.variable(var).state_index(state).ok_or_else(|| {
                    EngineError::UnknownState {
                        variable: name.to_string(),
                        state: state.to_string(),
                    }
                })?;
                Ok((var, idx))
            })
            .collect()
    }

    fn infer_resolved(&mut self, pairs: &[(usize, usize)]) -> Result<f64> {
        let mut event: BTreeMap<usize, usize> = BTreeMap::new();
        for &(var, state) in pairs {
            if let Some(previous) = event.insert(var, state) {
                if previous != state {
                    return Ok(0.0);
                }
            }
        }
        self.ensure_propagated()?;
        let propagated = self
            .propagated
            .as_ref()
            .ok_or_else(|| EngineError::Internal("propagation missing".into()))?;

        let vars: Vec<usize> = event.keys().copied().collect();
        let fixed: Vec<(usize, usize)> = event.iter().map(|(&v, &s)| (v, s)).collect();
        if let Some(clique) = self.topology.covering_clique(&vars) {
            let p = propagated.tables[clique].sum_matching(&fixed);
            trace!(clique, p, "event answered from clique");
            return Ok(p);
        }

        // No single clique holds the event: P(e | ev) = P(e, ev) / P(ev),
        // multiplied over the components the event touches.
        let mut combined = self.evidence.clone();
        for (&var, &state) in &event {
            if let Some(&observed) = combined.get(&var) {
                if observed != state {
                    return Ok(0.0);
                }
            }
            combined.insert(var, state);
        }
        let touched: BTreeSet<usize> = vars
            .iter()
            .map(|&v| self.topology.component_of(v))
            .collect();
        if touched.iter().any(|&c| propagated.component_mass[c] == 0.0) {
            trace!(?touched, "event touches a component with impossible evidence");
            return Ok(0.0);
        }
        let mut tables = initial_potentials(&self.topology, &self.factors, &combined);
        let joint = collect_mass(&self.topology, &mut tables, self.traversal)?;
        let p: f64 = touched.iter().map(|&c| joint[c] / propagated.component_mass[c]).product();
        trace!(?touched, p, "event answered by evidence ratio");
        Ok(p)
    }

    fn ensure_propagated(&mut self) -> Result<()> {
        if self.propagated.is_some() {
            return Ok(());
        }
        let mut tables = initial_potentials(&self.topology, &self.factors, &self.evidence);
        let result = propagate(&self.topology, &mut tables, self.traversal)?;
        normalize_all(&mut tables);
        let evidence_mass = result.evidence_mass();
        debug!(
            cliques = tables.len(),
            observed = self.evidence.len(),
            evidence_mass,
            traversal = %self.traversal,
            "potentials recomputed"
        );
        self.propagated = Some(Propagated {
            tables,
            component_mass: result.component_mass,
        });
        Ok(())
    }

    fn invalidate(&mut self) {
        self.propagated = None;
        self.marginals = None;
    }
}

fn round_marginals(marginals: &Marginals, places: u32) -> Marginals {
    let scale = 10f64.powi(places as i32);
    marginals
        .iter()
        .map(|(name, row)| {
            let row = row
                .iter()
                .map(|(state, p)| (state.clone(), (p * scale).round() / scale))
                .collect();
            (name.clone(), row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jt_config::Node;

    /// RAIN → SPRINKLER, {RAIN, SPRINKLER} → GRASS_WET.
    fn sprinkler() -> Network {
        let mut net = Network::new();
        net.insert("RAIN", Node::leaf(["T", "F"], &[0.2, 0.8]));
        net.insert(
            "SPRINKLER",
            Node::conditional(
                ["T", "F"],
                ["RAIN"],
                &[(&["T"], &[0.01, 0.99]), (&["F"], &[0.4, 0.6])],
            ),
        );
        net.insert(
            "GRASS_WET",
            Node::conditional(
                ["T", "F"],
                ["SPRINKLER", "RAIN"],
                &[
                    (&["F", "F"], &[0.0, 1.0]),
                    (&["F", "T"], &[0.8, 0.2]),
                    (&["T", "F"], &[0.9, 0.1]),
                    (&["T", "T"], &[0.99, 0.01]),
                ],
            ),
        );
        net
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_prior_marginals() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        assert!(close(engine.infer([("RAIN", "T")]).unwrap(), 0.2));
        assert!(close(engine.infer([("SPRINKLER", "T")]).unwrap(), 0.322));
        assert!(close(engine.infer([("GRASS_WET", "T")]).unwrap(), 0.44838));
    }

    #[test]
    fn test_evidence_changes_posterior() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        engine.set_evidence([("RAIN", "T")]).unwrap();
        assert!(close(engine.infer([("SPRINKLER", "T")]).unwrap(), 0.01));
        let all = engine.infer_all(InferAllOptions::default()).unwrap();
        assert_eq!(all["RAIN"]["T"], 1.0);
        assert_eq!(all["RAIN"]["F"], 0.0);
    }

    #[test]
    fn test_unknown_names_rejected_without_mutation() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        engine.set_evidence([("RAIN", "T")]).unwrap();
        let err = engine
            .set_evidence([("RAIN", "F"), ("FOG", "T")])
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownVariable("FOG".into()));
        let err = engine.update_evidence([("RAIN", "MAYBE")]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownState { .. }));
        assert_eq!(engine.evidence()["RAIN"], "T");
        assert!(matches!(
            engine.remove_evidence(["FOG"]),
            Err(EngineError::UnknownVariable(_))
        ));
        assert!(engine.has_evidence_for("RAIN").unwrap());
    }

    #[test]
    fn test_empty_and_contradictory_events() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let none: [(&str, &str); 0] = [];
        assert_eq!(engine.infer(none).unwrap_err(), EngineError::EmptyEvent);
        assert_eq!(engine.infer([("RAIN", "T"), ("RAIN", "F")]).unwrap(), 0.0);
    }

    #[test]
    fn test_conditional_matches_evidence() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let p = engine
            .conditional([("SPRINKLER", "T")], [("RAIN", "T")])
            .unwrap();
        assert!(close(p, 0.01));
        let none: [(&str, &str); 0] = [];
        let q = engine.conditional([("RAIN", "T")], none).unwrap();
        assert!(close(q, 0.2));
    }

    #[test]
    fn test_conditional_on_impossible_is_nan() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        // GRASS_WET=T is impossible when neither rain nor sprinkler.
        engine
            .set_evidence([("RAIN", "F"), ("SPRINKLER", "F")])
            .unwrap();
        let p = engine
            .conditional([("RAIN", "F")], [("GRASS_WET", "T")])
            .unwrap();
        assert!(p.is_nan());
    }

    #[test]
    fn test_update_and_remove_report_changes() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        assert!(!engine.remove_all_evidence());
        engine.update_evidence([("RAIN", "T")]).unwrap();
        engine.update_evidence([("GRASS_WET", "F")]).unwrap();
        assert_eq!(engine.evidence().len(), 2);
        assert!(!engine.remove_evidence(["SPRINKLER"]).unwrap());
        assert!(engine.remove_evidence(["RAIN"]).unwrap());
        assert!(engine.remove_all_evidence());
        assert!(engine.evidence().is_empty());
    }

    #[test]
    fn test_set_distribution_invalidates() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        assert!(close(engine.infer([("RAIN", "T")]).unwrap(), 0.2));
        let cpt = Node::leaf(["T", "F"], &[0.5, 0.5]).cpt;
        engine.set_distribution("RAIN", cpt.clone()).unwrap();
        assert_eq!(engine.distribution("RAIN").unwrap(), cpt);
        assert!(close(engine.infer([("RAIN", "T")]).unwrap(), 0.5));
    }

    #[test]
    fn test_set_distribution_mismatch_keeps_old() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let before = engine.distribution("RAIN").unwrap();
        let wrong_states = Node::leaf(["YES", "NO"], &[0.5, 0.5]).cpt;
        assert!(matches!(
            engine.set_distribution("RAIN", wrong_states),
            Err(EngineError::DistributionMismatch { .. })
        ));
        let wrong_parents = Node::conditional(
            ["T", "F"],
            ["GRASS_WET"],
            &[(&["T"], &[0.5, 0.5]), (&["F"], &[0.5, 0.5])],
        )
        .cpt;
        assert!(engine.set_distribution("SPRINKLER", wrong_parents).is_err());
        assert_eq!(engine.distribution("RAIN").unwrap(), before);
        assert!(close(engine.infer([("RAIN", "T")]).unwrap(), 0.2));
    }

    #[test]
    fn test_introspection() {
        let engine = InferenceEngine::new(sprinkler()).unwrap();
        assert_eq!(engine.variables(), vec!["GRASS_WET", "RAIN", "SPRINKLER"]);
        assert!(engine.has_parent("GRASS_WET", "RAIN").unwrap());
        assert!(!engine.has_parent("RAIN", "GRASS_WET").unwrap());
        assert_eq!(engine.levels("RAIN").unwrap(), &["T".to_string(), "F".to_string()]);
        assert!(engine.has_level("RAIN", "F").unwrap());
        assert!(!engine.has_variable("FOG"));
        assert!(engine.parents("FOG").is_err());
    }

    #[test]
    fn test_shared_topology() {
        let first = InferenceEngine::new(sprinkler()).unwrap();
        let mut reweighted = sprinkler();
        reweighted.insert("RAIN", Node::leaf(["T", "F"], &[0.6, 0.4]));
        let mut second = InferenceEngine::with_topology(reweighted, first.topology()).unwrap();
        assert!(close(second.infer([("RAIN", "T")]).unwrap(), 0.6));

        let mut other = sprinkler();
        other.insert("FOG", Node::leaf(["T", "F"], &[0.5, 0.5]));
        assert_eq!(
            InferenceEngine::with_topology(other, first.topology()).unwrap_err(),
            EngineError::TopologyMismatch
        );
    }

    #[test]
    fn test_precision_rounds_copy_only() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let rounded = engine
            .infer_all(InferAllOptions { precision: Some(2) })
            .unwrap();
        assert_eq!(rounded["GRASS_WET"]["T"], 0.45);
        let raw = engine.infer_all(InferAllOptions::default()).unwrap();
        assert!(close(raw["GRASS_WET"]["T"], 0.44838));
    }

    #[test]
    fn test_zero_precision_is_unrounded() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let zero = engine
            .infer_all(InferAllOptions { precision: Some(0) })
            .unwrap();
        assert_eq!(zero, engine.infer_all(InferAllOptions::default()).unwrap());
        assert!(close(zero["GRASS_WET"]["T"], 0.44838));
    }

    #[test]
    fn test_precision_bounds() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        let finest = engine
            .infer_all(InferAllOptions {
                precision: Some(MAX_PRECISION),
            })
            .unwrap();
        assert!(finest.values().flat_map(|row| row.values()).all(|p| p.is_finite()));
        for places in [MAX_PRECISION + 1, 400] {
            let err = engine
                .infer_all(InferAllOptions {
                    precision: Some(places),
                })
                .unwrap_err();
            assert_eq!(
                err,
                EngineError::InvalidPrecision {
                    places,
                    max: MAX_PRECISION
                }
            );
        }
    }

    #[test]
    fn test_impossible_evidence_stays_in_its_component() {
        let mut net = sprinkler();
        net.insert("COIN", Node::leaf(["H", "T"], &[0.3, 0.7]));
        net.insert("X", Node::leaf(["t", "f"], &[0.5, 0.5]));
        net.insert(
            "Y",
            Node::conditional(["t", "f"], ["X"], &[(&["t"], &[0.9, 0.1]), (&["f"], &[0.2, 0.8])]),
        );
        net.insert(
            "Z",
            Node::conditional(["t", "f"], ["Y"], &[(&["t"], &[0.7, 0.3]), (&["f"], &[0.1, 0.9])]),
        );
        let mut engine = InferenceEngine::new(net).unwrap();
        engine
            .set_evidence([("RAIN", "F"), ("SPRINKLER", "F"), ("GRASS_WET", "T")])
            .unwrap();
        assert_eq!(engine.evidence_probability().unwrap(), 0.0);

        assert!(close(engine.infer([("COIN", "H")]).unwrap(), 0.3));
        // X and Z share no clique.
        assert!(close(engine.infer([("X", "t"), ("Z", "t")]).unwrap(), 0.32));
        assert!(close(engine.infer([("COIN", "H"), ("X", "t")]).unwrap(), 0.15));

        assert_eq!(engine.infer([("RAIN", "T")]).unwrap(), 0.0);
        assert_eq!(engine.infer([("COIN", "H"), ("RAIN", "F")]).unwrap(), 0.0);

        let all = engine.infer_all(InferAllOptions::default()).unwrap();
        assert!(close(all["COIN"]["H"], 0.3));
        assert!(close(all["Z"]["t"], 0.5 * 0.64 + 0.5 * (0.2 * 0.7 + 0.8 * 0.1)));
    }

    #[test]
    fn test_evidence_probability() {
        let mut engine = InferenceEngine::new(sprinkler()).unwrap();
        assert!(close(engine.evidence_probability().unwrap(), 1.0));
        engine.set_evidence([("GRASS_WET", "T")]).unwrap();
        assert!(close(engine.evidence_probability().unwrap(), 0.44838));
    }
}
