//! Interchangeable inference back ends.
//!
//! [`InferenceEngine`] answers queries from the junction forest;
//! [`EnumerationStrategy`] sums the full joint table and serves as a
//! reference on small networks.

use std::collections::BTreeMap;

use jt_config::{validate_network, Network};

use super::engine::InferenceEngine;
use crate::error::{EngineError, Result};

/// Largest joint table [`EnumerationStrategy`] accepts by default.
pub const DEFAULT_ENUMERATION_LIMIT: u128 = 1 << 20;

/// Posterior queries over a fixed network.
pub trait InferenceStrategy {
    fn name(&self) -> &'static str;

    /// Replace all evidence.
    fn set_evidence(&mut self, evidence: &BTreeMap<String, String>) -> Result<()>;

    /// P(event | evidence).
    fn infer(&mut self, event: &BTreeMap<String, String>) -> Result<f64>;
}

impl InferenceStrategy for InferenceEngine {
    fn name(&self) -> &'static str {
        "junction_tree"
    }

    fn set_evidence(&mut self, evidence: &BTreeMap<String, String>) -> Result<()> {
        InferenceEngine::set_evidence(self, evidence)
    }

    fn infer(&mut self, event: &BTreeMap<String, String>) -> Result<f64> {
        InferenceEngine::infer(self, event)
    }
}

/// Brute-force enumeration of the joint distribution.
#[derive(Debug, Clone)]
pub struct EnumerationStrategy {
    network: Network,
    /// Variable names in sorted order.
    names: Vec<String>,
    evidence: BTreeMap<usize, usize>,
}

impl EnumerationStrategy {
    pub fn new(network: Network) -> Result<Self> {
        Self::with_limit(network, DEFAULT_ENUMERATION_LIMIT)
    }

    /// Reject networks whose joint table has more than `limit` rows.
    pub fn with_limit(network: Network, limit: u128) -> Result<Self> {
        validate_network(&network)?;
        let rows = network
            .nodes()
            .map(|(_, node)| node.states.len() as u128)
            .try_fold(1u128, |acc, n| acc.checked_mul(n))
            .unwrap_or(u128::MAX);
        if rows > limit {
            return Err(EngineError::EnumerationLimit { rows, limit });
        }
        let names = network.names().map(str::to_string).collect();
        Ok(Self {
            network,
            names,
            evidence: BTreeMap::new(),
        })
    }

    fn resolve(&self, pairs: &BTreeMap<String, String>) -> Result<BTreeMap<usize, usize>> {
        pairs
            .iter()
            .map(|(name, state)| {
                let var = self
                    .names
                    .binary_search(name)
                    .map_err(|_| EngineError::UnknownVariable(name.clone()))?;
                let node = self
                    .network
                    .get(name)
                    .ok_or_else(|| EngineError::UnknownVariable(name.clone()))?;
                let idx = node.state_index(state).ok_or_else(|| EngineError::UnknownState {
                    variable: name.clone(),
                    state: state.clone(),
                })?;
                Ok((var, idx))
            })
            .collect()
    }

    /// Probability of one full assignment (state index per variable).
    fn joint(&self, assignment: &[usize]) -> Result<f64> {
        let mut p = 1.0;
        let mut given = BTreeMap::new();
        for (var, name) in self.names.iter().enumerate() {
            let node = self
                .network
                .get(name)
                .ok_or_else(|| EngineError::UnknownVariable(name.clone()))?;
            given.clear();
            for parent in &node.parents {
                let pvar = self
                    .names
                    .binary_search(parent)
                    .map_err(|_| EngineError::UnknownVariable(parent.clone()))?;
                let pnode = self
                    .network
                    .get(parent)
                    .ok_or_else(|| EngineError::UnknownVariable(parent.clone()))?;
                given.insert(parent.clone(), pnode.states[assignment[pvar]].clone());
            }
            let state = &node.states[assignment[var]];
            p *= node.cpt.probability(state, &given).ok_or_else(|| {
                EngineError::DistributionMismatch {
                    variable: name.clone(),
                    reason: format!("no probability for {} given {:?}", state, given),
                }
            })?;
            if p == 0.0 {
                break;
            }
        }
        Ok(p)
    }
}

impl InferenceStrategy for EnumerationStrategy {
    fn name(&self) -> &'static str {
        "enumeration"
    }

    fn set_evidence(&mut self, evidence: &BTreeMap<String, String>) -> Result<()> {
        self.evidence = self.resolve(evidence)?;
        Ok(())
    }

    fn infer(&mut self, event: &BTreeMap<String, String>) -> Result<f64> {
        let event = self.resolve(event)?;
        if event.is_empty() {
            return Err(EngineError::EmptyEvent);
        }
        let cards: Vec<usize> = self
            .names
            .iter()
            .map(|n| self.network.get(n).map_or(0, |node| node.states.len()))
            .collect();

        let agrees = |fixed: &BTreeMap<usize, usize>, assignment: &[usize]| {
            fixed.iter().all(|(&v, &s)| assignment[v] == s)
        };

        let mut evidence_mass = 0.0;
        let mut event_mass = 0.0;
        let mut assignment = vec![0usize; cards.len()];
        loop {
            if agrees(&self.evidence, &assignment) {
                let p = self.joint(&assignment)?;
                evidence_mass += p;
                if agrees(&event, &assignment) {
                    event_mass += p;
                }
            }
            // Odometer, last variable fastest.
            let mut pos = cards.len();
            loop {
                if pos == 0 {
                    return Ok(if evidence_mass == 0.0 {
                        0.0
                    } else {
                        event_mass / evidence_mass
                    });
                }
                pos -= 1;
                assignment[pos] += 1;
                if assignment[pos] < cards[pos] {
                    break;
                }
                assignment[pos] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jt_config::Node;

    fn pair() -> Network {
        let mut net = Network::new();
        net.insert("A", Node::leaf(["t", "f"], &[0.3, 0.7]));
        net.insert(
            "B",
            Node::conditional(["t", "f"], ["A"], &[(&["t"], &[0.9, 0.1]), (&["f"], &[0.2, 0.8])]),
        );
        net
    }

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_enumeration_prior_and_posterior() {
        let mut oracle = EnumerationStrategy::new(pair()).unwrap();
        assert_eq!(oracle.name(), "enumeration");
        let p = oracle.infer(&query(&[("B", "t")])).unwrap();
        assert!((p - (0.3 * 0.9 + 0.7 * 0.2)).abs() < 1e-12);

        oracle.set_evidence(&query(&[("B", "t")])).unwrap();
        let p = oracle.infer(&query(&[("A", "t")])).unwrap();
        assert!((p - 0.27 / 0.41).abs() < 1e-12);
    }

    #[test]
    fn test_strategies_agree() {
        let mut engine = InferenceEngine::new(pair()).unwrap();
        let mut oracle = EnumerationStrategy::new(pair()).unwrap();
        let strategies: [&mut dyn InferenceStrategy; 2] = [&mut engine, &mut oracle];
        let mut answers = Vec::new();
        for s in strategies {
            s.set_evidence(&query(&[("B", "f")])).unwrap();
            answers.push(s.infer(&query(&[("A", "f")])).unwrap());
        }
        assert!((answers[0] - answers[1]).abs() < 1e-12);
    }

    #[test]
    fn test_limit_enforced() {
        let err = EnumerationStrategy::with_limit(pair(), 3).unwrap_err();
        assert_eq!(err, EngineError::EnumerationLimit { rows: 4, limit: 3 });
    }

    #[test]
    fn test_empty_event_and_unknown_names() {
        let mut oracle = EnumerationStrategy::new(pair()).unwrap();
        assert_eq!(oracle.infer(&BTreeMap::new()).unwrap_err(), EngineError::EmptyEvent);
        assert!(matches!(
            oracle.set_evidence(&query(&[("Z", "t")])),
            Err(EngineError::UnknownVariable(_))
        ));
    }
}
