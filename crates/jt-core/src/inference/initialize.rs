//! Potential initialization from CPT factors and evidence.

use std::collections::BTreeMap;

use jt_config::Cpt;

use super::potential::Potential;
use super::topology::CompiledTopology;
use crate::error::{EngineError, Result};

/// Dense CPT factor of `var` over its sorted family scope.
///
/// Each row holds P(var = state | parents) for the row's assignment. The
/// CPT must already have passed validation against the variable, so every
/// parent assignment has a row.
pub fn build_factor(topology: &CompiledTopology, var: usize, cpt: &Cpt) -> Result<Potential> {
    let info = topology.variable(var);
    let mut scope: Vec<usize> = info.parent_indices.clone();
    scope.push(var);
    scope.sort_unstable();
    let cards = topology.cardinalities(&scope);
    let mut factor = Potential::zeros(scope, cards);

    let mut given: BTreeMap<String, String> = BTreeMap::new();
    for row in 0..factor.len() {
        let states = factor.assignment(row);
        given.clear();
        let mut own_state = 0;
        for (&v, &s) in factor.scope().iter().zip(&states) {
            let vinfo = topology.variable(v);
            if v == var {
                own_state = s;
            } else {
                given.insert(vinfo.name.clone(), vinfo.states[s].clone());
            }
        }
        let p = cpt
            .probability(&info.states[own_state], &given)
            .ok_or_else(|| EngineError::DistributionMismatch {
                variable: info.name.clone(),
                reason: format!("no probability for state {:?} given {:?}", info.states[own_state], given),
            })?;
        factor.values_mut()[row] = p;
    }
    Ok(factor)
}

/// Fresh clique tables: product of the assigned factors, with rows that
/// contradict the evidence zeroed.
///
/// `factors` is indexed by variable; `evidence` maps variable → state.
pub fn initial_potentials(
    topology: &CompiledTopology,
    factors: &[Potential],
    evidence: &BTreeMap<usize, usize>,
) -> Vec<Potential> {
    (0..topology.clique_count())
        .map(|clique| {
            let scope = topology.clique_scope(clique).to_vec();
            let cards = topology.cardinalities(&scope);
            let mut table = Potential::ones(scope, cards);
            for var in topology.factors_in(clique) {
                table.absorb(&factors[var]);
            }
            for (&var, &state) in evidence {
                table.restrict(var, state);
            }
            table
        })
        .collect()
}
