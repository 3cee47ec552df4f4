//! Hugin-style collect/distribute propagation over the junction forest.
//!
//! Each connected component is rooted at its lowest clique id. Collect
//! pulls messages towards the root in post-order; distribute pushes them
//! back out in pre-order. A message is the sender's marginal on the
//! separator divided by the separator's previous potential (if any); the
//! undivided marginal becomes the new separator potential. Components never
//! exchange messages.

use tracing::trace;

use super::potential::Potential;
use super::topology::CompiledTopology;
use crate::error::{EngineError, Result};

pub use jt_config::TraversalMode;

/// Separator potentials recorded during propagation, by separator index.
#[derive(Debug, Clone, Default)]
pub struct SeparatorStore {
    tables: Vec<Option<Potential>>,
}

impl SeparatorStore {
    pub fn new(separators: usize) -> Self {
        Self {
            tables: vec![None; separators],
        }
    }

    pub fn get(&self, separator: usize) -> Option<&Potential> {
        self.tables.get(separator).and_then(Option::as_ref)
    }

    fn record(&mut self, separator: usize, table: Potential) {
        self.tables[separator] = Some(table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Outcome of propagating one set of clique tables.
#[derive(Debug, Clone)]
pub struct Propagation {
    pub separators: SeparatorStore,
    /// Total table mass per component after collect (component order).
    pub component_mass: Vec<f64>,
}

impl Propagation {
    /// Product of component masses: the probability of the evidence that
    /// was entered into the initial tables.
    pub fn evidence_mass(&self) -> f64 {
        self.component_mass.iter().product()
    }
}

/// Run collect then distribute on every component.
pub fn propagate(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    mode: TraversalMode,
) -> Result<Propagation> {
    let mut separators = SeparatorStore::new(topology.forest().separators.len());
    let component_mass = collect_all(topology, tables, &mut separators, mode)?;

    let mut visited = vec![false; tables.len()];
    for root in topology.forest().roots() {
        visited[root] = true;
        match mode {
            TraversalMode::Recursive => {
                distribute_recursive(topology, tables, &mut separators, root, &mut visited)?
            }
            TraversalMode::Iterative => {
                distribute_iterative(topology, tables, &mut separators, root, &mut visited)?
            }
        }
    }

    trace!(
        components = component_mass.len(),
        separators = separators.len(),
        "propagation finished"
    );
    Ok(Propagation {
        separators,
        component_mass,
    })
}

/// Collect only; returns each component's mass. Enough for evidence
/// probabilities, which do not need the distribute pass.
pub fn collect_mass(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    mode: TraversalMode,
) -> Result<Vec<f64>> {
    let mut separators = SeparatorStore::new(topology.forest().separators.len());
    collect_all(topology, tables, &mut separators, mode)
}

fn collect_all(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    mode: TraversalMode,
) -> Result<Vec<f64>> {
    if tables.len() != topology.clique_count() {
        return Err(EngineError::Internal(format!(
            "{} tables for {} cliques",
            tables.len(),
            topology.clique_count()
        )));
    }
    let mut visited = vec![false; tables.len()];
    let mut masses = Vec::new();
    for root in topology.forest().roots() {
        match mode {
            TraversalMode::Recursive => {
                collect_recursive(topology, tables, separators, root, None, &mut visited)?
            }
            TraversalMode::Iterative => {
                collect_iterative(topology, tables, separators, root, &mut visited)?
            }
        }
        masses.push(tables[root].sum());
    }
    Ok(masses)
}

/// Send one message from `from` to `to` across `separator`.
fn pass_message(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    from: usize,
    to: usize,
    separator: usize,
) {
    let marginal = tables[from].marginalize(topology.separator_scope(separator));
    let message = match separators.get(separator) {
        Some(previous) => marginal.divide(previous),
        None => marginal.clone(),
    };
    tables[to].absorb(&message);
    separators.record(separator, marginal);
}

fn collect_recursive(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    clique: usize,
    parent: Option<(usize, usize)>,
    visited: &mut [bool],
) -> Result<()> {
    visited[clique] = true;
    for &(next, sep) in topology.forest().neighbors(clique)? {
        if !visited[next] {
            collect_recursive(topology, tables, separators, next, Some((clique, sep)), visited)?;
        }
    }
    if let Some((up, sep)) = parent {
        pass_message(topology, tables, separators, clique, up, sep);
    }
    Ok(())
}

fn distribute_recursive(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    clique: usize,
    visited: &mut [bool],
) -> Result<()> {
    for &(next, sep) in topology.forest().neighbors(clique)? {
        if !visited[next] {
            visited[next] = true;
            pass_message(topology, tables, separators, clique, next, sep);
            distribute_recursive(topology, tables, separators, next, visited)?;
        }
    }
    Ok(())
}

/// Stack frame: clique, link to its parent, and the next neighbor slot.
struct Frame {
    clique: usize,
    parent: Option<(usize, usize)>,
    cursor: usize,
}

/// Same visiting order as [`collect_recursive`], on an explicit stack.
fn collect_iterative(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    root: usize,
    visited: &mut [bool],
) -> Result<()> {
    visited[root] = true;
    let mut stack = vec![Frame {
        clique: root,
        parent: None,
        cursor: 0,
    }];
    while let Some(frame) = stack.last_mut() {
        let neighbors = topology.forest().neighbors(frame.clique)?;
        if let Some(&(next, sep)) = neighbors.get(frame.cursor) {
            frame.cursor += 1;
            if !visited[next] {
                visited[next] = true;
                let parent = Some((frame.clique, sep));
                stack.push(Frame {
                    clique: next,
                    parent,
                    cursor: 0,
                });
            }
            continue;
        }
        let done = stack.pop().ok_or_else(|| EngineError::Internal("empty stack".into()))?;
        if let Some((up, sep)) = done.parent {
            pass_message(topology, tables, separators, done.clique, up, sep);
        }
    }
    Ok(())
}

/// Same visiting order as [`distribute_recursive`], on an explicit stack.
fn distribute_iterative(
    topology: &CompiledTopology,
    tables: &mut [Potential],
    separators: &mut SeparatorStore,
    root: usize,
    visited: &mut [bool],
) -> Result<()> {
    let mut stack = vec![(root, 0usize)];
    while let Some((clique, cursor)) = stack.last_mut() {
        let neighbors = topology.forest().neighbors(*clique)?;
        let Some(&(next, sep)) = neighbors.get(*cursor) else {
            stack.pop();
            continue;
        };
        *cursor += 1;
        if !visited[next] {
            visited[next] = true;
            let from = *clique;
            pass_message(topology, tables, separators, from, next, sep);
            stack.push((next, 0));
        }
    }
    Ok(())
}

/// Normalize every clique table in place.
pub fn normalize_all(tables: &mut [Potential]) {
    for table in tables {
        table.normalize();
    }
}

/// Largest gap between a clique's marginal on a separator and the recorded
/// separator potential, over all accepted separators.
pub fn consistency_gap(
    topology: &CompiledTopology,
    tables: &[Potential],
    separators: &SeparatorStore,
) -> f64 {
    let mut gap = 0.0f64;
    for (idx, sep) in topology.forest().separators.iter().enumerate() {
        let Some(recorded) = separators.get(idx) else {
            continue;
        };
        let scope = topology.separator_scope(idx);
        for clique in [sep.a, sep.b] {
            gap = gap.max(tables[clique].marginalize(scope).max_abs_diff(recorded));
        }
    }
    gap
}
