//! Fuzz target for evidence and queries on generated networks.
//!
//! Builds a small DAG from the input, then checks that every answer is a
//! probability and that marginals sum to 1 under possible evidence.

#![no_main]

use arbitrary::Arbitrary;
use jt_core::inference::InferAllOptions;
use jt_core::{Cpt, CptRow, InferenceEngine, Network, Node, TraversalMode};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Debug, Arbitrary)]
struct Input {
    /// Per variable: (parent mask over earlier variables, extra states).
    shape: Vec<(u8, bool)>,
    weights: Vec<u8>,
    evidence: Vec<(u8, u8)>,
    event: Vec<(u8, u8)>,
    iterative: bool,
}

fn name(i: usize) -> String {
    format!("N{}", i)
}

fn build(input: &Input) -> Option<(Network, Vec<usize>)> {
    let n = input.shape.len().min(6);
    if n == 0 || input.weights.is_empty() {
        return None;
    }
    let cards: Vec<usize> = input.shape[..n].iter().map(|&(_, three)| if three { 3 } else { 2 }).collect();
    let mut cursor = 0usize;
    let mut weight = || {
        let w = f64::from(input.weights[cursor % input.weights.len()]) / 255.0;
        cursor += 1;
        w
    };
    let mut net = Network::new();
    for i in 0..n {
        let mask = input.shape[i].0;
        let parents: Vec<usize> = (0..i).filter(|j| mask & (1 << j) != 0).take(3).collect();
        let states: Vec<String> = (0..cards[i]).map(|s| format!("s{}", s)).collect();
        let mut rows = Vec::new();
        let mut assignment = vec![0usize; parents.len()];
        loop {
            let then: BTreeMap<String, f64> = states.iter().map(|s| (s.clone(), weight())).collect();
            if parents.is_empty() {
                net.insert(
                    name(i),
                    Node {
                        id: String::new(),
                        states: states.clone(),
                        parents: Vec::new(),
                        cpt: Cpt::Leaf(then),
                    },
                );
                break;
            }
            let when = parents
                .iter()
                .zip(&assignment)
                .map(|(&p, &s)| (name(p), format!("s{}", s)))
                .collect();
            rows.push(CptRow { when, then });
            let mut pos = parents.len();
            let done = loop {
                if pos == 0 {
                    break true;
                }
                pos -= 1;
                assignment[pos] += 1;
                if assignment[pos] < cards[parents[pos]] {
                    break false;
                }
                assignment[pos] = 0;
            };
            if done {
                net.insert(
                    name(i),
                    Node {
                        id: String::new(),
                        states: states.clone(),
                        parents: parents.iter().map(|&p| name(p)).collect(),
                        cpt: Cpt::Conditional(std::mem::take(&mut rows)),
                    },
                );
                break;
            }
        }
    }
    Some((net, cards))
}

fn assignments(pairs: &[(u8, u8)], cards: &[usize]) -> Vec<(String, String)> {
    pairs
        .iter()
        .take(4)
        .map(|&(v, s)| {
            let v = usize::from(v) % cards.len();
            (name(v), format!("s{}", usize::from(s) % cards[v]))
        })
        .collect()
}

fuzz_target!(|input: Input| {
    let Some((network, cards)) = build(&input) else {
        return;
    };
    let Ok(mut engine) = InferenceEngine::new(network) else {
        return;
    };
    if input.iterative {
        engine.set_traversal(TraversalMode::Iterative);
    }
    // Repeated variables in evidence keep the last state.
    let evidence = assignments(&input.evidence, &cards);
    engine
        .set_evidence(evidence.iter().map(|(k, v)| (k, v)))
        .expect("generated evidence names known states");

    let event = assignments(&input.event, &cards);
    if !event.is_empty() {
        let p = engine
            .infer(event.iter().map(|(k, v)| (k, v)))
            .expect("generated event names known states");
        assert!((-1e-9..=1.0 + 1e-9).contains(&p), "probability out of range: {}", p);
    }

    let possible = engine.evidence_probability().expect("propagates") > 1e-12;
    let marginals = engine
        .infer_all(InferAllOptions::default())
        .expect("marginals");
    if possible {
        for (var, row) in &marginals {
            let total: f64 = row.values().sum();
            assert!((total - 1.0).abs() < 1e-6, "{} sums to {}", var, total);
        }
    }
});
