//! Selection strategies.
//!
//! A [`SelectionStrategy`] picks one node out of a tick's candidate list. The
//! tree hands it its own seeded random source, so a strategy that draws from
//! `rng` stays reproducible under a fixed seed. Every strategy returns `None`
//! for an empty candidate list.
//!
//! Closures with the matching signature are strategies too:
//!
//! ```
//! use umbra_events::prelude::*;
//! use rand::RngCore;
//!
//! let mut last = |candidates: &[NodeId], _graph: &NodeGraph, _rng: &mut dyn RngCore| {
//!     candidates.last().copied()
//! };
//! # let graph = TreeBuilder::new().finish();
//! # let mut rng = rand_pcg::Pcg64::new(0, 0);
//! let a = NodeId::from_raw(1);
//! let b = NodeId::from_raw(2);
//! assert_eq!(last.select(&[a, b], &graph, &mut rng), Some(b));
//! ```

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::graph::NodeGraph;
use crate::node::NodeId;

/// Picks the node to activate from a candidate list.
pub trait SelectionStrategy {
    fn select(
        &mut self,
        candidates: &[NodeId],
        graph: &NodeGraph,
        rng: &mut dyn RngCore,
    ) -> Option<NodeId>;
}

impl<F> SelectionStrategy for F
where
    F: FnMut(&[NodeId], &NodeGraph, &mut dyn RngCore) -> Option<NodeId>,
{
    fn select(
        &mut self,
        candidates: &[NodeId],
        graph: &NodeGraph,
        rng: &mut dyn RngCore,
    ) -> Option<NodeId> {
        self(candidates, graph, rng)
    }
}

// ---------------------------------------------------------------------------
// UniformRandom
// ---------------------------------------------------------------------------

/// Every candidate is equally likely. The default for both branches.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandom;

impl SelectionStrategy for UniformRandom {
    fn select(
        &mut self,
        candidates: &[NodeId],
        _graph: &NodeGraph,
        rng: &mut dyn RngCore,
    ) -> Option<NodeId> {
        candidates.choose(rng).copied()
    }
}

// ---------------------------------------------------------------------------
// FirstCandidate
// ---------------------------------------------------------------------------

/// Always the first candidate in depth-first order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl SelectionStrategy for FirstCandidate {
    fn select(
        &mut self,
        candidates: &[NodeId],
        _graph: &NodeGraph,
        _rng: &mut dyn RngCore,
    ) -> Option<NodeId> {
        candidates.first().copied()
    }
}

// ---------------------------------------------------------------------------
// Fixed
// ---------------------------------------------------------------------------

/// Always one particular node, whenever it is a candidate.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub NodeId);

impl SelectionStrategy for Fixed {
    fn select(
        &mut self,
        candidates: &[NodeId],
        _graph: &NodeGraph,
        _rng: &mut dyn RngCore,
    ) -> Option<NodeId> {
        candidates.contains(&self.0).then_some(self.0)
    }
}

// ---------------------------------------------------------------------------
// Weighted
// ---------------------------------------------------------------------------

/// Candidates are drawn proportionally to a per-node weight. Nodes without
/// an explicit weight use `default_weight`. Returns `None` when every
/// candidate weighs zero.
#[derive(Debug, Clone)]
pub struct Weighted {
    weights: HashMap<NodeId, f64>,
    default_weight: f64,
}

impl Default for Weighted {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: 1.0,
        }
    }
}

impl Weighted {
    pub fn new(default_weight: f64) -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: sanitize(default_weight),
        }
    }

    /// Set the weight of one node. Negative and non-finite weights count as
    /// zero.
    pub fn with_weight(mut self, node: NodeId, weight: f64) -> Self {
        self.weights.insert(node, sanitize(weight));
        self
    }

    pub fn weight_of(&self, node: NodeId) -> f64 {
        self.weights.get(&node).copied().unwrap_or(self.default_weight)
    }
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

impl SelectionStrategy for Weighted {
    fn select(
        &mut self,
        candidates: &[NodeId],
        _graph: &NodeGraph,
        rng: &mut dyn RngCore,
    ) -> Option<NodeId> {
        let weights: Vec<f64> = candidates.iter().map(|id| self.weight_of(*id)).collect();
        let dist = WeightedIndex::new(&weights).ok()?;
        candidates.get(dist.sample(rng)).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TreeBuilder;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn ids(raw: &[u32]) -> Vec<NodeId> {
        raw.iter().map(|r| NodeId::from_raw(*r)).collect()
    }

    fn graph() -> NodeGraph {
        TreeBuilder::new().finish()
    }

    #[test]
    fn every_strategy_yields_none_for_empty_candidates() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(1);
        assert_eq!(UniformRandom.select(&[], &g, &mut rng), None);
        assert_eq!(FirstCandidate.select(&[], &g, &mut rng), None);
        assert_eq!(Fixed(NodeId::from_raw(1)).select(&[], &g, &mut rng), None);
        assert_eq!(Weighted::default().select(&[], &g, &mut rng), None);
    }

    #[test]
    fn uniform_random_picks_a_candidate_and_covers_all() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(99);
        let candidates = ids(&[3, 5, 8]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let pick = UniformRandom.select(&candidates, &g, &mut rng).unwrap();
            assert!(candidates.contains(&pick));
            seen.insert(pick);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn uniform_random_is_reproducible_under_a_seed() {
        let g = graph();
        let candidates = ids(&[1, 2, 3, 4, 5, 6]);
        let draw = |seed| {
            let mut rng = Pcg64::seed_from_u64(seed);
            (0..20)
                .map(|_| UniformRandom.select(&candidates, &g, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
    }

    #[test]
    fn fixed_only_returns_its_node_when_eligible() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(1);
        let target = NodeId::from_raw(4);
        assert_eq!(
            Fixed(target).select(&ids(&[2, 4]), &g, &mut rng),
            Some(target)
        );
        assert_eq!(Fixed(target).select(&ids(&[2, 3]), &g, &mut rng), None);
    }

    #[test]
    fn weighted_never_picks_zero_weight_nodes() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(3);
        let candidates = ids(&[1, 2, 3]);
        let mut strategy = Weighted::default()
            .with_weight(NodeId::from_raw(1), 0.0)
            .with_weight(NodeId::from_raw(3), -4.0);
        for _ in 0..100 {
            assert_eq!(
                strategy.select(&candidates, &g, &mut rng),
                Some(NodeId::from_raw(2))
            );
        }
    }

    #[test]
    fn weighted_all_zero_yields_none() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(3);
        let mut strategy = Weighted::new(0.0);
        assert_eq!(strategy.select(&ids(&[1, 2]), &g, &mut rng), None);
    }

    #[test]
    fn closures_are_strategies() {
        let g = graph();
        let mut rng = Pcg64::seed_from_u64(3);
        let mut calls = 0;
        let mut strategy = |c: &[NodeId], _: &NodeGraph, _: &mut dyn RngCore| {
            calls += 1;
            c.last().copied()
        };
        assert_eq!(
            strategy.select(&ids(&[1, 9]), &g, &mut rng),
            Some(NodeId::from_raw(9))
        );
        assert_eq!(calls, 1);
    }
}
