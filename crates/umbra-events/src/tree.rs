//! The activation tree: periodic selection and per-frame ghost reversion.
//!
//! Each [`ActivationTree::tick`]:
//!
//! 1. Calls `update` on every node (depth-first, root excluded). A behavior
//!    that asks for its own restore is restored on the spot.
//! 2. Rebuilds `activated_nodes` and `children_of_activated`.
//! 3. Draws `u ∈ [0, 1)`. Below `ghost_event_chance` the tick takes the
//!    ghost branch and selects from `nodes_with_no_active_parent`; otherwise
//!    it selects from `children_of_activated`. The pick is activated with the
//!    matching ghost flag.
//! 4. Seeds a reversion timer for every ghost-active node whose parent is
//!    active and not a ghost, unless one is already running.
//!
//! Each [`ActivationTree::frame`] runs node-internal timers and counts the
//! reversion timers down. A timer whose node was restored in the meantime is
//! dropped silently; a timer reaching zero turns the ghost activation into a
//! normal one.
//!
//! # Example
//!
//! ```
//! use umbra_events::prelude::*;
//!
//! let mut builder = TreeBuilder::new();
//! let cellar = builder.add_top_level("cellar", Vec2::ZERO, AlwaysActiveNode);
//! let lamp = builder
//!     .add_node(cellar, "lamp", Vec2::new(1.0, 0.0), AudioAnimationNode::looping())
//!     .unwrap();
//! builder.preactivate(cellar).unwrap();
//!
//! builder.set_initial_state(lamp, NodeState::new(true, true)).unwrap();
//!
//! let config = TreeConfig {
//!     ghost_event_chance: 0.0,
//!     ghost_to_normal_seconds: Some(2.0),
//!     seed: Some(1),
//!     ..Default::default()
//! };
//! let mut tree = ActivationTree::new(builder.finish(), config).unwrap();
//!
//! tree.tick();
//! assert!(tree.state(lamp).unwrap().is_ghost_active());
//! assert_eq!(tree.ghost_timer(lamp), Some(2.0));
//!
//! tree.frame(1.0);
//! tree.frame(1.0);
//! assert!(tree.state(lamp).unwrap().is_normal_active());
//! ```

use std::collections::{BTreeMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{debug, trace, warn};

use crate::config::TreeConfig;
use crate::graph::NodeGraph;
use crate::node::{NodeBehavior, NodeId, NodeRequest, NodeState, QueuedCue, Vec2};
use crate::selection::{SelectionStrategy, UniformRandom};
use crate::TreeError;

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

/// Which candidate set a tick selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Branch {
    Normal,
    Ghost,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TickOutcome {
    /// 1-based number of this tick.
    pub tick: u64,
    pub branch: Branch,
    /// The node that was activated, if the strategy picked one.
    pub activated: Option<NodeId>,
    /// Nodes that restored themselves during the update phase.
    pub self_restored: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// ActivationTree
// ---------------------------------------------------------------------------

/// Owns a scene's node graph and drives its activation.
///
/// Behaviors emit [`QueuedCue`]s into a queue the tree does not empty on its
/// own. [`AmbientAudioNode`](crate::behavior::AmbientAudioNode) alone adds one
/// per tick, so the host must call [`drain_cues`](Self::drain_cues) every frame.
pub struct ActivationTree {
    graph: NodeGraph,
    config: TreeConfig,
    selection: Box<dyn SelectionStrategy>,
    ghost_selection: Box<dyn SelectionStrategy>,
    rng: Pcg64,
    /// Snapshot from the most recent tick.
    activated_nodes: Vec<NodeId>,
    /// Snapshot from the most recent tick.
    children_of_activated: Vec<NodeId>,
    /// Snapshot from the most recent ghost branch.
    nodes_with_no_active_parent: Vec<NodeId>,
    /// Remaining seconds before a ghost activation turns normal. Ordered by
    /// node so frame passes are deterministic.
    ghost_normalize_timers: BTreeMap<NodeId, f64>,
    /// Grows until drained.
    cues: Vec<QueuedCue>,
    tick_counter: u64,
    torn_down: bool,
}

impl ActivationTree {
    /// Wrap a built graph. Both branches start with [`UniformRandom`].
    ///
    /// # Errors
    ///
    /// [`TreeError::Config`] if `config` fails validation.
    pub fn new(graph: NodeGraph, config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        Ok(Self {
            graph,
            config,
            selection: Box::new(UniformRandom),
            ghost_selection: Box::new(UniformRandom),
            rng,
            activated_nodes: Vec::new(),
            children_of_activated: Vec::new(),
            nodes_with_no_active_parent: Vec::new(),
            ghost_normalize_timers: BTreeMap::new(),
            cues: Vec::new(),
            tick_counter: 0,
            torn_down: false,
        })
    }

    pub fn with_selection_strategy(mut self, strategy: impl SelectionStrategy + 'static) -> Self {
        self.set_selection_strategy(strategy);
        self
    }

    pub fn with_ghost_selection_strategy(
        mut self,
        strategy: impl SelectionStrategy + 'static,
    ) -> Self {
        self.set_ghost_selection_strategy(strategy);
        self
    }

    /// Strategy for the normal branch.
    pub fn set_selection_strategy(&mut self, strategy: impl SelectionStrategy + 'static) {
        self.selection = Box::new(strategy);
    }

    /// Strategy for the ghost branch.
    pub fn set_ghost_selection_strategy(&mut self, strategy: impl SelectionStrategy + 'static) {
        self.ghost_selection = Box::new(strategy);
    }

    // -- tick ---------------------------------------------------------------

    /// Run one tick. Returns `None` once the tree has been torn down.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.torn_down {
            warn!("tick on a torn-down activation tree ignored");
            return None;
        }
        self.tick_counter += 1;
        let order = self.graph.depth_first();

        // Phase 1: update every node.
        let mut self_restored = Vec::new();
        for &id in &order {
            if self.graph.update_node(id, &mut self.cues) == NodeRequest::Restore
                && self.restore_node(id)
            {
                self_restored.push(id);
            }
        }

        // Phase 2: recompute the tick-refreshed sets.
        self.recompute_activation_sets(&order);

        // Phase 3: roll the branch, select, activate.
        let roll: f64 = self.rng.gen();
        let branch = if roll < self.config.ghost_event_chance {
            Branch::Ghost
        } else {
            Branch::Normal
        };
        let activated = match branch {
            Branch::Normal => {
                let pick = self.selection.select(
                    &self.children_of_activated,
                    &self.graph,
                    &mut self.rng,
                );
                self.activate_pick(pick, Branch::Normal)
            }
            Branch::Ghost => {
                self.nodes_with_no_active_parent = self.collect_nodes_with_no_active_parent(&order);
                let pick = self.ghost_selection.select(
                    &self.nodes_with_no_active_parent,
                    &self.graph,
                    &mut self.rng,
                );
                self.activate_pick(pick, Branch::Ghost)
            }
        };

        // Phase 4: seed reversion timers.
        self.seed_reversion_timers(&order);

        trace!(
            tick = self.tick_counter,
            ?branch,
            roll,
            activated = ?activated,
            active = self.activated_nodes.len(),
            "activation tree ticked"
        );

        Some(TickOutcome {
            tick: self.tick_counter,
            branch,
            activated,
            self_restored,
        })
    }

    fn recompute_activation_sets(&mut self, order: &[NodeId]) {
        self.activated_nodes = order
            .iter()
            .copied()
            .filter(|id| self.graph.is_activated(*id))
            .collect();

        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for &parent in &self.activated_nodes {
            for &child in self.graph.children(parent) {
                if !self.graph.is_activated(child) && seen.insert(child) {
                    children.push(child);
                }
            }
        }
        self.children_of_activated = children;
    }

    /// Inactive nodes whose direct parent is inactive. Top-level nodes
    /// qualify whenever they are inactive because the root never is active.
    fn collect_nodes_with_no_active_parent(&self, order: &[NodeId]) -> Vec<NodeId> {
        order
            .iter()
            .copied()
            .filter(|&id| {
                !self.graph.is_activated(id)
                    && self
                        .graph
                        .parent(id)
                        .map_or(true, |parent| !self.graph.is_activated(parent))
            })
            .collect()
    }

    fn activate_pick(&mut self, pick: Option<NodeId>, branch: Branch) -> Option<NodeId> {
        let id = pick?;
        let candidates = match branch {
            Branch::Normal => &self.children_of_activated,
            Branch::Ghost => &self.nodes_with_no_active_parent,
        };
        if !candidates.contains(&id) {
            warn!(node = %id, ?branch, "selection strategy returned a non-candidate; skipped");
            return None;
        }
        self.activate_node(id, branch == Branch::Ghost).then_some(id)
    }

    fn seed_reversion_timers(&mut self, order: &[NodeId]) {
        let Some(seconds) = self.config.ghost_to_normal_seconds else {
            return;
        };
        for &id in order {
            let ghost_active = self.graph.state(id).is_some_and(NodeState::is_ghost_active);
            if !ghost_active {
                continue;
            }
            let parent_is_normal = self
                .graph
                .parent(id)
                .filter(|p| !p.is_root())
                .and_then(|p| self.graph.state(p))
                .is_some_and(NodeState::is_normal_active);
            if parent_is_normal && !self.ghost_normalize_timers.contains_key(&id) {
                debug!(node = %id, seconds, "ghost reversion timer started");
                self.ghost_normalize_timers.insert(id, seconds);
            }
        }
    }

    // -- frame --------------------------------------------------------------

    /// Advance per-frame state by `dt` seconds.
    ///
    /// Negative or non-finite deltas are ignored. Does nothing once the tree
    /// has been torn down.
    pub fn frame(&mut self, dt: f64) {
        if self.torn_down {
            return;
        }
        if !(dt >= 0.0 && dt.is_finite()) {
            warn!(dt, "ignoring invalid frame delta");
            return;
        }

        for id in self.graph.depth_first() {
            if self.graph.advance_node(id, dt, &mut self.cues) == NodeRequest::Restore {
                self.restore_node(id);
            }
        }

        let graph = &self.graph;
        let mut expired = Vec::new();
        self.ghost_normalize_timers.retain(|&id, remaining| {
            if !graph.is_activated(id) {
                return false;
            }
            *remaining -= dt;
            if *remaining <= 0.0 {
                expired.push(id);
                false
            } else {
                true
            }
        });

        for id in expired {
            if let Some(mut state) = self.graph.state(id) {
                state.normalize();
                self.graph.set_state(id, state);
                debug!(node = %id, "ghost activation reverted to normal");
            }
        }
    }

    // -- node operations ----------------------------------------------------

    /// Activate `id`, setting its ghost flag first, then running its
    /// behavior.
    ///
    /// Returns `false` (and does nothing) for the root, unknown handles, and
    /// nodes that are already active.
    pub fn activate_node(&mut self, id: NodeId, by_ghost: bool) -> bool {
        if self.torn_down || id.is_root() || !self.graph.contains(id) {
            return false;
        }
        if self.graph.is_activated(id) {
            return false;
        }
        let mut state = NodeState::INACTIVE;
        state.activate(by_ghost);
        self.graph.set_state(id, state);
        self.graph
            .with_behavior(id, &mut self.cues, |behavior, ctx| behavior.activate(ctx));
        debug!(
            node = %id,
            name = self.graph.name(id).unwrap_or_default(),
            ghost = by_ghost,
            "node activated"
        );
        true
    }

    /// Restore `id` if it is active: run its behavior, clear both flags, and
    /// drop any pending reversion timer.
    ///
    /// Returns `false` (a no-op) if the node is not active.
    pub fn restore_node(&mut self, id: NodeId) -> bool {
        if self.torn_down || !self.graph.is_activated(id) {
            return false;
        }
        self.graph
            .with_behavior(id, &mut self.cues, |behavior, ctx| behavior.restore(ctx));
        let mut state = self.graph.state(id).unwrap_or_default();
        state.restore();
        self.graph.set_state(id, state);
        self.ghost_normalize_timers.remove(&id);
        debug!(
            node = %id,
            name = self.graph.name(id).unwrap_or_default(),
            "node restored"
        );
        true
    }

    /// Restore every active node within `radius` of `position`
    /// (`distance² <= radius²`). Returns the restored nodes in depth-first
    /// order.
    pub fn restore_activated_nodes_near(&mut self, position: Vec2, radius: f64) -> Vec<NodeId> {
        let radius_squared = radius * radius;
        let in_range: Vec<NodeId> = self
            .graph
            .depth_first()
            .into_iter()
            .filter(|&id| {
                self.graph.is_activated(id)
                    && self
                        .graph
                        .position(id)
                        .is_some_and(|p| p.distance_squared(position) <= radius_squared)
            })
            .collect();
        in_range
            .into_iter()
            .filter(|&id| self.restore_node(id))
            .collect()
    }

    /// Stop the tree: drop every timer and queued cue. Later ticks, frames,
    /// activations, and restores are no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.ghost_normalize_timers.clear();
        self.cues.clear();
        debug!(ticks = self.tick_counter, "activation tree torn down");
    }

    /// Take every cue emitted since the last call. Call once per frame.
    pub fn drain_cues(&mut self) -> Vec<QueuedCue> {
        std::mem::take(&mut self.cues)
    }

    /// Cues waiting for [`drain_cues`](Self::drain_cues).
    pub fn pending_cue_count(&self) -> usize {
        self.cues.len()
    }

    // -- accessors ----------------------------------------------------------

    /// Active nodes as of the most recent tick (not live).
    pub fn activated_nodes(&self) -> &[NodeId] {
        &self.activated_nodes
    }

    /// Inactive children of active nodes as of the most recent tick.
    pub fn children_of_activated(&self) -> &[NodeId] {
        &self.children_of_activated
    }

    /// Ghost candidates as of the most recent ghost branch.
    pub fn nodes_with_no_active_parent(&self) -> &[NodeId] {
        &self.nodes_with_no_active_parent
    }

    /// Live flags of one node.
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.graph.state(id)
    }

    /// Seconds left on a node's reversion timer.
    pub fn ghost_timer(&self, id: NodeId) -> Option<f64> {
        self.ghost_normalize_timers.get(&id).copied()
    }

    pub fn ghost_timers(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.ghost_normalize_timers.iter().map(|(id, s)| (*id, *s))
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // -- crate-internal (snapshot restore) ----------------------------------

    pub(crate) fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    pub(crate) fn replace_timers(&mut self, timers: BTreeMap<NodeId, f64>) {
        self.ghost_normalize_timers = timers;
    }

    pub(crate) fn set_tick_counter(&mut self, tick: u64) {
        self.tick_counter = tick;
    }

    /// Rebuild the derived sets from live state.
    pub(crate) fn refresh_derived_sets(&mut self) {
        let order = self.graph.depth_first();
        self.recompute_activation_sets(&order);
        self.nodes_with_no_active_parent = self.collect_nodes_with_no_active_parent(&order);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
