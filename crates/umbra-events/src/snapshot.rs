//! Tree snapshots with BLAKE3 hashing.
//!
//! A [`TreeSnapshot`] records every node's activation flags, the pending
//! ghost reversion timers, and the tick counter, plus a BLAKE3 hex digest of
//! that data. Two trees built from the same scene and seed that received the
//! same ticks and frames hash identically.
//!
//! # What Is NOT Serialized
//!
//! - **Node behaviors** -- animation playback and auto-restore timers live
//!   in the behavior and are not rewound by a restore.
//! - **Random source** -- the tree keeps its current RNG state.
//! - **Selection strategies** and queued cues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeState};
use crate::tree::ActivationTree;
use crate::TreeError;

// ---------------------------------------------------------------------------
// TreeSnapshot
// ---------------------------------------------------------------------------

/// Flags of one node at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: String,
    pub state: NodeState,
}

/// Serializable activation state of a whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub tick_counter: u64,
    /// Every node except the root, in depth-first order.
    pub nodes: Vec<NodeSnapshot>,
    /// Pending reversion timers as `(node, remaining seconds)`.
    pub ghost_timers: Vec<(NodeId, f64)>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl TreeSnapshot {
    /// Flags of the snapshotted node, if present.
    pub fn state_of(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.state)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

fn compute_hash(
    tick_counter: u64,
    nodes: &[NodeSnapshot],
    ghost_timers: &[(NodeId, f64)],
) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        tick_counter: u64,
        nodes: &'a [NodeSnapshot],
        /// Timers by bit pattern so the digest does not depend on how a
        /// float is printed.
        ghost_timers: Vec<(NodeId, u64)>,
    }

    let hashable = HashableState {
        tick_counter,
        nodes,
        ghost_timers: ghost_timers
            .iter()
            .map(|(id, seconds)| (*id, seconds.to_bits()))
            .collect(),
    };

    let json_bytes = serde_json::to_vec(&hashable)
        .expect("TreeSnapshot state should always be JSON-serializable");

    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// ActivationTree snapshot/restore methods
// ---------------------------------------------------------------------------

impl ActivationTree {
    /// Capture the activation state of every node.
    pub fn capture_snapshot(&self) -> TreeSnapshot {
        let graph = self.graph();
        let nodes: Vec<NodeSnapshot> = graph
            .depth_first()
            .into_iter()
            .map(|id| NodeSnapshot {
                id,
                name: graph.name(id).unwrap_or_default().to_owned(),
                kind: graph.behavior(id).map(|b| b.label()).unwrap_or_default().to_owned(),
                state: graph.state(id).unwrap_or_default(),
            })
            .collect();
        let ghost_timers: Vec<(NodeId, f64)> = self.ghost_timers().collect();
        let hash = compute_hash(self.tick_count(), &nodes, &ghost_timers);

        TreeSnapshot {
            tick_counter: self.tick_count(),
            nodes,
            ghost_timers,
            hash,
        }
    }

    /// BLAKE3 digest of the current state; equal to `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }

    /// Write a snapshot's flags, timers, and tick counter back into this
    /// tree, then rebuild the derived candidate sets.
    ///
    /// # Errors
    ///
    /// - [`TreeError::SnapshotHashMismatch`] if the snapshot does not match
    ///   its own hash.
    /// - [`TreeError::SnapshotShapeMismatch`] if it was taken from a graph
    ///   with a different node count.
    /// - [`TreeError::UnknownNode`] if it names a node this graph lacks.
    ///
    /// The tree is left untouched on error.
    pub fn restore_from_snapshot(&mut self, snapshot: &TreeSnapshot) -> Result<(), TreeError> {
        let recomputed = compute_hash(
            snapshot.tick_counter,
            &snapshot.nodes,
            &snapshot.ghost_timers,
        );
        if recomputed != snapshot.hash {
            return Err(TreeError::SnapshotHashMismatch {
                recorded: snapshot.hash.clone(),
                recomputed,
            });
        }

        let graph = self.graph();
        if snapshot.nodes.len() != graph.node_count() {
            return Err(TreeError::SnapshotShapeMismatch {
                snapshot: snapshot.nodes.len(),
                graph: graph.node_count(),
            });
        }
        let unknown = snapshot
            .nodes
            .iter()
            .map(|n| n.id)
            .chain(snapshot.ghost_timers.iter().map(|(id, _)| *id))
            .find(|id| id.is_root() || !graph.contains(*id));
        if let Some(node) = unknown {
            return Err(TreeError::UnknownNode { node });
        }

        for node in &snapshot.nodes {
            let state = NodeState::new(node.state.activated(), node.state.activated_by_ghost());
            self.graph_mut().set_state(node.id, state);
        }
        let timers: BTreeMap<NodeId, f64> = snapshot.ghost_timers.iter().copied().collect();
        self.replace_timers(timers);
        self.set_tick_counter(snapshot.tick_counter);
        self.refresh_derived_sets();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
