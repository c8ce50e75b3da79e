//! Umbra Events -- the event-propagation tree behind the haunted scenes.
//!
//! A scene is a static tree of event nodes (a creaking door, a flickering
//! lamp, rain against a window). Every tick the [`ActivationTree`] updates
//! all nodes, recomputes which nodes are eligible, and activates at most one
//! of them: either a child of an already active node (normal propagation) or,
//! with probability `ghost_event_chance`, any node whose parent is inactive
//! (a ghost event). Ghost-activated nodes that end up under an active,
//! non-ghost parent revert to normal activation after a configurable delay.
//!
//! # Quick Start
//!
//! ```
//! use umbra_events::prelude::*;
//!
//! let mut builder = TreeBuilder::new();
//! let hall = builder.add_top_level("hall", Vec2::new(0.0, 0.0), AlwaysActiveNode);
//! let door = builder
//!     .add_node(hall, "door", Vec2::new(2.0, 0.0), AudioAnimationNode::once())
//!     .unwrap();
//! builder.preactivate(hall).unwrap();
//!
//! let config = TreeConfig { ghost_event_chance: 0.0, seed: Some(7), ..Default::default() };
//! let mut tree = ActivationTree::new(builder.finish(), config).unwrap();
//!
//! let outcome = tree.tick().unwrap();
//! assert_eq!(outcome.activated, Some(door));
//! assert!(tree.state(door).unwrap().activated());
//! ```

#![deny(unsafe_code)]

pub mod behavior;
pub mod config;
pub mod graph;
pub mod node;
pub mod selection;
pub mod snapshot;
pub mod tree;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building or restoring an activation tree.
///
/// Runtime operations (ticks, frames, restores) never fail; degenerate inputs
/// there are defined no-ops.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A node was attached to a parent handle that this graph never issued.
    #[error("parent node {parent} does not exist in this graph")]
    UnknownParent { parent: node::NodeId },

    /// A handle that this graph never issued was used.
    #[error("node {node} does not exist in this graph")]
    UnknownNode { node: node::NodeId },

    /// The root cannot be activated, restored, or given state.
    #[error("the root node cannot carry activation state")]
    RootNotActivatable,

    /// A snapshot was captured from a graph with a different shape.
    #[error("snapshot describes {snapshot} nodes but the graph has {graph}")]
    SnapshotShapeMismatch { snapshot: usize, graph: usize },

    /// The snapshot's recorded hash does not match its contents.
    #[error(
        "snapshot hash mismatch: recorded {recorded} but recomputed {recomputed}. \
         The snapshot may be corrupted or tampered with."
    )]
    SnapshotHashMismatch { recorded: String, recomputed: String },

    /// The tree configuration is invalid.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::behavior::{AlwaysActiveNode, AmbientAudioNode, AudioAnimationNode, NodeKind};
    pub use crate::config::{ConfigError, TreeConfig};
    pub use crate::graph::{NodeGraph, TreeBuilder};
    pub use crate::node::{
        Cue, NodeBehavior, NodeContext, NodeId, NodeRequest, NodeState, QueuedCue, Vec2,
    };
    pub use crate::selection::{
        FirstCandidate, Fixed, SelectionStrategy, UniformRandom, Weighted,
    };
    pub use crate::snapshot::{NodeSnapshot, TreeSnapshot};
    pub use crate::tree::{ActivationTree, Branch, TickOutcome};
    pub use crate::TreeError;
}
