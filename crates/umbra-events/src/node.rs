//! Node handles, activation state, and the behavior contract.
//!
//! A [`NodeId`] is a 32-bit index into the tree's node arena. Index `0` is
//! always the root, which never carries activation state.
//!
//! Concrete node variants implement [`NodeBehavior`]. The tree owns the
//! activation flags and writes them around each behavior call, so the
//! post-conditions of `activate` and `restore` hold for every variant:
//!
//! - after `activate`: `activated == true`
//! - after `restore`: `activated == false && activated_by_ghost == false`

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// A handle to a node in one [`NodeGraph`](crate::graph::NodeGraph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// The distinguished root of every graph.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw `u32`.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// Activation flags of a single node.
///
/// The ghost flag is only ever set together with the activation flag; every
/// constructor and mutator keeps `activated_by_ghost ⟹ activated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeState {
    activated: bool,
    activated_by_ghost: bool,
}

impl NodeState {
    /// A node that is not active.
    pub const INACTIVE: NodeState = NodeState {
        activated: false,
        activated_by_ghost: false,
    };

    /// Build a state, dropping the ghost flag when the node is not active.
    pub fn new(activated: bool, activated_by_ghost: bool) -> Self {
        Self {
            activated,
            activated_by_ghost: activated && activated_by_ghost,
        }
    }

    #[inline]
    pub fn activated(self) -> bool {
        self.activated
    }

    #[inline]
    pub fn activated_by_ghost(self) -> bool {
        self.activated_by_ghost
    }

    /// Active because of a ghost event.
    #[inline]
    pub fn is_ghost_active(self) -> bool {
        self.activated && self.activated_by_ghost
    }

    /// Active through normal propagation.
    #[inline]
    pub fn is_normal_active(self) -> bool {
        self.activated && !self.activated_by_ghost
    }

    pub(crate) fn activate(&mut self, by_ghost: bool) {
        self.activated = true;
        self.activated_by_ghost = by_ghost;
    }

    pub(crate) fn restore(&mut self) {
        *self = Self::INACTIVE;
    }

    /// Turn a ghost activation into a normal one.
    pub(crate) fn normalize(&mut self) {
        self.activated_by_ghost = false;
    }
}

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A position in the 2D scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

// ---------------------------------------------------------------------------
// Cues
// ---------------------------------------------------------------------------

/// An outbound request from a node behavior to the engine collaborator that
/// owns animation and audio playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    /// Play the node's animation forward, looping or once.
    PlayAnimation { looping: bool },
    /// Play the node's animation backwards from its last frame, once.
    ReverseAnimation,
    /// Start the node's audio source if it is not already playing.
    EnsureAudioPlaying,
}

/// A [`Cue`] tagged with the node that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCue {
    pub node: NodeId,
    pub cue: Cue,
}

// ---------------------------------------------------------------------------
// NodeContext / NodeRequest
// ---------------------------------------------------------------------------

/// What a behavior sees during a lifecycle call.
pub struct NodeContext<'a> {
    id: NodeId,
    state: NodeState,
    cues: &'a mut Vec<QueuedCue>,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(id: NodeId, state: NodeState, cues: &'a mut Vec<QueuedCue>) -> Self {
        Self { id, state, cues }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Flags at the time of the call. During `activate` the node is already
    /// marked active; during `restore` it still is.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Queue a cue for the engine.
    pub fn emit(&mut self, cue: Cue) {
        self.cues.push(QueuedCue { node: self.id, cue });
    }
}

/// Returned by the periodic hooks so a behavior can ask for its own restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeRequest {
    #[default]
    Idle,
    /// Restore this node now (for example when an auto-restore timer runs out).
    Restore,
}

// ---------------------------------------------------------------------------
// NodeBehavior
// ---------------------------------------------------------------------------

/// Capability set every concrete node variant implements.
///
/// Implementations must not depend on the order in which sibling nodes are
/// updated within one tick.
pub trait NodeBehavior: fmt::Debug {
    /// Called once per tick for every node except the root.
    fn update(&mut self, ctx: &mut NodeContext<'_>) -> NodeRequest;

    /// Start the node's active behavior.
    fn activate(&mut self, ctx: &mut NodeContext<'_>);

    /// Revert the node's active behavior.
    fn restore(&mut self, ctx: &mut NodeContext<'_>);

    /// Called once per frame with the elapsed seconds. Node-internal timers
    /// live here.
    fn advance(&mut self, _dt: f64, _ctx: &mut NodeContext<'_>) -> NodeRequest {
        NodeRequest::Idle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_flag_requires_activation() {
        let state = NodeState::new(false, true);
        assert!(!state.activated());
        assert!(!state.activated_by_ghost());

        let state = NodeState::new(true, true);
        assert!(state.is_ghost_active());
        assert!(!state.is_normal_active());
    }

    #[test]
    fn restore_clears_both_flags() {
        let mut state = NodeState::new(true, true);
        state.restore();
        assert_eq!(state, NodeState::INACTIVE);
        state.restore();
        assert_eq!(state, NodeState::INACTIVE);
    }

    #[test]
    fn normalize_keeps_activation() {
        let mut state = NodeState::new(true, true);
        state.normalize();
        assert!(state.is_normal_active());
    }

    #[test]
    fn node_id_formatting() {
        let id = NodeId::from_raw(12);
        assert_eq!(format!("{id}"), "#12");
        assert_eq!(format!("{id:?}"), "NodeId(12)");
        assert!(NodeId::ROOT.is_root());
        assert!(!id.is_root());
    }

    #[test]
    fn distance_squared_is_symmetric() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);
        assert_eq!(a.distance_squared(b), 25.0);
        assert_eq!(b.distance_squared(a), 25.0);
    }

    #[test]
    fn context_tags_cues_with_node() {
        let mut cues = Vec::new();
        let id = NodeId::from_raw(3);
        let mut ctx = NodeContext::new(id, NodeState::new(true, false), &mut cues);
        ctx.emit(Cue::ReverseAnimation);
        assert_eq!(
            cues,
            vec![QueuedCue {
                node: id,
                cue: Cue::ReverseAnimation
            }]
        );
    }
}
