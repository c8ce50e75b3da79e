//! The node arena and the builder that authors it.
//!
//! A [`NodeGraph`] is built once per scene with a [`TreeBuilder`] and is
//! static afterwards: nodes are never inserted or removed during a session.
//! Slot `0` is the root. Children keep the order they were added in, which is
//! the order of every depth-first walk.

use crate::behavior::NodeKind;
use crate::node::{NodeBehavior, NodeContext, NodeId, NodeRequest, NodeState, QueuedCue, Vec2};
use crate::TreeError;

// ---------------------------------------------------------------------------
// NodeSlot
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct NodeSlot {
    name: String,
    position: Vec2,
    /// `None` only for the root.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: NodeState,
    behavior: NodeKind,
}

// ---------------------------------------------------------------------------
// NodeGraph
// ---------------------------------------------------------------------------

/// Arena holding every node of one scene.
#[derive(Debug)]
pub struct NodeGraph {
    slots: Vec<NodeSlot>,
}

impl NodeGraph {
    fn with_root() -> Self {
        Self {
            slots: vec![NodeSlot {
                name: "root".to_owned(),
                position: Vec2::ZERO,
                parent: None,
                children: Vec::new(),
                state: NodeState::INACTIVE,
                behavior: NodeKind::AlwaysActive(crate::behavior::AlwaysActiveNode),
            }],
        }
    }

    /// Number of nodes, not counting the root.
    pub fn node_count(&self) -> usize {
        self.slots.len() - 1
    }

    /// Whether `id` was issued by this graph (the root included).
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.slots.len()
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.slot(id).map(|s| s.state)
    }

    /// `false` for the root and for unknown handles.
    pub fn is_activated(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|s| s.state.activated())
    }

    /// Direct parent. Top-level nodes report [`NodeId::ROOT`]; the root
    /// itself reports `None`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|s| s.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.slot(id).map(|s| s.name.as_str())
    }

    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        self.slot(id).map(|s| s.position)
    }

    pub fn behavior(&self, id: NodeId) -> Option<&NodeKind> {
        self.slot(id).map(|s| &s.behavior)
    }

    /// First node with the given name, in depth-first order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.depth_first()
            .into_iter()
            .find(|id| self.name(*id) == Some(name))
    }

    /// All nodes except the root, parents before children, siblings in
    /// authored order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.node_count());
        let mut stack: Vec<NodeId> = self.slots[0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.slots[id.index()].children.iter().rev().copied());
        }
        order
    }

    // -- crate-internal mutation -------------------------------------------

    fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.slots.get(id.index())
    }

    pub(crate) fn set_state(&mut self, id: NodeId, state: NodeState) {
        if id.is_root() {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.state = state;
        }
    }

    /// Run `f` against a node's behavior with a context built from its
    /// current state.
    pub(crate) fn with_behavior<R>(
        &mut self,
        id: NodeId,
        cues: &mut Vec<QueuedCue>,
        f: impl FnOnce(&mut NodeKind, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let slot = self.slots.get_mut(id.index())?;
        let mut ctx = NodeContext::new(id, slot.state, cues);
        Some(f(&mut slot.behavior, &mut ctx))
    }

    pub(crate) fn update_node(&mut self, id: NodeId, cues: &mut Vec<QueuedCue>) -> NodeRequest {
        self.with_behavior(id, cues, |behavior, ctx| behavior.update(ctx))
            .unwrap_or_default()
    }

    pub(crate) fn advance_node(
        &mut self,
        id: NodeId,
        dt: f64,
        cues: &mut Vec<QueuedCue>,
    ) -> NodeRequest {
        self.with_behavior(id, cues, |behavior, ctx| behavior.advance(dt, ctx))
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// TreeBuilder
// ---------------------------------------------------------------------------

/// Authors a [`NodeGraph`].
///
/// ```
/// use umbra_events::prelude::*;
///
/// let mut builder = TreeBuilder::new();
/// let attic = builder.add_top_level("attic", Vec2::ZERO, AlwaysActiveNode);
/// let chest = builder
///     .add_node(attic, "chest", Vec2::new(1.0, 1.0), AudioAnimationNode::once())
///     .unwrap();
/// let graph = builder.finish();
///
/// assert_eq!(graph.parent(chest), Some(attic));
/// assert_eq!(graph.depth_first(), vec![attic, chest]);
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    graph: NodeGraph,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            graph: NodeGraph::with_root(),
        }
    }

    /// Append a node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownParent`] if `parent` was not issued by this builder.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        position: Vec2,
        behavior: impl Into<NodeKind>,
    ) -> Result<NodeId, TreeError> {
        if !self.graph.contains(parent) {
            return Err(TreeError::UnknownParent { parent });
        }
        let id = NodeId::from_index(self.graph.slots.len());
        self.graph.slots.push(NodeSlot {
            name: name.into(),
            position,
            parent: Some(parent),
            children: Vec::new(),
            state: NodeState::INACTIVE,
            behavior: behavior.into(),
        });
        self.graph.slots[parent.index()].children.push(id);
        Ok(id)
    }

    /// Append a node directly under the root.
    pub fn add_top_level(
        &mut self,
        name: impl Into<String>,
        position: Vec2,
        behavior: impl Into<NodeKind>,
    ) -> NodeId {
        let id = NodeId::from_index(self.graph.slots.len());
        self.graph.slots.push(NodeSlot {
            name: name.into(),
            position,
            parent: Some(NodeId::ROOT),
            children: Vec::new(),
            state: NodeState::INACTIVE,
            behavior: behavior.into(),
        });
        self.graph.slots[0].children.push(id);
        id
    }

    /// Author a node as active from the start, without running its
    /// `activate` behavior.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownNode`] for foreign handles and
    /// [`TreeError::RootNotActivatable`] for the root.
    pub fn preactivate(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.set_initial_state(id, NodeState::new(true, false))
    }

    /// Author a node's starting flags.
    pub fn set_initial_state(&mut self, id: NodeId, state: NodeState) -> Result<(), TreeError> {
        if id.is_root() {
            return Err(TreeError::RootNotActivatable);
        }
        if !self.graph.contains(id) {
            return Err(TreeError::UnknownNode { node: id });
        }
        self.graph.set_state(id, state);
        Ok(())
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn finish(self) -> NodeGraph {
        self.graph
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
