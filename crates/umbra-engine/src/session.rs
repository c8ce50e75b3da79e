//! A running scene: activation tree, tick clock, report bridge, triggers.
//!
//! The [`Session`] is what the game's scheduler talks to. It forwards every
//! frame to the tree, fires the ticks the [`TickClock`] reports due, and
//! routes player interaction (reports and restores) to the tree and the
//! [`GhostReportBridge`].
//!
//! # Example
//!
//! ```
//! use umbra_engine::prelude::*;
//!
//! let mut builder = TreeBuilder::new();
//! let hall = builder.add_top_level("hall", Vec2::ZERO, AlwaysActiveNode);
//! let door = builder
//!     .add_node(hall, "door", Vec2::new(3.0, 0.0), AudioAnimationNode::once())
//!     .unwrap();
//! builder.preactivate(hall).unwrap();
//!
//! let mut config = SessionConfig::default();
//! config.tree.tick_interval_seconds = 5.0;
//! config.tree.tick_delay_seconds = 1.0;
//! config.tree.ghost_event_chance = 0.0;
//! config.tree.seed = Some(3);
//! let mut session = Session::new(builder.finish(), config).unwrap();
//!
//! assert!(session.on_frame(0.5).is_empty());
//! let ticks = session.on_frame(0.5);
//! assert_eq!(ticks.len(), 1);
//! assert_eq!(ticks[0].activated, Some(door));
//!
//! assert_eq!(session.report_activity(door, "player"), ReportOutcome::Reported);
//! assert!(session.restore(door));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umbra_events::config::{ConfigError, TreeConfig};
use umbra_events::graph::NodeGraph;
use umbra_events::node::{NodeId, QueuedCue, Vec2};
use umbra_events::tree::{ActivationTree, TickOutcome};

use crate::bridge::{GhostReport, GhostReportBridge, SubscriptionId};
use crate::clock::{TickClock, DEFAULT_MAX_CATCH_UP_TICKS};
use crate::interaction::{ReportOutcome, ReportTrigger, DEFAULT_REPORT_HINT};
use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Tree configuration plus session-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tree: TreeConfig,
    /// Hint used by [`Session::add_report_trigger_at`].
    pub report_hint: String,
    /// Most ticks one frame may run after a stall.
    pub max_catch_up_ticks: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tree: TreeConfig::default(),
            report_hint: DEFAULT_REPORT_HINT.to_owned(),
            max_catch_up_ticks: DEFAULT_MAX_CATCH_UP_TICKS,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.tree.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One scene's activation tree and everything that talks to it.
///
/// Cues emitted by node behaviors pile up inside the tree until
/// [`drain_cues`](Self::drain_cues) takes them; hosts call it once per frame.
pub struct Session {
    tree: ActivationTree,
    clock: TickClock,
    bridge: GhostReportBridge,
    triggers: BTreeMap<NodeId, ReportTrigger>,
    report_hint: String,
    torn_down: bool,
}

impl Session {
    /// Build the tree for `graph` and start the tick clock.
    ///
    /// # Errors
    ///
    /// [`SessionError::Tree`] if the tree configuration is invalid.
    pub fn new(graph: NodeGraph, config: SessionConfig) -> Result<Self, SessionError> {
        let tree = ActivationTree::new(graph, config.tree)?;
        Ok(Self::from_tree(tree)
            .with_report_hint(config.report_hint)
            .with_max_catch_up_ticks(config.max_catch_up_ticks))
    }

    /// Drive an already configured tree, for example one with custom
    /// selection strategies.
    pub fn from_tree(tree: ActivationTree) -> Self {
        let clock = TickClock::from_config(tree.config());
        Self {
            tree,
            clock,
            bridge: GhostReportBridge::new(),
            triggers: BTreeMap::new(),
            report_hint: DEFAULT_REPORT_HINT.to_owned(),
            torn_down: false,
        }
    }

    fn with_report_hint(mut self, hint: String) -> Self {
        self.report_hint = hint;
        self
    }

    fn with_max_catch_up_ticks(mut self, max: u64) -> Self {
        self.clock = self.clock.with_max_catch_up_ticks(max);
        self
    }

    // -- scheduler ----------------------------------------------------------

    /// Advance by one frame of `dt` seconds: run the tree's per-frame work,
    /// then every tick the clock reports due. Returns those ticks' outcomes.
    pub fn on_frame(&mut self, dt: f64) -> Vec<TickOutcome> {
        if self.torn_down {
            return Vec::new();
        }
        self.tree.frame(dt);
        let due = self.clock.advance(dt);
        (0..due).filter_map(|_| self.tree.tick()).collect()
    }

    /// Run one tick immediately, outside the clock's schedule.
    pub fn on_tick(&mut self) -> Option<TickOutcome> {
        if self.torn_down {
            return None;
        }
        self.tree.tick()
    }

    // -- interaction --------------------------------------------------------

    /// Report activity at `node`.
    ///
    /// The node's trigger listeners (if any) always fire. A report is
    /// published to the subscribers only when the node is ghost-activated.
    pub fn report_activity(&mut self, node: NodeId, reporter: &str) -> ReportOutcome {
        if self.torn_down || node.is_root() || !self.tree.graph().contains(node) {
            return ReportOutcome::Ignored;
        }
        if let Some(trigger) = self.triggers.get_mut(&node) {
            trigger.fire(reporter);
        }

        let ghost = self.tree.state(node).is_some_and(|s| s.is_ghost_active());
        if !ghost {
            debug!(node = %node, reporter, "report at a node without ghost activity");
            return ReportOutcome::Reported;
        }

        let graph = self.tree.graph();
        let report = GhostReport {
            node,
            node_name: graph.name(node).unwrap_or_default().to_owned(),
            position: graph.position(node).unwrap_or_default(),
            reporter: reporter.to_owned(),
            tick: self.tree.tick_count(),
        };
        let subscribers = self.bridge.publish(&report);
        ReportOutcome::GhostReported { subscribers }
    }

    /// Restore `node` if it is active.
    pub fn restore(&mut self, node: NodeId) -> bool {
        !self.torn_down && self.tree.restore_node(node)
    }

    /// Restore every active node within `radius` of `position`.
    pub fn restore_near(&mut self, position: Vec2, radius: f64) -> Vec<NodeId> {
        if self.torn_down {
            return Vec::new();
        }
        self.tree.restore_activated_nodes_near(position, radius)
    }

    /// Attach a report trigger, replacing any previous one on the same node.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownNode`] if the node is not in this scene.
    pub fn add_report_trigger(&mut self, trigger: ReportTrigger) -> Result<(), SessionError> {
        let node = trigger.node();
        if node.is_root() || !self.tree.graph().contains(node) {
            return Err(SessionError::UnknownNode { node });
        }
        self.triggers.insert(node, trigger);
        Ok(())
    }

    /// Attach a trigger carrying the configured hint to `node`.
    pub fn add_report_trigger_at(&mut self, node: NodeId) -> Result<(), SessionError> {
        let trigger = ReportTrigger::new(node).with_hint(self.report_hint.clone());
        self.add_report_trigger(trigger)
    }

    /// Hint text of the trigger on `node`.
    pub fn hint_for(&self, node: NodeId) -> Option<&str> {
        self.triggers.get(&node).map(ReportTrigger::hint_text)
    }

    pub fn subscribe_ghost_reports(
        &mut self,
        handler: impl FnMut(&GhostReport) + 'static,
    ) -> SubscriptionId {
        self.bridge.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bridge.unsubscribe(id)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Stop the session: the clock stops, the tree drops its timers and
    /// cues, and subscribers and triggers are released. Every later call is
    /// a no-op.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.clock.stop();
        self.tree.teardown();
        self.bridge.clear();
        self.triggers.clear();
        info!(
            ticks = self.tree.tick_count(),
            reports = self.bridge.published_count(),
            "session torn down"
        );
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // -- accessors ----------------------------------------------------------

    /// Take the cues queued since the last call.
    pub fn drain_cues(&mut self) -> Vec<QueuedCue> {
        self.tree.drain_cues()
    }

    pub fn tree(&self) -> &ActivationTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ActivationTree {
        &mut self.tree
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn bridge(&self) -> &GhostReportBridge {
        &self.bridge
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ticks", &self.tree.tick_count())
            .field("nodes", &self.tree.graph().node_count())
            .field("pending_cues", &self.tree.pending_cue_count())
            .field("clock", &self.clock)
            .field("bridge", &self.bridge)
            .field("triggers", &self.triggers.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_events::prelude::*;

    fn scene() -> (NodeGraph, NodeId, NodeId) {
        let mut builder = TreeBuilder::new();
        let hall = builder.add_top_level("hall", Vec2::ZERO, AlwaysActiveNode);
        let door = builder
            .add_node(
                hall,
                "door",
                Vec2::new(1.0, 0.0),
                AudioAnimationNode::once(),
            )
            .unwrap();
        builder.preactivate(hall).unwrap();
        (builder.finish(), hall, door)
    }

    fn config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.tree.tick_interval_seconds = 2.0;
        config.tree.tick_delay_seconds = 1.0;
        config.tree.ghost_event_chance = 0.0;
        config.tree.seed = Some(1);
        config
    }

    #[test]
    fn session_config_json_defaults_and_validation() {
        let config = SessionConfig::from_json_str(r#"{ "tree": { "ghost_event_chance": 0.5 } }"#)
            .unwrap();
        assert_eq!(config.tree.ghost_event_chance, 0.5);
        assert_eq!(config.report_hint, DEFAULT_REPORT_HINT);

        assert!(matches!(
            SessionConfig::from_json_str(r#"{ "tree": { "ghost_event_chance": 2.0 } }"#),
            Err(SessionError::Config(ConfigError::InvalidGhostChance(_)))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("{ nope"),
            Err(SessionError::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn invalid_tree_config_fails_construction() {
        let (graph, _, _) = scene();
        let mut config = config();
        config.tree.tick_interval_seconds = 0.0;
        assert!(matches!(
            Session::new(graph, config),
            Err(SessionError::Tree(TreeError::Config(_)))
        ));
    }

    #[test]
    fn frames_drive_ticks_on_schedule() {
        let (graph, _, door) = scene();
        let mut session = Session::new(graph, config()).unwrap();
        assert!(session.on_frame(0.5).is_empty());
        let ticks = session.on_frame(0.5);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].activated, Some(door));
        assert!(session.on_frame(1.5).is_empty());
        assert_eq!(session.on_frame(0.5).len(), 1);
        assert_eq!(session.tree().tick_count(), 2);
    }

    #[test]
    fn stalled_frame_runs_at_most_the_configured_ticks() {
        let (graph, _, _) = scene();
        let mut config = config();
        config.max_catch_up_ticks = 4;
        let mut session = Session::new(graph, config).unwrap();

        assert_eq!(session.on_frame(1_000.0).len(), 4);
        assert_eq!(session.tree().tick_count(), 4);
        assert!(session.clock().ticks_skipped() > 0);
        // The backlog is dropped; the next tick is one interval later.
        assert!(session.on_frame(0.5).is_empty());
        assert_eq!(session.on_frame(0.5).len(), 1);
    }

    #[test]
    fn session_config_json_reads_catch_up_cap() {
        let config = SessionConfig::from_json_str(r#"{ "max_catch_up_ticks": 2 }"#)
            .unwrap();
        assert_eq!(config.max_catch_up_ticks, 2);
        assert_eq!(
            SessionConfig::default().max_catch_up_ticks,
            DEFAULT_MAX_CATCH_UP_TICKS
        );
    }

    #[test]
    fn debug_output_summarizes_the_session() {
        let (graph, _, _) = scene();
        let mut session = Session::new(graph, config()).unwrap();
        session.on_frame(1.0);
        let text = format!("{session:?}");
        assert!(text.starts_with("Session"));
        assert!(text.contains("ticks: 1"));
        assert!(text.contains("torn_down: false"));
    }

    #[test]
    fn triggers_require_a_scene_node() {
        let (graph, _, door) = scene();
        let mut session = Session::new(graph, config()).unwrap();
        assert!(session.add_report_trigger_at(door).is_ok());
        assert_eq!(session.hint_for(door), Some(DEFAULT_REPORT_HINT));
        assert!(matches!(
            session.add_report_trigger_at(NodeId::from_raw(99)),
            Err(SessionError::UnknownNode { .. })
        ));
        assert!(session.add_report_trigger_at(NodeId::ROOT).is_err());
    }

    #[test]
    fn reporting_unknown_node_is_ignored() {
        let (graph, _, _) = scene();
        let mut session = Session::new(graph, config()).unwrap();
        assert_eq!(
            session.report_activity(NodeId::from_raw(42), "p"),
            ReportOutcome::Ignored
        );
        assert_eq!(
            session.report_activity(NodeId::ROOT, "p"),
            ReportOutcome::Ignored
        );
    }
}
