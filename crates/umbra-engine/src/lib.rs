//! Umbra Engine -- drives activation trees inside a running game session.
//!
//! This crate builds on [`umbra_events`] and supplies what the game loop
//! talks to: a [`TickClock`](clock::TickClock) that turns frame deltas into
//! ticks, the [`Session`](session::Session) that owns a tree for the
//! lifetime of a scene, the ghost-report channel, report triggers, and the
//! signal helpers used by level scripts.
//!
//! # Quick Start
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use umbra_engine::prelude::*;
//!
//! let mut builder = TreeBuilder::new();
//! let attic = builder.add_top_level("attic", Vec2::ZERO, AudioAnimationNode::once());
//!
//! let mut config = SessionConfig::default();
//! config.tree.ghost_event_chance = 1.0;
//! config.tree.tick_delay_seconds = 0.0;
//! config.tree.seed = Some(9);
//! let mut session = Session::new(builder.finish(), config).unwrap();
//!
//! let reports = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&reports);
//! session.subscribe_ghost_reports(move |r: &GhostReport| sink.borrow_mut().push(r.node));
//!
//! session.on_frame(0.0); // first tick: the ghost takes the attic
//! assert!(session.report_activity(attic, "player").is_ghost());
//! assert_eq!(*reports.borrow(), vec![attic]);
//! ```

#![deny(unsafe_code)]

pub mod bridge;
pub mod clock;
pub mod interaction;
pub mod session;
pub mod signal;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the event tree crate for convenience.
pub use umbra_events;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while setting up a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A trigger or handler referred to a node outside the scene.
    #[error("node {node} is not part of this scene")]
    UnknownNode { node: umbra_events::node::NodeId },

    /// Building the activation tree failed.
    #[error(transparent)]
    Tree(#[from] umbra_events::TreeError),

    /// The session configuration is invalid.
    #[error(transparent)]
    Config(#[from] umbra_events::config::ConfigError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use umbra_events::prelude::*;

    pub use crate::bridge::{GhostReport, GhostReportBridge, SubscriptionId};
    pub use crate::clock::{TickClock, DEFAULT_MAX_CATCH_UP_TICKS};
    pub use crate::interaction::{ReportOutcome, ReportTrigger, DEFAULT_REPORT_HINT};
    pub use crate::session::{Session, SessionConfig};
    pub use crate::signal::{Delay, Listener, Oscillator, ProbabilityGate, SignalEntry, SignalError};
    pub use crate::SessionError;
}
