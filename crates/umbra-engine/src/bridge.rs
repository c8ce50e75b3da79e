//! Publish/subscribe channel for ghost reports.
//!
//! When the player reports activity at a node that is currently
//! ghost-activated, the session publishes one [`GhostReport`] through the
//! [`GhostReportBridge`]. Scoring, UI, and audio stingers subscribe with a
//! handler and receive every report in subscription order.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use umbra_engine::bridge::{GhostReport, GhostReportBridge};
//! use umbra_events::node::{NodeId, Vec2};
//!
//! let mut bridge = GhostReportBridge::new();
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//! bridge.subscribe(move |_report: &GhostReport| counter.set(counter.get() + 1));
//!
//! let report = GhostReport {
//!     node: NodeId::from_raw(3),
//!     node_name: "mirror".into(),
//!     position: Vec2::ZERO,
//!     reporter: "player".into(),
//!     tick: 4,
//! };
//! assert_eq!(bridge.publish(&report), 1);
//! assert_eq!(seen.get(), 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umbra_events::node::{NodeId, Vec2};

/// A confirmed report against a ghost-activated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhostReport {
    pub node: NodeId,
    pub node_name: String,
    pub position: Vec2,
    /// Who reported (player name, controller id).
    pub reporter: String,
    /// Tick counter of the tree when the report was made.
    pub tick: u64,
}

/// Handle returned by [`GhostReportBridge::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type ReportHandler = Box<dyn FnMut(&GhostReport)>;

// ---------------------------------------------------------------------------
// GhostReportBridge
// ---------------------------------------------------------------------------

/// Owns the ghost-report subscribers.
#[derive(Default)]
pub struct GhostReportBridge {
    subscribers: Vec<(SubscriptionId, ReportHandler)>,
    next_id: u64,
    published: u64,
}

impl fmt::Debug for GhostReportBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostReportBridge")
            .field("subscribers", &self.subscribers.len())
            .field("published", &self.published)
            .finish()
    }
}

impl GhostReportBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&GhostReport) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        debug!(subscription = %id, "ghost report subscriber added");
        id
    }

    /// Remove a subscriber. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    /// Deliver `report` to every subscriber. Returns how many received it.
    pub fn publish(&mut self, report: &GhostReport) -> usize {
        self.published += 1;
        for (_, handler) in &mut self.subscribers {
            handler(report);
        }
        info!(
            node = %report.node,
            name = %report.node_name,
            reporter = %report.reporter,
            subscribers = self.subscribers.len(),
            "ghost activity reported"
        );
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Reports published since construction.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Drop every subscriber.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn report(raw: u32) -> GhostReport {
        GhostReport {
            node: NodeId::from_raw(raw),
            node_name: format!("node{raw}"),
            position: Vec2::new(raw as f64, 0.0),
            reporter: "tester".into(),
            tick: 1,
        }
    }

    #[test]
    fn subscribers_receive_reports_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bridge = GhostReportBridge::new();
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            bridge.subscribe(move |r: &GhostReport| log.borrow_mut().push((tag, r.node)));
        }

        assert_eq!(bridge.publish(&report(7)), 2);
        assert_eq!(
            *log.borrow(),
            vec![
                ("first", NodeId::from_raw(7)),
                ("second", NodeId::from_raw(7))
            ]
        );
        assert_eq!(bridge.published_count(), 1);
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let hits = Rc::new(RefCell::new(0));
        let mut bridge = GhostReportBridge::new();
        let counter = Rc::clone(&hits);
        let id = bridge.subscribe(move |_: &GhostReport| *counter.borrow_mut() += 1);

        bridge.publish(&report(1));
        assert!(bridge.unsubscribe(id));
        assert!(!bridge.unsubscribe(id));
        bridge.publish(&report(2));

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(bridge.subscriber_count(), 0);
    }

    #[test]
    fn subscription_ids_are_unique() {
        let mut bridge = GhostReportBridge::new();
        let a = bridge.subscribe(|_: &GhostReport| {});
        let b = bridge.subscribe(|_: &GhostReport| {});
        assert_ne!(a, b);
        bridge.clear();
        let c = bridge.subscribe(|_: &GhostReport| {});
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
