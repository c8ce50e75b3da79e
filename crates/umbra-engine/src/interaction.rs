//! Report triggers placed on nodes.
//!
//! A [`ReportTrigger`] marks a node the player can report. It carries the
//! hint shown while the player is in range and its own "reported" listeners,
//! which fire on every report whether or not a ghost was there.

use std::fmt;

use serde::{Deserialize, Serialize};
use umbra_events::node::NodeId;

/// Hint shown for a trigger without an authored one.
pub const DEFAULT_REPORT_HINT: &str = "Press F to report ghost activity";

type ReportedHandler = Box<dyn FnMut(&str)>;

/// Interaction surface for reporting one node.
pub struct ReportTrigger {
    node: NodeId,
    hint_text: String,
    on_reported: Vec<ReportedHandler>,
}

impl fmt::Debug for ReportTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportTrigger")
            .field("node", &self.node)
            .field("hint_text", &self.hint_text)
            .field("on_reported", &self.on_reported.len())
            .finish()
    }
}

impl ReportTrigger {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            hint_text: DEFAULT_REPORT_HINT.to_owned(),
            on_reported: Vec::new(),
        }
    }

    pub fn with_hint(mut self, hint_text: impl Into<String>) -> Self {
        self.hint_text = hint_text.into();
        self
    }

    /// Add a listener that receives the reporter on every report.
    pub fn on_reported(mut self, handler: impl FnMut(&str) + 'static) -> Self {
        self.on_reported.push(Box::new(handler));
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn hint_text(&self) -> &str {
        &self.hint_text
    }

    /// Run every listener. Returns how many ran.
    pub(crate) fn fire(&mut self, reporter: &str) -> usize {
        for handler in &mut self.on_reported {
            handler(reporter);
        }
        self.on_reported.len()
    }
}

/// Result of [`Session::report_activity`](crate::session::Session::report_activity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportOutcome {
    /// The node was ghost-active; a report went out to `subscribers`
    /// handlers.
    GhostReported { subscribers: usize },
    /// The report completed but nothing ghostly was there.
    Reported,
    /// The session is torn down or the node does not exist.
    Ignored,
}

impl ReportOutcome {
    pub fn is_ghost(self) -> bool {
        matches!(self, ReportOutcome::GhostReported { .. })
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

    #[test]
    fn default_hint_text() {
        let trigger = ReportTrigger::new(NodeId::from_raw(1));
        assert_eq!(trigger.hint_text(), "Press F to report ghost activity");
        assert_eq!(trigger.with_hint("Press E").hint_text(), "Press E");
    }

    #[test]
    fn fire_passes_reporter_to_every_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        let b = Rc::clone(&seen);
        let mut trigger = ReportTrigger::new(NodeId::from_raw(2))
            .on_reported(move |who| a.borrow_mut().push(format!("a:{who}")))
            .on_reported(move |who| b.borrow_mut().push(format!("b:{who}")));

        assert_eq!(trigger.fire("mara"), 2);
        assert_eq!(*seen.borrow(), vec!["a:mara", "b:mara"]);
    }
}
