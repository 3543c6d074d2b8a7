pub mod resource;
pub mod stack_uptime;
pub mod stack_window;

use crate::events::CombatEvent;
use serde::{Deserialize, Serialize};

pub use resource::{AbilityResources, ResourceSummary, ResourceTracker};
pub use stack_uptime::{LevelUptime, StackUptimeSummary, StackUptimeTracker};
pub use stack_window::{StackWindowSummary, StackWindowTracker};

/// An event-driven accumulator for one tracked mechanic.
///
/// `handle` is called once per event, in timestamp order, and must never
/// fail: events for other abilities are ignored and malformed numeric fields
/// are coerced. `summary` is a pure read of the current state.
pub trait Analyzer: Send {
    /// Stable identifier used as the summary key in reports.
    fn key(&self) -> &str;

    fn handle(&mut self, event: &CombatEvent);

    fn summary(&self) -> Summary;
}

/// Read-only aggregate view produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Summary {
    StackWindow(StackWindowSummary),
    StackUptime(StackUptimeSummary),
    Resource(ResourceSummary),
}

/// `num / den`, or `None` when the denominator is zero.
///
/// `None` is the "undefined" state: the presentation layer shows a dash.
pub fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}
