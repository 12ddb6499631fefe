//! Board ordering policy.
//!
//! `order` is advisory sequencing inside a `(project, status)` lane, not a
//! dense rank. New tickets go to the end of their lane; drags write the
//! caller's target directly and siblings are never renumbered, so gaps and
//! duplicate values are expected. Display order is a stable sort on
//! `(status, order)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Ticket, TicketStatus};

/// Order assigned to the first ticket of an empty lane.
pub const FIRST_ORDER: i64 = 1;

/// Target lane and position for a drag-and-drop move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub status: TicketStatus,
    pub order: i64,
}

impl Placement {
    pub fn apply(&self, ticket: &mut Ticket, now: DateTime<Utc>) {
        ticket.status = self.status;
        ticket.order = self.order;
        ticket.updated_at = now;
    }
}

/// Order for a ticket appended to a lane whose current maximum is `lane_max`.
pub fn next_order(lane_max: Option<i64>) -> i64 {
    lane_max.map_or(FIRST_ORDER, |max| max.saturating_add(1))
}

/// Explicit order wins; otherwise append to the lane.
pub fn resolve_order(explicit: Option<i64>, lane_max: Option<i64>) -> i64 {
    explicit.unwrap_or_else(|| next_order(lane_max))
}

/// Highest `order` among `tickets` in `status`.
///
/// Callers pass tickets of a single project.
pub fn lane_max<'a>(tickets: impl IntoIterator<Item = &'a Ticket>, status: TicketStatus) -> Option<i64> {
    tickets
        .into_iter()
        .filter(|t| t.status == status)
        .map(|t| t.order)
        .max()
}

/// Board order: `(status, order)` ascending, stable for duplicates.
pub fn sort_for_board(tickets: &mut [Ticket]) {
    tickets.sort_by_key(|t| (t.status, t.order));
}

/// Activity order: newest first. Ids break timestamp ties (v7 ids are time-ordered).
pub fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}
