//! Tickets, their Kanban placement, and ticket comments.

pub mod comment;
pub mod ordering;
pub mod ticket;

pub use comment::Comment;
pub use ordering::{FIRST_ORDER, Placement, lane_max, resolve_order, sort_for_board, sort_newest_first};
pub use ticket::{IssueType, NewTicket, Priority, Ticket, TicketFilter, TicketPatch, TicketStatus};
