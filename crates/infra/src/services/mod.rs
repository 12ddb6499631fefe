//! Application services.
//!
//! Each operation takes the calling [`Principal`](devtrack_auth::Principal)
//! explicitly, opens one store transaction, re-reads the principal's
//! membership, authorizes, mutates and commits.

pub mod comments;
pub mod dashboard;
pub mod error;
pub mod identity;
pub(crate) mod membership;
pub mod projects;
pub mod tickets;

#[cfg(test)]
pub(crate) mod testing;

pub use comments::{CommentService, CommentView};
pub use dashboard::{ActivityItem, DashboardService, DashboardStats, RECENT_ACTIVITY_LIMIT};
pub use error::{ErrorKind, ServiceError};
pub use identity::IdentityService;
pub use projects::ProjectService;
pub use tickets::{TicketService, TicketView};
