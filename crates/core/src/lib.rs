//! `devtrack-core`: shared domain primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod text;

pub use error::{DomainError, DomainResult};
pub use id::{CommentId, ProjectId, TicketId, UserId};
pub use text::{bounded_text, normalize_email};
