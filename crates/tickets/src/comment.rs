use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devtrack_core::{CommentId, DomainResult, TicketId, UserId, bounded_text};

pub const MAX_COMMENT_LEN: usize = 5000;

/// A comment on a ticket. Only its text is mutable, and only by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        ticket_id: TicketId,
        author_id: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: CommentId::new(),
            ticket_id,
            author_id,
            text: bounded_text("comment", text, MAX_COMMENT_LEN)?,
            created_at: now,
        })
    }

    pub fn edit(&mut self, text: &str) -> DomainResult<()> {
        self.text = bounded_text("comment", text, MAX_COMMENT_LEN)?;
        Ok(())
    }
}
