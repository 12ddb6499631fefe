use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devtrack_core::{DomainError, DomainResult, ProjectId, TicketId, UserId, bounded_text};

pub const MAX_TITLE_LEN: usize = 100;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $t:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub enum $t {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $t {
            pub const ALL: &'static [$t] = &[$($t::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($t::$variant => $wire),+
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($t::$variant),)+
                    other => Err(DomainError::validation(format!(
                        "unknown {} '{}'",
                        stringify!($t),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(
    /// Kind of work a ticket tracks.
    IssueType { Bug => "BUG", #[default] Task => "TASK", Feature => "FEATURE" }
);

wire_enum!(
    /// Kanban lane. Declaration order is board order (TODO first).
    TicketStatus { #[default] Todo => "TODO", InProgress => "IN_PROGRESS", Done => "DONE" }
);

wire_enum!(
    Priority { Low => "LOW", #[default] Medium => "MEDIUM", High => "HIGH", Urgent => "URGENT" }
);

/// A ticket scoped to one project.
///
/// # Invariants
/// - `(title, project_id)` is unique (enforced by the store).
/// - `assigned_to`, when set at assignment time, is a non-VIEWER member of
///   the same project (enforced by the ticket service).
/// - `order` is a display hint within the `(project, status)` lane; gaps and
///   duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub status: TicketStatus,
    pub priority: Priority,
    pub order: i64,
    pub project_id: ProjectId,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for ticket creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub status: TicketStatus,
    pub priority: Priority,
    pub assigned_to: Option<UserId>,
    /// Explicit lane position; computed by the ordering policy when absent.
    pub order: Option<i64>,
}

impl NewTicket {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Trim and bound the free-text fields.
    pub fn validate(mut self) -> DomainResult<Self> {
        self.title = bounded_text("title", &self.title, MAX_TITLE_LEN)?;
        self.description = self.description.trim().to_string();
        Ok(self)
    }

    pub fn into_ticket(
        self,
        project_id: ProjectId,
        created_by: UserId,
        order: i64,
        now: DateTime<Utc>,
    ) -> Ticket {
        Ticket {
            id: TicketId::new(),
            title: self.title,
            description: self.description,
            issue_type: self.issue_type,
            status: self.status,
            priority: self.priority,
            order,
            project_id,
            created_by,
            assigned_to: self.assigned_to,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial ticket update. `None` means "leave unchanged".
///
/// `assigned_to` is doubly optional: `Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Option<UserId>>,
    pub order: Option<i64>,
}

impl TicketPatch {
    /// True when nothing but `status`/`order` is present (the assignee's allowance).
    pub fn touches_only_placement(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.issue_type.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
    }

    /// The assignee this patch would set, if it sets one.
    pub fn new_assignee(&self) -> Option<UserId> {
        self.assigned_to.flatten()
    }

    /// Apply all present fields. Nothing is written if validation fails.
    pub fn apply(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> DomainResult<()> {
        let title = match &self.title {
            Some(t) => Some(bounded_text("title", t, MAX_TITLE_LEN)?),
            None => None,
        };

        if let Some(title) = title {
            ticket.title = title;
        }
        if let Some(description) = &self.description {
            ticket.description = description.trim().to_string();
        }
        if let Some(issue_type) = self.issue_type {
            ticket.issue_type = issue_type;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = self.assigned_to {
            ticket.assigned_to = assigned_to;
        }
        if let Some(order) = self.order {
            ticket.order = order;
        }
        ticket.updated_at = now;
        Ok(())
    }
}

/// Conjunctive listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of title OR description.
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        if self.issue_type.is_some_and(|t| t != ticket.issue_type) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                ticket.title.to_lowercase().contains(&needle)
                    || ticket.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}
