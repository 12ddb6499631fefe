//! Transactional persistence for users, projects, memberships, tickets and comments.
//!
//! Every service operation runs against a single [`StoreTx`]: the membership
//! lookup that feeds authorization and the mutation it guards see the same
//! snapshot, and nothing is visible to other callers until [`StoreTx::commit`].
//! Dropping a transaction without committing discards its writes.
//!
//! Uniqueness is enforced here, not by read-then-write checks in callers:
//! - user email
//! - `(user_id, project_id)` membership
//! - `(title, project_id)` ticket title
//!
//! Deletes cascade:
//! - project -> memberships, tickets, comments on those tickets
//! - ticket -> comments
//! - user -> memberships, authored comments, owned projects, created tickets;
//!   tickets assigned to the user keep existing with `assigned_to = None`

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use devtrack_auth::{Principal, Role};
use devtrack_core::{CommentId, ProjectId, TicketId, UserId};
use devtrack_projects::{MemberEntry, Membership, Project, ProjectSummary};
use devtrack_tickets::{Comment, Ticket, TicketStatus};

pub use in_memory::InMemoryDatabase;
pub use postgres::PostgresDatabase;

/// Unique constraints surfaced to callers as typed conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    UserEmail,
    Membership,
    TicketTitle,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(Constraint),

    /// Connectivity, pool, or unexpected backend failure. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A registered account as persisted. Never serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// One unit of work against the store.
///
/// Listing methods return rows in creation order (`created_at`, then id) so
/// that callers applying a stable sort get deterministic results.
#[async_trait]
pub trait StoreTx: Send {
    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError>;
    async fn user_by_id(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError>;
    /// Lookup by normalized email.
    async fn user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    /// Returns false when the user did not exist.
    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError>;

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError>;
    async fn project_by_id(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError>;
    async fn update_project(&mut self, project: &Project) -> Result<(), StoreError>;
    async fn delete_project(&mut self, id: ProjectId) -> Result<bool, StoreError>;

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError>;
    async fn role_of(&mut self, user: UserId, project: ProjectId) -> Result<Option<Role>, StoreError>;
    /// Members of a project joined with their email, in enrollment order.
    async fn members_of(&mut self, project: ProjectId) -> Result<Vec<MemberEntry>, StoreError>;
    /// Projects the user belongs to with their role, in enrollment order.
    async fn projects_of(&mut self, user: UserId) -> Result<Vec<ProjectSummary>, StoreError>;

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;
    async fn ticket_by_id(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError>;
    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;
    async fn delete_ticket(&mut self, id: TicketId) -> Result<bool, StoreError>;
    async fn tickets_in(&mut self, projects: &[ProjectId]) -> Result<Vec<Ticket>, StoreError>;
    /// Highest `order` in the `(project, status)` lane.
    async fn max_order(
        &mut self,
        project: ProjectId,
        status: TicketStatus,
    ) -> Result<Option<i64>, StoreError>;

    async fn insert_comment(&mut self, comment: &Comment) -> Result<(), StoreError>;
    async fn comment_by_id(&mut self, id: CommentId) -> Result<Option<Comment>, StoreError>;
    async fn update_comment(&mut self, comment: &Comment) -> Result<(), StoreError>;
    async fn delete_comment(&mut self, id: CommentId) -> Result<bool, StoreError>;
    async fn comments_on(&mut self, ticket: TicketId) -> Result<Vec<Comment>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Source of transactions.
#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait]
impl<D> Database for Arc<D>
where
    D: Database + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        (**self).begin().await
    }
}
