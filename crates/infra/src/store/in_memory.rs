use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use devtrack_auth::Role;
use devtrack_core::{CommentId, ProjectId, TicketId, UserId};
use devtrack_projects::{MemberEntry, Membership, Project, ProjectSummary};
use devtrack_tickets::{Comment, Ticket, TicketStatus, lane_max};

use super::{Constraint, Database, StoreError, StoreTx, UserRecord};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<UserId, UserRecord>,
    projects: HashMap<ProjectId, Project>,
    /// Enrollment order is listing order.
    memberships: Vec<Membership>,
    tickets: HashMap<TicketId, Ticket>,
    comments: HashMap<CommentId, Comment>,
}

impl Tables {
    fn title_taken(&self, ticket: &Ticket) -> bool {
        self.tickets.values().any(|t| {
            t.id != ticket.id && t.project_id == ticket.project_id && t.title == ticket.title
        })
    }

    fn remove_tickets(&mut self, ids: &HashSet<TicketId>) {
        self.tickets.retain(|id, _| !ids.contains(id));
        self.comments.retain(|_, c| !ids.contains(&c.ticket_id));
    }

    fn remove_project(&mut self, id: ProjectId) -> bool {
        if self.projects.remove(&id).is_none() {
            return false;
        }
        self.memberships.retain(|m| m.project_id != id);
        let doomed: HashSet<TicketId> = self
            .tickets
            .values()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();
        self.remove_tickets(&doomed);
        true
    }
}

/// In-memory database for tests/dev.
///
/// Transactions are serialized: `begin` takes an exclusive lock and works on
/// a copy of the tables that replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(InMemoryTx { guard, work }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        if self.work.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(Constraint::UserEmail));
        }
        self.work.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.work.users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError> {
        let tables = &mut self.work;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: Vec<ProjectId> = tables
            .projects
            .values()
            .filter(|p| p.owner_id == id)
            .map(|p| p.id)
            .collect();
        for project in owned {
            tables.remove_project(project);
        }

        tables.memberships.retain(|m| m.user_id != id);
        tables.comments.retain(|_, c| c.author_id != id);

        let created: HashSet<TicketId> = tables
            .tickets
            .values()
            .filter(|t| t.created_by == id)
            .map(|t| t.id)
            .collect();
        tables.remove_tickets(&created);

        for ticket in tables.tickets.values_mut() {
            if ticket.assigned_to == Some(id) {
                ticket.assigned_to = None;
            }
        }
        Ok(true)
    }

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError> {
        self.work.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn project_by_id(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.work.projects.get(&id).cloned())
    }

    async fn update_project(&mut self, project: &Project) -> Result<(), StoreError> {
        if let Some(existing) = self.work.projects.get_mut(&project.id) {
            *existing = project.clone();
        }
        Ok(())
    }

    async fn delete_project(&mut self, id: ProjectId) -> Result<bool, StoreError> {
        Ok(self.work.remove_project(id))
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        let exists = self.work.memberships.iter().any(|m| {
            m.user_id == membership.user_id && m.project_id == membership.project_id
        });
        if exists {
            return Err(StoreError::UniqueViolation(Constraint::Membership));
        }
        self.work.memberships.push(*membership);
        Ok(())
    }

    async fn role_of(&mut self, user: UserId, project: ProjectId) -> Result<Option<Role>, StoreError> {
        Ok(self
            .work
            .memberships
            .iter()
            .find(|m| m.user_id == user && m.project_id == project)
            .map(|m| m.role))
    }

    async fn members_of(&mut self, project: ProjectId) -> Result<Vec<MemberEntry>, StoreError> {
        let tables = &self.work;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.project_id == project)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|u| MemberEntry {
                    user_id: m.user_id,
                    email: u.email.clone(),
                    role: m.role,
                })
            })
            .collect())
    }

    async fn projects_of(&mut self, user: UserId) -> Result<Vec<ProjectSummary>, StoreError> {
        let tables = &self.work;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user)
            .filter_map(|m| {
                tables.projects.get(&m.project_id).map(|p| ProjectSummary {
                    project: p.clone(),
                    role: m.role,
                })
            })
            .collect())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        if self.work.title_taken(ticket) {
            return Err(StoreError::UniqueViolation(Constraint::TicketTitle));
        }
        self.work.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn ticket_by_id(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.work.tickets.get(&id).cloned())
    }

    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        if self.work.title_taken(ticket) {
            return Err(StoreError::UniqueViolation(Constraint::TicketTitle));
        }
        if let Some(existing) = self.work.tickets.get_mut(&ticket.id) {
            *existing = ticket.clone();
        }
        Ok(())
    }

    async fn delete_ticket(&mut self, id: TicketId) -> Result<bool, StoreError> {
        if !self.work.tickets.contains_key(&id) {
            return Ok(false);
        }
        self.work.remove_tickets(&HashSet::from([id]));
        Ok(true)
    }

    async fn tickets_in(&mut self, projects: &[ProjectId]) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .work
            .tickets
            .values()
            .filter(|t| projects.contains(&t.project_id))
            .cloned()
            .collect();
        tickets.sort_by_key(|t| (t.created_at, t.id));
        Ok(tickets)
    }

    async fn max_order(
        &mut self,
        project: ProjectId,
        status: TicketStatus,
    ) -> Result<Option<i64>, StoreError> {
        Ok(lane_max(
            self.work.tickets.values().filter(|t| t.project_id == project),
            status,
        ))
    }

    async fn insert_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        self.work.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn comment_by_id(&mut self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        Ok(self.work.comments.get(&id).cloned())
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        if let Some(existing) = self.work.comments.get_mut(&comment.id) {
            *existing = comment.clone();
        }
        Ok(())
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<bool, StoreError> {
        Ok(self.work.comments.remove(&id).is_some())
    }

    async fn comments_on(&mut self, ticket: TicketId) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .work
            .comments
            .values()
            .filter(|c| c.ticket_id == ticket)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use devtrack_projects::NewProject;
    use devtrack_tickets::NewTicket;

    use super::*;

    fn user(email: &str) -> UserRecord {
        UserRecord {
            id: UserId::new(),
            email: email.to_string(),
            name: email.to_string(),
            password_hash: "x".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let db = InMemoryDatabase::new();
        let alice = user("alice@example.com");

        let mut tx = db.begin().await.unwrap();
        tx.insert_user(&alice).await.unwrap();
        drop(tx);

        let mut tx = db.begin().await.unwrap();
        assert!(tx.user_by_id(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_and_membership_are_rejected() {
        let db = InMemoryDatabase::new();
        let alice = user("alice@example.com");
        let project = NewProject::new("Apollo", None).unwrap().into_project(alice.id, Utc::now());

        let mut tx = db.begin().await.unwrap();
        tx.insert_user(&alice).await.unwrap();
        let err = tx.insert_user(&user("alice@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(Constraint::UserEmail)));

        tx.insert_project(&project).await.unwrap();
        let m = Membership {
            user_id: alice.id,
            project_id: project.id,
            role: Role::Admin,
        };
        tx.insert_membership(&m).await.unwrap();
        let err = tx
            .insert_membership(&Membership { role: Role::Viewer, ..m })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(Constraint::Membership)));
        assert_eq!(tx.role_of(alice.id, project.id).await.unwrap(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_and_unassigns() {
        let db = InMemoryDatabase::new();
        let owner = user("owner@example.com");
        let dev = user("dev@example.com");
        let now = Utc::now();
        let project = NewProject::new("Apollo", None).unwrap().into_project(owner.id, now);

        let assigned = NewTicket {
            assigned_to: Some(dev.id),
            ..NewTicket::titled("assigned")
        }
        .into_ticket(project.id, owner.id, 1, now);
        let created_by_dev = NewTicket::titled("by dev").into_ticket(project.id, dev.id, 2, now);
        let note = Comment::new(assigned.id, dev.id, "on it", now).unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.insert_user(&owner).await.unwrap();
        tx.insert_user(&dev).await.unwrap();
        tx.insert_project(&project).await.unwrap();
        tx.insert_membership(&Membership {
            user_id: dev.id,
            project_id: project.id,
            role: Role::Dev,
        })
        .await
        .unwrap();
        tx.insert_ticket(&assigned).await.unwrap();
        tx.insert_ticket(&created_by_dev).await.unwrap();
        tx.insert_comment(&note).await.unwrap();
        assert!(tx.delete_user(dev.id).await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let kept = tx.ticket_by_id(assigned.id).await.unwrap().unwrap();
        assert_eq!(kept.assigned_to, None);
        assert!(tx.ticket_by_id(created_by_dev.id).await.unwrap().is_none());
        assert!(tx.comment_by_id(note.id).await.unwrap().is_none());
        assert!(tx.members_of(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_project_removes_its_tickets_and_comments() {
        let db = InMemoryDatabase::new();
        let owner = user("owner@example.com");
        let now = Utc::now();
        let project = NewProject::new("Apollo", None).unwrap().into_project(owner.id, now);
        let ticket = NewTicket::titled("t").into_ticket(project.id, owner.id, 1, now);
        let note = Comment::new(ticket.id, owner.id, "hi", now).unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.insert_user(&owner).await.unwrap();
        tx.insert_project(&project).await.unwrap();
        tx.insert_ticket(&ticket).await.unwrap();
        tx.insert_comment(&note).await.unwrap();
        assert!(tx.delete_project(project.id).await.unwrap());
        assert!(!tx.delete_project(project.id).await.unwrap());

        assert!(tx.ticket_by_id(ticket.id).await.unwrap().is_none());
        assert!(tx.comments_on(ticket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ticket_titles_are_unique_per_project_only() {
        let db = InMemoryDatabase::new();
        let owner = user("owner@example.com");
        let now = Utc::now();
        let a = NewProject::new("A", None).unwrap().into_project(owner.id, now);
        let b = NewProject::new("B", None).unwrap().into_project(owner.id, now);

        let mut tx = db.begin().await.unwrap();
        tx.insert_ticket(&NewTicket::titled("Fix").into_ticket(a.id, owner.id, 1, now))
            .await
            .unwrap();
        tx.insert_ticket(&NewTicket::titled("Fix").into_ticket(b.id, owner.id, 1, now))
            .await
            .unwrap();
        let err = tx
            .insert_ticket(&NewTicket::titled("Fix").into_ticket(a.id, owner.id, 2, now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(Constraint::TicketTitle)));
        assert_eq!(tx.max_order(a.id, TicketStatus::Todo).await.unwrap(), Some(1));
        assert_eq!(tx.max_order(a.id, TicketStatus::Done).await.unwrap(), None);
    }
}
