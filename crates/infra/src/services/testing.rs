use std::sync::Arc;

use devtrack_auth::{Hs256TokenCodec, Principal, Role};
use devtrack_core::ProjectId;
use devtrack_projects::NewProject;
use devtrack_tickets::NewTicket;

use super::{
    CommentService, DashboardService, IdentityService, ProjectService, TicketService, TicketView,
};
use crate::store::{Database, InMemoryDatabase};

/// Services wired to one in-memory database.
pub(crate) struct Fixture {
    pub db: Arc<dyn Database>,
    pub identity: IdentityService,
    pub projects: ProjectService,
    pub tickets: TicketService,
    pub comments: CommentService,
    pub dashboard: DashboardService,
}

impl Fixture {
    pub async fn new() -> Self {
        let db: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
        let tokens = Arc::new(Hs256TokenCodec::new(b"test-secret", chrono::Duration::hours(1)));
        Self {
            identity: IdentityService::new(db.clone(), tokens, 4),
            projects: ProjectService::new(db.clone()),
            tickets: TicketService::new(db.clone()),
            comments: CommentService::new(db.clone()),
            dashboard: DashboardService::new(db.clone()),
            db,
        }
    }

    /// Register a user named after the local part of `email`.
    pub async fn user(&self, email: &str) -> Principal {
        let name = email.split('@').next().unwrap_or(email);
        self.identity.register(email, "password", name).await.unwrap()
    }

    pub async fn project(&self, owner: &Principal, name: &str) -> ProjectId {
        self.projects
            .create(owner, NewProject::new(name, None).unwrap())
            .await
            .unwrap()
            .id
    }

    pub async fn enroll(&self, admin: &Principal, project: ProjectId, user: &Principal, role: Role) {
        self.projects
            .add_member(admin, project, &user.email, role)
            .await
            .unwrap();
    }

    pub async fn ticket(&self, author: &Principal, project: ProjectId, title: &str) -> TicketView {
        self.tickets
            .create(author, project, NewTicket::titled(title))
            .await
            .unwrap()
    }
}
