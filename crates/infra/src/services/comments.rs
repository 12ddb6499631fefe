use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use devtrack_auth::{Action, Principal};
use devtrack_core::{CommentId, TicketId, UserId};
use devtrack_tickets::Comment;

use crate::store::{Database, StoreTx};

use super::ServiceError;
use super::membership::{ensure, project_access};
use super::tickets::load;

/// A comment with its author's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub comment: Comment,
    pub username: String,
    pub user_email: String,
}

/// Ticket discussion. Any member may read and post; only the author may
/// edit or delete, whatever their role.
pub struct CommentService {
    db: Arc<dyn Database>,
}

impl CommentService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, principal, text), fields(user_id = %principal.id), err)]
    pub async fn create(
        &self,
        principal: &Principal,
        ticket_id: TicketId,
        text: &str,
    ) -> Result<CommentView, ServiceError> {
        let mut tx = self.db.begin().await?;
        let ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(principal, &access, &Action::CreateComment)?;

        let comment = Comment::new(ticket_id, principal.id, text, Utc::now())?;
        tx.insert_comment(&comment).await?;
        tx.commit().await?;

        info!(comment_id = %comment.id, "comment added");
        Ok(CommentView {
            comment,
            username: principal.name.clone(),
            user_email: principal.email.clone(),
        })
    }

    /// Comments on a ticket, oldest first.
    pub async fn list(
        &self,
        principal: &Principal,
        ticket_id: TicketId,
    ) -> Result<Vec<CommentView>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(principal, &access, &Action::ReadTicket)?;

        let comments = tx.comments_on(ticket_id).await?;
        let mut authors: HashMap<UserId, (String, String)> = HashMap::new();
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            if !authors.contains_key(&comment.author_id) {
                let author = tx
                    .user_by_id(comment.author_id)
                    .await?
                    .map(|u| (u.name, u.email))
                    .unwrap_or_default();
                authors.insert(comment.author_id, author);
            }
            let (username, user_email) = authors
                .get(&comment.author_id)
                .cloned()
                .unwrap_or_default();
            views.push(CommentView {
                comment,
                username,
                user_email,
            });
        }
        Ok(views)
    }

    #[instrument(skip(self, principal, text), fields(user_id = %principal.id), err)]
    pub async fn edit(
        &self,
        principal: &Principal,
        comment_id: CommentId,
        text: &str,
    ) -> Result<CommentView, ServiceError> {
        let mut tx = self.db.begin().await?;
        let mut comment = load_comment(tx.as_mut(), comment_id).await?;
        let ticket = load(tx.as_mut(), comment.ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(
            principal,
            &access,
            &Action::EditComment {
                author: comment.author_id,
            },
        )?;

        comment.edit(text)?;
        tx.update_comment(&comment).await?;
        tx.commit().await?;

        info!(comment_id = %comment_id, "comment edited");
        Ok(CommentView {
            comment,
            username: principal.name.clone(),
            user_email: principal.email.clone(),
        })
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn delete(&self, principal: &Principal, comment_id: CommentId) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;
        let comment = load_comment(tx.as_mut(), comment_id).await?;
        let ticket = load(tx.as_mut(), comment.ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(
            principal,
            &access,
            &Action::DeleteComment {
                author: comment.author_id,
            },
        )?;

        tx.delete_comment(comment_id).await?;
        tx.commit().await?;

        info!(comment_id = %comment_id, "comment deleted");
        Ok(())
    }
}

async fn load_comment(tx: &mut dyn StoreTx, comment_id: CommentId) -> Result<Comment, ServiceError> {
    tx.comment_by_id(comment_id)
        .await?
        .ok_or(ServiceError::NotFound("comment"))
}
