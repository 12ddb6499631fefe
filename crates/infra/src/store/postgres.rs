//! Postgres-backed store.
//!
//! Each [`StoreTx`] wraps one SQL transaction. Referential cascades and unique
//! constraints live in the schema (`migrations/0001_devtrack.sql`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation(..)` by constraint name |
//! | Database (other) | any | `Unavailable` |
//! | PoolClosed / Io / other | N/A | `Unavailable` |

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use devtrack_auth::Role;
use devtrack_core::{CommentId, DomainError, ProjectId, TicketId, UserId};
use devtrack_projects::{MemberEntry, Membership, Project, ProjectSummary};
use devtrack_tickets::{Comment, Ticket, TicketStatus};

use super::{Constraint, Database, StoreError, StoreTx, UserRecord};

const SCHEMA: &str = include_str!("../../migrations/0001_devtrack.sql");

const TICKET_COLUMNS: &str = "id, title, description, issue_type, status, priority, position, \
     project_id, created_by, assigned_to, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, constraints and indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn insert_user(&mut self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("user_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO projects (id, name, description, owner_id, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*project.id.as_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(*project.owner_id.as_uuid())
        .bind(project.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_project", e))?;
        Ok(())
    }

    async fn project_by_id(&mut self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, owner_id, created_at FROM projects WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("project_by_id", e))?;
        row.as_ref().map(project_from_row).transpose()
    }

    async fn update_project(&mut self, project: &Project) -> Result<(), StoreError> {
        sqlx::query("UPDATE projects SET name = $2, description = $3 WHERE id = $1")
            .bind(*project.id.as_uuid())
            .bind(&project.name)
            .bind(&project.description)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_project", e))?;
        Ok(())
    }

    async fn delete_project(&mut self, id: ProjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_project", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO memberships (user_id, project_id, role) VALUES ($1, $2, $3)")
            .bind(*membership.user_id.as_uuid())
            .bind(*membership.project_id.as_uuid())
            .bind(membership.role.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_membership", e))?;
        Ok(())
    }

    async fn role_of(&mut self, user: UserId, project: ProjectId) -> Result<Option<Role>, StoreError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM memberships WHERE user_id = $1 AND project_id = $2")
                .bind(*user.as_uuid())
                .bind(*project.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("role_of", e))?;
        role.map(|r| parse_column("role", &r)).transpose()
    }

    async fn members_of(&mut self, project: ProjectId) -> Result<Vec<MemberEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.user_id, u.email, m.role
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.joined_at, m.user_id
            "#,
        )
        .bind(*project.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("members_of", e))?;

        rows.iter()
            .map(|row| {
                Ok(MemberEntry {
                    user_id: UserId::from_uuid(get(row, "user_id")?),
                    email: get(row, "email")?,
                    role: parse_column("role", &get::<String>(row, "role")?)?,
                })
            })
            .collect()
    }

    async fn projects_of(&mut self, user: UserId) -> Result<Vec<ProjectSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.owner_id, p.created_at, m.role
            FROM memberships m
            JOIN projects p ON p.id = m.project_id
            WHERE m.user_id = $1
            ORDER BY m.joined_at, p.id
            "#,
        )
        .bind(*user.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("projects_of", e))?;

        rows.iter()
            .map(|row| {
                Ok(ProjectSummary {
                    project: project_from_row(row)?,
                    role: parse_column("role", &get::<String>(row, "role")?)?,
                })
            })
            .collect()
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, title, description, issue_type, status, priority, position,
                project_id, created_by, assigned_to, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*ticket.id.as_uuid())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.issue_type.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.order)
        .bind(*ticket.project_id.as_uuid())
        .bind(*ticket.created_by.as_uuid())
        .bind(ticket.assigned_to.map(Uuid::from))
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_ticket", e))?;
        Ok(())
    }

    async fn ticket_by_id(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("ticket_by_id", e))?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn update_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE tickets
            SET title = $2, description = $3, issue_type = $4, status = $5, priority = $6,
                position = $7, assigned_to = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(*ticket.id.as_uuid())
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.issue_type.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.order)
        .bind(ticket.assigned_to.map(Uuid::from))
        .bind(ticket.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_ticket", e))?;
        Ok(())
    }

    async fn delete_ticket(&mut self, id: TicketId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_ticket", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn tickets_in(&mut self, projects: &[ProjectId]) -> Result<Vec<Ticket>, StoreError> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = projects.iter().map(|p| *p.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE project_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tickets_in", e))?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn max_order(
        &mut self,
        project: ProjectId,
        status: TicketStatus,
    ) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar("SELECT MAX(position) FROM tickets WHERE project_id = $1 AND status = $2")
            .bind(*project.as_uuid())
            .bind(status.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("max_order", e))
    }

    async fn insert_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO comments (id, ticket_id, author_id, body, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*comment.id.as_uuid())
        .bind(*comment.ticket_id.as_uuid())
        .bind(*comment.author_id.as_uuid())
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_comment", e))?;
        Ok(())
    }

    async fn comment_by_id(&mut self, id: CommentId) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query(
            "SELECT id, ticket_id, author_id, body, created_at FROM comments WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("comment_by_id", e))?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query("UPDATE comments SET body = $2 WHERE id = $1")
            .bind(*comment.id.as_uuid())
            .bind(&comment.text)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_comment", e))?;
        Ok(())
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn comments_on(&mut self, ticket: TicketId) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, ticket_id, author_id, body, created_at
            FROM comments
            WHERE ticket_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(*ticket.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("comments_on", e))?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Unavailable(format!("failed to decode column {column}: {e}")))
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e| StoreError::Unavailable(format!("corrupt {column} value: {e}")))
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        name: get(row, "name")?,
        password_hash: get(row, "password_hash")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<Project, StoreError> {
    Ok(Project {
        id: ProjectId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        owner_id: UserId::from_uuid(get(row, "owner_id")?),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    Ok(Ticket {
        id: TicketId::from_uuid(get(row, "id")?),
        title: get(row, "title")?,
        description: get(row, "description")?,
        issue_type: parse_column("issue_type", &get::<String>(row, "issue_type")?)?,
        status: parse_column("status", &get::<String>(row, "status")?)?,
        priority: parse_column("priority", &get::<String>(row, "priority")?)?,
        order: get(row, "position")?,
        project_id: ProjectId::from_uuid(get(row, "project_id")?),
        created_by: UserId::from_uuid(get(row, "created_by")?),
        assigned_to: get::<Option<Uuid>>(row, "assigned_to")?.map(UserId::from_uuid),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: CommentId::from_uuid(get(row, "id")?),
        ticket_id: TicketId::from_uuid(get(row, "ticket_id")?),
        author_id: UserId::from_uuid(get(row, "author_id")?),
        text: get(row, "body")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn constraint_for(name: &str) -> Option<Constraint> {
    match name {
        "users_email_key" => Some(Constraint::UserEmail),
        "memberships_user_project_key" => Some(Constraint::Membership),
        "tickets_project_title_key" => Some(Constraint::TicketTitle),
        _ => None,
    }
}

/// Map SQLx errors to StoreError with operation context.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                if let Some(constraint) = db_err.constraint().and_then(constraint_for) {
                    return StoreError::UniqueViolation(constraint);
                }
            }
            StoreError::Unavailable(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
