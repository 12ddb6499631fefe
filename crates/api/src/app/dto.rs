use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use devtrack_auth::{Principal, Role};
use devtrack_core::{ProjectId, TicketId, UserId};
use devtrack_infra::{ActivityItem, CommentView, DashboardStats, TicketView};
use devtrack_projects::{MemberEntry, Membership, Project, ProjectPatch, ProjectSummary};
use devtrack_tickets::{IssueType, NewTicket, Placement, Priority, TicketFilter, TicketPatch, TicketStatus};

use crate::app::errors;

// -------------------------
// Extractor
// -------------------------

/// `Json<T>` whose rejections (bad syntax, unknown enum values, missing
/// fields) render as a 400 `validation_error` body.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
            )),
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateProjectRequest> for ProjectPatch {
    fn from(body: UpdateProjectRequest) -> Self {
        ProjectPatch {
            name: body.name,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "issueType")]
    pub issue_type: Option<IssueType>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    #[serde(alias = "projectId")]
    pub project_id: ProjectId,
    #[serde(alias = "assignedToId")]
    pub assigned_to_id: Option<UserId>,
    pub order: Option<i64>,
}

impl CreateTicketRequest {
    pub fn into_new_ticket(self) -> (ProjectId, NewTicket) {
        let ticket = NewTicket {
            title: self.title,
            description: self.description.unwrap_or_default(),
            issue_type: self.issue_type.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            assigned_to: self.assigned_to_id,
            order: self.order,
        };
        (self.project_id, ticket)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "issueType")]
    pub issue_type: Option<IssueType>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    /// Absent leaves the assignee alone; `null` unassigns.
    #[serde(default, alias = "assignedToId", deserialize_with = "present_or_null")]
    pub assigned_to_id: Option<Option<UserId>>,
    pub order: Option<i64>,
}

impl From<UpdateTicketRequest> for TicketPatch {
    fn from(body: UpdateTicketRequest) -> Self {
        TicketPatch {
            title: body.title,
            description: body.description,
            issue_type: body.issue_type,
            status: body.status,
            priority: body.priority,
            assigned_to: body.assigned_to_id,
            order: body.order,
        }
    }
}

fn present_or_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(alias = "ticketId")]
    pub ticket_id: TicketId,
    pub status: TicketStatus,
    pub order: i64,
}

impl ReorderRequest {
    pub fn placement(&self) -> Placement {
        Placement {
            status: self.status,
            order: self.order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

/// Query string of `GET /tickets/project/:id`. Unknown enum values reject the request.
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    #[serde(alias = "issueType")]
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

impl From<TicketQuery> for TicketFilter {
    fn from(q: TicketQuery) -> Self {
        TicketFilter {
            status: q.status,
            issue_type: q.issue_type,
            priority: q.priority,
            search: q.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn principal_to_json(p: &Principal) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "email": p.email,
        "name": p.name,
    })
}

pub fn project_to_json(p: Project) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "name": p.name,
        "description": p.description,
        "owner_id": p.owner_id.to_string(),
        "created_at": p.created_at,
    })
}

pub fn project_summary_to_json(s: ProjectSummary) -> serde_json::Value {
    serde_json::json!({
        "project_id": s.project.id.to_string(),
        "name": s.project.name,
        "role": s.role.as_str(),
    })
}

pub fn membership_to_json(m: Membership) -> serde_json::Value {
    serde_json::json!({
        "user_id": m.user_id.to_string(),
        "project_id": m.project_id.to_string(),
        "role": m.role.as_str(),
    })
}

pub fn member_to_json(m: MemberEntry) -> serde_json::Value {
    serde_json::json!({
        "user_id": m.user_id.to_string(),
        "email": m.email,
        "role": m.role.as_str(),
    })
}

pub fn ticket_to_json(v: TicketView) -> serde_json::Value {
    let t = v.ticket;
    serde_json::json!({
        "id": t.id.to_string(),
        "title": t.title,
        "description": t.description,
        "issue_type": t.issue_type.as_str(),
        "status": t.status.as_str(),
        "priority": t.priority.as_str(),
        "order": t.order,
        "project_id": t.project_id.to_string(),
        "created_by_id": t.created_by.to_string(),
        "assigned_to_id": t.assigned_to.map(|id| id.to_string()),
        "assigned_to_email": v.assigned_to_email,
        "created_at": t.created_at,
        "updated_at": t.updated_at,
    })
}

pub fn comment_to_json(v: CommentView) -> serde_json::Value {
    serde_json::json!({
        "id": v.comment.id.to_string(),
        "comment": v.comment.text,
        "user_id": v.comment.author_id.to_string(),
        "ticket_id": v.comment.ticket_id.to_string(),
        "created_at": v.comment.created_at,
        "username": v.username,
        "user_email": v.user_email,
    })
}

pub fn stats_to_json(s: DashboardStats) -> serde_json::Value {
    serde_json::json!({
        "total_projects": s.total_projects,
        "total_tickets": s.total_tickets,
        "todo_tickets": s.todo_tickets,
        "in_progress_tickets": s.in_progress_tickets,
        "completed_tickets": s.completed_tickets,
    })
}

pub fn activity_to_json(item: ActivityItem) -> serde_json::Value {
    let t = item.ticket.ticket;
    serde_json::json!({
        "id": t.id.to_string(),
        "title": t.title,
        "status": t.status.as_str(),
        "priority": t.priority.as_str(),
        "project_name": item.project_name,
        "assigned_to_email": item.ticket.assigned_to_email,
        "created_at": t.created_at,
    })
}
