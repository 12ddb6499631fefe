use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use devtrack_core::{CommentId, TicketId};

use crate::app::dto::{self, ApiJson};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::CommentRequest>,
) -> axum::response::Response {
    let ticket_id: TicketId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .comments
        .create(principal.principal(), ticket_id, &body.comment)
        .await
    {
        Ok(view) => (StatusCode::CREATED, Json(dto::comment_to_json(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let ticket_id: TicketId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.comments.list(principal.principal(), ticket_id).await {
        Ok(views) => {
            let items = views.into_iter().map(dto::comment_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn edit_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::CommentRequest>,
) -> axum::response::Response {
    let comment_id: CommentId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .comments
        .edit(principal.principal(), comment_id, &body.comment)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(dto::comment_to_json(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let comment_id: CommentId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.comments.delete(principal.principal(), comment_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
