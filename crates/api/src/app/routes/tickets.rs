use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use devtrack_core::{ProjectId, TicketId};

use crate::app::dto::{self, ApiJson};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn create_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreateTicketRequest>,
) -> axum::response::Response {
    let (project_id, input) = body.into_new_ticket();

    match services
        .tickets
        .create(principal.principal(), project_id, input)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(dto::ticket_to_json(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_accessible(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.tickets.list_accessible(principal.principal()).await {
        Ok(views) => tickets_response(views),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_project_tickets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    query: Result<Query<dto::TicketQuery>, QueryRejection>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
            );
        }
    };

    match services
        .tickets
        .list_by_project(principal.principal(), project_id, &query.into())
        .await
    {
        Ok(views) => tickets_response(views),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let ticket_id: TicketId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.tickets.get(principal.principal(), ticket_id).await {
        Ok(view) => (StatusCode::OK, Json(dto::ticket_to_json(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateTicketRequest>,
) -> axum::response::Response {
    let ticket_id: TicketId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .tickets
        .update(principal.principal(), ticket_id, body.into())
        .await
    {
        Ok(view) => (StatusCode::OK, Json(dto::ticket_to_json(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reorder_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::ReorderRequest>,
) -> axum::response::Response {
    match services
        .tickets
        .reorder(principal.principal(), body.ticket_id, body.placement())
        .await
    {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let ticket_id: TicketId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.tickets.delete(principal.principal(), ticket_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn tickets_response(views: Vec<devtrack_infra::TicketView>) -> axum::response::Response {
    let items = views.into_iter().map(dto::ticket_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(items)).into_response()
}
