use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use devtrack_core::ProjectId;
use devtrack_projects::NewProject;

use crate::app::dto::{self, ApiJson};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/member", get(list_members).post(add_member))
}

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreateProjectRequest>,
) -> axum::response::Response {
    let input = match NewProject::new(&body.name, body.description.as_deref()) {
        Ok(input) => input,
        Err(e) => return errors::service_error_to_response(e.into()),
    };

    match services.projects.create(principal.principal(), input).await {
        Ok(project) => (StatusCode::OK, Json(dto::project_to_json(project))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.projects.list(principal.principal()).await {
        Ok(summaries) => {
            let items = summaries
                .into_iter()
                .map(dto::project_summary_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.projects.get(principal.principal(), project_id).await {
        Ok(project) => (StatusCode::OK, Json(dto::project_to_json(project))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateProjectRequest>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .projects
        .update(principal.principal(), project_id, body.into())
        .await
    {
        Ok(project) => (StatusCode::OK, Json(dto::project_to_json(project))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.projects.delete(principal.principal(), project_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::AddMemberRequest>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .projects
        .add_member(principal.principal(), project_id, &body.email, body.role)
        .await
    {
        Ok(membership) => {
            (StatusCode::CREATED, Json(dto::membership_to_json(membership))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let project_id: ProjectId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .projects
        .list_members(principal.principal(), project_id)
        .await
    {
        Ok(members) => {
            let items = members.into_iter().map(dto::member_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
