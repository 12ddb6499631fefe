use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod projects;
pub mod system;
pub mod tickets;

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me).delete(auth::delete_me))
        .nest("/projects", projects::router())
        .route("/tickets", post(tickets::create_ticket).get(tickets::list_accessible))
        .route("/tickets/reorder", patch(tickets::reorder_ticket))
        .route("/tickets/project/:id", get(tickets::list_project_tickets))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route(
            "/tickets/:id/comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route(
            "/comments/:id",
            put(comments::edit_comment).delete(comments::delete_comment),
        )
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/recent-activity", get(dashboard::recent_activity))
}
