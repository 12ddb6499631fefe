use axum::{http::StatusCode, response::IntoResponse, Json};

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "DevTrack API" }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
