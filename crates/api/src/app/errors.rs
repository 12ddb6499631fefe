use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use devtrack_infra::{ErrorKind, ServiceError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let status = match err.kind() {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };

    let message = match &err {
        ServiceError::Forbidden(reason) => reason.message().to_string(),
        // Driver details stay in the logs.
        ServiceError::Unavailable(detail) => {
            tracing::error!(error = %detail, "store unavailable");
            "service unavailable, try again".to_string()
        }
        other => other.to_string(),
    };

    json_error(status, err.code(), message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, rejecting malformed ones with 400.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr,
{
    raw.parse::<T>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid id"))
}
