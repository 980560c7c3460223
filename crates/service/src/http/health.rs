//! Liveness endpoint

use axum::http::StatusCode;
use axum::response::IntoResponse;

pub async fn handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
