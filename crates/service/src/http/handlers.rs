//! Shared fallback handlers

use axum::http::StatusCode;
use axum::response::IntoResponse;

pub async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
