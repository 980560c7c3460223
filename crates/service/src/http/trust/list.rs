//! List trust relationships, optionally filtered

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use common::trust::{TrustFilter, TrustStore};

use super::super::auth::{self, AuthFailure};
use crate::State as ServiceState;

#[derive(Debug, Default, Deserialize)]
pub struct ListTrustQuery {
    pub relationship: Option<String>,
    pub peerid: Option<String>,
    #[serde(rename = "type")]
    pub peer_type: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    Query(query): Query<ListTrustQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ListTrustError> {
    let identity =
        auth::require(&state, &actor_id, &headers, "trust", "", &Method::GET, None).await?;

    let filter = TrustFilter {
        relationship: query.relationship,
        peer_id: query.peerid,
        peer_type: query.peer_type,
    };
    let rows = state
        .trusts()
        .list(&actor_id, &filter)
        .await
        .map_err(|e| ListTrustError::Internal(e.to_string()))?;
    if rows.is_empty() {
        return Err(ListTrustError::NoneFound);
    }

    let resources: Vec<_> = rows
        .iter()
        .map(|rel| super::to_resource(rel, &identity))
        .collect();
    Ok(Json(resources))
}

#[derive(Debug, thiserror::Error)]
pub enum ListTrustError {
    #[error("no matching trust relationships")]
    NoneFound,
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ListTrustError {
    fn into_response(self) -> Response {
        match self {
            ListTrustError::NoneFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ListTrustError::Auth(failure) => failure.into_response(),
            ListTrustError::Internal(e) => {
                tracing::error!("trust list error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
