//! Initiate a reciprocal trust relationship with a peer

use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use common::actor::ActorStore;
use common::trust::TrustError;

use super::super::auth::{self, AuthFailure};
use crate::State as ServiceState;

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateTrustRequest {
    /// the peer actor's root URL
    pub url: String,
    pub relationship: Option<String>,
    pub secret: Option<String>,
    #[serde(default)]
    pub desc: String,
    /// required peer actor type; mismatch rejects the handshake
    #[serde(rename = "type")]
    pub peer_type: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<InitiateTrustRequest>,
) -> Result<impl IntoResponse, InitiateTrustError> {
    let identity =
        auth::require(&state, &actor_id, &headers, "trust", "", &Method::POST, None).await?;

    if request.url.is_empty() {
        return Err(InitiateTrustError::MissingUrl);
    }
    let actor = state
        .actors()
        .get(&actor_id)
        .await
        .map_err(|e| InitiateTrustError::Internal(e.to_string()))?
        .ok_or(InitiateTrustError::ActorNotFound)?;

    let relationship = request
        .relationship
        .unwrap_or_else(|| state.config().default_relationship.clone());
    let rel = state
        .engine()
        .initiate(
            &actor,
            &request.url,
            &relationship,
            request.secret,
            &request.desc,
            request.peer_type.as_deref(),
        )
        .await?;

    let location = format!(
        "{}/trust/{}/{}",
        state.config().actor_url(&actor_id),
        rel.relationship,
        rel.peer_id
    );
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(super::to_resource(&rel, &identity)),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum InitiateTrustError {
    #[error("missing peer URL")]
    MissingUrl,
    #[error("actor not found")]
    ActorNotFound,
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for InitiateTrustError {
    fn into_response(self) -> Response {
        match self {
            InitiateTrustError::MissingUrl => {
                (StatusCode::BAD_REQUEST, "Missing peer URL").into_response()
            }
            InitiateTrustError::ActorNotFound => {
                (StatusCode::NOT_FOUND, "Actor not found").into_response()
            }
            InitiateTrustError::Auth(failure) => failure.into_response(),
            InitiateTrustError::Trust(e) => trust_error_response(e),
            InitiateTrustError::Internal(e) => {
                tracing::error!("trust initiation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

fn trust_error_response(e: TrustError) -> Response {
    match e {
        TrustError::Validation(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
        TrustError::SecretCollision => {
            (StatusCode::CONFLICT, "Secret already in use").into_response()
        }
        TrustError::AlreadyExists(_) => (
            StatusCode::CONFLICT,
            "Trust relationship already exists",
        )
            .into_response(),
        TrustError::Peer(e) => {
            tracing::warn!("peer refused trust initiation: {}", e);
            (StatusCode::BAD_GATEWAY, "Peer refused the trust request").into_response()
        }
        TrustError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
        TrustError::Store(e) => {
            tracing::error!("trust store error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
