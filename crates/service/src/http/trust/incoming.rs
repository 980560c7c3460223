//! Peer-initiated trust creation (the recipient side of the handshake)

use axum::extract::{Json, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use common::actor::ActorStore;
use common::auth::AuthIdentity;
use common::trust::{TrustError, TrustRequest};

use crate::State as ServiceState;

/// No authentication beyond the protocol itself: the POST body carries
/// everything needed to record and verify peer intent.
pub async fn handler(
    State(state): State<ServiceState>,
    Path((actor_id, relationship)): Path<(String, String)>,
    Json(request): Json<TrustRequest>,
) -> Result<impl IntoResponse, IncomingTrustError> {
    let actor = state
        .actors()
        .get(&actor_id)
        .await
        .map_err(|e| IncomingTrustError::Internal(e.to_string()))?
        .ok_or(IncomingTrustError::ActorNotFound)?;

    let rel = state.engine().receive(&actor, &relationship, &request).await?;

    let status = if rel.approved {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    let location = format!(
        "{}/trust/{}/{}",
        state.config().actor_url(&actor_id),
        rel.relationship,
        rel.peer_id
    );
    // the initiator is entitled to the secret: it either chose it or must
    // learn the one generated here
    let body = super::to_resource(&rel, &AuthIdentity::peer(rel.peer_id.clone(), rel.relationship.clone()));
    Ok((status, [(header::LOCATION, location)], Json(body)))
}

#[derive(Debug, thiserror::Error)]
pub enum IncomingTrustError {
    #[error("actor not found")]
    ActorNotFound,
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for IncomingTrustError {
    fn into_response(self) -> Response {
        match self {
            IncomingTrustError::ActorNotFound => {
                (StatusCode::NOT_FOUND, "Actor not found").into_response()
            }
            IncomingTrustError::Trust(TrustError::Validation(reason)) => {
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            // an existing relationship cannot be replaced over the wire
            IncomingTrustError::Trust(TrustError::AlreadyExists(_)) => {
                (StatusCode::FORBIDDEN, "Forbidden").into_response()
            }
            IncomingTrustError::Trust(TrustError::SecretCollision) => {
                (StatusCode::FORBIDDEN, "Secret already in use").into_response()
            }
            IncomingTrustError::Trust(e) => {
                tracing::error!("inbound trust creation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            IncomingTrustError::Internal(e) => {
                tracing::error!("inbound trust endpoint error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
