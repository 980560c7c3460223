//! A single trust relationship resource

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use common::trust::{ApprovalBody, TrustChanges, TrustError, TrustRelationship, TrustStore};

use super::super::auth::{self, AuthFailure};
use crate::State as ServiceState;

/// Inspect one relationship.
///
/// When the caller is the peer the record names, the read doubles as
/// verification-token confirmation: proof the peer holds the shared
/// secret and can read back what it was given.
pub async fn get_handler(
    State(state): State<ServiceState>,
    Path((actor_id, relationship, peer_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, TrustResourceError> {
    let subpath = format!("{}/{}", relationship, peer_id);
    let identity = auth::require(
        &state,
        &actor_id,
        &headers,
        "trust",
        &subpath,
        &Method::GET,
        Some(&peer_id),
    )
    .await?;

    let rel = lookup(&state, &actor_id, &relationship, &peer_id).await?;
    let rel = if identity.peer_id.as_deref() == Some(peer_id.as_str()) {
        state.engine().confirm_verification(&actor_id, &peer_id).await?
    } else {
        rel
    };

    Ok(Json(super::to_resource(&rel, &identity)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyTrustRequest {
    pub baseuri: Option<String>,
    pub secret: Option<String>,
    pub desc: Option<String>,
    pub approved: Option<bool>,
}

/// Modify baseline attributes or flip our approval flag.
pub async fn put_handler(
    State(state): State<ServiceState>,
    Path((actor_id, relationship, peer_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(request): Json<ModifyTrustRequest>,
) -> Result<impl IntoResponse, TrustResourceError> {
    let subpath = format!("{}/{}", relationship, peer_id);
    auth::require(
        &state,
        &actor_id,
        &headers,
        "trust",
        &subpath,
        &Method::PUT,
        Some(&peer_id),
    )
    .await?;
    lookup(&state, &actor_id, &relationship, &peer_id).await?;

    let changes = TrustChanges {
        base_uri: request.baseuri,
        secret: request.secret,
        desc: request.desc,
    };
    if changes.is_empty() && request.approved.is_none() {
        return Err(TrustResourceError::NothingToChange);
    }

    if !changes.is_empty() {
        state.engine().update(&actor_id, &peer_id, changes).await?;
    }
    match request.approved {
        // flipping our own approval notifies the peer before committing
        Some(true) => {
            state.engine().approve(&actor_id, &peer_id).await?;
        }
        Some(false) => return Err(TrustResourceError::CannotUnapprove),
        None => {}
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Approval-change notification from the peer itself: its own `approved`
/// flag flipped, so our `peer_approved` mirror follows.
pub async fn post_handler(
    State(state): State<ServiceState>,
    Path((actor_id, relationship, peer_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<ApprovalBody>,
) -> Result<impl IntoResponse, TrustResourceError> {
    let subpath = format!("{}/{}", relationship, peer_id);
    let identity = auth::require(
        &state,
        &actor_id,
        &headers,
        "trust",
        &subpath,
        &Method::POST,
        Some(&peer_id),
    )
    .await?;

    // only the peer may assert its own approval state
    if identity.peer_id.as_deref() != Some(peer_id.as_str()) {
        return Err(TrustResourceError::Auth(AuthFailure::Forbidden));
    }
    lookup(&state, &actor_id, &relationship, &peer_id).await?;

    state
        .engine()
        .set_peer_approved(&actor_id, &peer_id, body.approved)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTrustQuery {
    /// set by a peer deleting its side: the mirror is already handled,
    /// do not call back
    #[serde(default)]
    pub peer: Option<bool>,
}

pub async fn delete_handler(
    State(state): State<ServiceState>,
    Path((actor_id, relationship, peer_id)): Path<(String, String, String)>,
    Query(query): Query<DeleteTrustQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, TrustResourceError> {
    let subpath = format!("{}/{}", relationship, peer_id);
    let identity = auth::require(
        &state,
        &actor_id,
        &headers,
        "trust",
        &subpath,
        &Method::DELETE,
        Some(&peer_id),
    )
    .await?;
    lookup(&state, &actor_id, &relationship, &peer_id).await?;

    // never call back toward the side the deletion came from
    let from_peer = query.peer.unwrap_or(false)
        || identity.peer_id.as_deref() == Some(peer_id.as_str());
    let filter = common::trust::TrustFilter {
        relationship: Some(relationship),
        peer_id: Some(peer_id),
        peer_type: None,
    };
    let peers_clean = state.engine().remove(&actor_id, &filter, !from_peer).await?;

    if peers_clean {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(TrustResourceError::PeerDeleteFailed)
    }
}

async fn lookup(
    state: &ServiceState,
    actor_id: &str,
    relationship: &str,
    peer_id: &str,
) -> Result<TrustRelationship, TrustResourceError> {
    let rel = state
        .trusts()
        .get(actor_id, peer_id)
        .await
        .map_err(|e| TrustResourceError::Internal(e.to_string()))?
        .ok_or(TrustResourceError::NotFound)?;
    if !rel.relationship.eq_ignore_ascii_case(relationship) {
        return Err(TrustResourceError::NotFound);
    }
    Ok(rel)
}

#[derive(Debug, thiserror::Error)]
pub enum TrustResourceError {
    #[error("trust relationship not found")]
    NotFound,
    #[error("nothing to change")]
    NothingToChange,
    #[error("approval cannot be withdrawn")]
    CannotUnapprove,
    #[error("peer could not delete its mirror")]
    PeerDeleteFailed,
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for TrustResourceError {
    fn into_response(self) -> Response {
        match self {
            TrustResourceError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            TrustResourceError::NothingToChange => {
                (StatusCode::BAD_REQUEST, "Nothing to change").into_response()
            }
            TrustResourceError::CannotUnapprove => (
                StatusCode::BAD_REQUEST,
                "Approval cannot be withdrawn; delete the relationship instead",
            )
                .into_response(),
            TrustResourceError::PeerDeleteFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Not able to delete relationship with peer",
            )
                .into_response(),
            TrustResourceError::Auth(failure) => failure.into_response(),
            TrustResourceError::Trust(TrustError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found").into_response()
            }
            TrustResourceError::Trust(TrustError::SecretCollision) => {
                (StatusCode::CONFLICT, "Secret already in use").into_response()
            }
            TrustResourceError::Trust(e) => {
                tracing::error!("trust resource error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            TrustResourceError::Internal(e) => {
                tracing::error!("trust resource error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
