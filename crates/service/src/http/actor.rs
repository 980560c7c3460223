//! Actor root endpoints: identity inspection and cascade deletion

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::actor::ActorStore;
use common::property::PropertyStore;
use common::trust::{TrustError, TrustFilter};

use super::auth::{self, AuthFailure};
use crate::State as ServiceState;

pub async fn get_handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ActorError> {
    auth::require(&state, &actor_id, &headers, "", "", &Method::GET, None).await?;

    let actor = state
        .actors()
        .get(&actor_id)
        .await
        .map_err(|e| ActorError::Internal(e.to_string()))?
        .ok_or(ActorError::NotFound)?;

    Ok(Json(actor))
}

/// Deleting an actor tears down every trust relationship reciprocally
/// (peers are told to drop their mirrors), then drops properties and the
/// identity row itself.
pub async fn delete_handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ActorError> {
    auth::require(&state, &actor_id, &headers, "", "", &Method::DELETE, None).await?;

    state
        .actors()
        .get(&actor_id)
        .await
        .map_err(|e| ActorError::Internal(e.to_string()))?
        .ok_or(ActorError::NotFound)?;

    let peers_clean = state
        .engine()
        .remove(&actor_id, &TrustFilter::default(), true)
        .await?;
    if !peers_clean {
        tracing::warn!(
            "some peers of {} could not delete their mirrors during actor deletion",
            actor_id
        );
    }
    state
        .properties()
        .delete_all(&actor_id)
        .await
        .map_err(|e| ActorError::Internal(e.to_string()))?;
    state
        .actors()
        .delete(&actor_id)
        .await
        .map_err(|e| ActorError::Internal(e.to_string()))?;

    tracing::info!("deleted actor {}", actor_id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("actor not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ActorError {
    fn into_response(self) -> Response {
        match self {
            ActorError::NotFound => (StatusCode::NOT_FOUND, "Actor not found").into_response(),
            ActorError::Auth(failure) => failure.into_response(),
            ActorError::Trust(e) => {
                tracing::error!("trust teardown failed during actor deletion: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            ActorError::Internal(e) => {
                tracing::error!("actor endpoint error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
