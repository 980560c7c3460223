//! Actor capability probe consumed by peers during the trust handshake

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::actor::ActorStore;

use super::auth::{self, AuthFailure};
use crate::State as ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, MetaError> {
    auth::optional(&state, &actor_id, &headers, "meta", "", &Method::GET).await?;
    let actor = lookup(&state, &actor_id).await?;

    let config = state.config();
    Ok(Json(serde_json::json!({
        "id": actor.id,
        "type": config.actor_type,
        "version": config.version,
        "desc": format!("{} {}", config.desc, actor.id),
        "info": config.info,
        "trustee": actor.trustee,
    })))
}

pub async fn key_handler(
    State(state): State<ServiceState>,
    Path((actor_id, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, MetaError> {
    auth::optional(&state, &actor_id, &headers, "meta", &key, &Method::GET).await?;
    let actor = lookup(&state, &actor_id).await?;

    let config = state.config();
    let value = match key.as_str() {
        "id" => actor.id,
        "type" => config.actor_type.clone(),
        "version" => config.version.clone(),
        "desc" => format!("{} {}", config.desc, actor.id),
        "info" => config.info.clone(),
        "trustee" => actor.trustee.unwrap_or_default(),
        _ => return Err(MetaError::UnknownKey),
    };
    Ok(value)
}

async fn lookup(state: &ServiceState, actor_id: &str) -> Result<common::actor::Actor, MetaError> {
    state
        .actors()
        .get(actor_id)
        .await
        .map_err(|e| MetaError::Internal(e.to_string()))?
        .ok_or(MetaError::NotFound)
}

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("actor not found")]
    NotFound,
    #[error("unknown meta key")]
    UnknownKey,
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for MetaError {
    fn into_response(self) -> Response {
        match self {
            MetaError::NotFound => (StatusCode::NOT_FOUND, "Actor not found").into_response(),
            MetaError::UnknownKey => (StatusCode::NOT_FOUND, "Unknown meta key").into_response(),
            MetaError::Auth(failure) => failure.into_response(),
            MetaError::Internal(e) => {
                tracing::error!("meta endpoint error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
