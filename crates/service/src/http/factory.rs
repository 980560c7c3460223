//! Actor factory endpoint

use axum::extract::{Json, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::actor::{Actor, ActorStore, ActorStoreError};

use crate::State as ServiceState;

/// Registration request for a new actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateActorRequest {
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub trustee: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActorResponse {
    pub id: String,
    pub creator: String,
    pub passphrase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trustee: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(request): Json<CreateActorRequest>,
) -> Result<impl IntoResponse, CreateActorError> {
    let actor = Actor::new(
        &state.config().root,
        &request.creator,
        request.passphrase.as_deref(),
        request.trustee.as_deref(),
    );
    state.actors().create(actor.clone()).await?;

    tracing::info!("created actor {} for {}", actor.id, actor.creator);
    let location = state.config().actor_url(&actor.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreateActorResponse {
            id: actor.id,
            creator: actor.creator,
            passphrase: actor.passphrase,
            trustee: actor.trustee,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum CreateActorError {
    #[error("actor store error: {0}")]
    Store(#[from] ActorStoreError),
}

impl IntoResponse for CreateActorError {
    fn into_response(self) -> Response {
        match self {
            CreateActorError::Store(ActorStoreError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, "Actor already exists").into_response()
            }
            CreateActorError::Store(e) => {
                tracing::error!("actor creation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
