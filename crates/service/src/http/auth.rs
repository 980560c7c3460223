//! Per-request authentication and authorization gate.

use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use common::auth::{AuthDecision, AuthError, AuthIdentity, AuthType, RequestAuth};

use crate::State;

#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("actor not found")]
    ActorNotFound,
    #[error("authentication required")]
    Unauthorized { realm: String },
    #[error("access denied")]
    Forbidden,
    /// OAuth suspension point: authentication incomplete, go here
    #[error("redirecting for authorization")]
    Redirect(String),
    #[error("auth backend error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        match self {
            AuthFailure::ActorNotFound => {
                (StatusCode::NOT_FOUND, "Actor not found").into_response()
            }
            AuthFailure::Unauthorized { realm } => (
                StatusCode::UNAUTHORIZED,
                [(
                    header::WWW_AUTHENTICATE,
                    format!("Basic realm=\"{}\"", realm),
                )],
                "Authentication required",
            )
                .into_response(),
            AuthFailure::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            AuthFailure::Redirect(url) => Redirect::temporary(&url).into_response(),
            AuthFailure::Internal(e) => {
                tracing::error!("auth backend error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<AuthError> for AuthFailure {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized { realm } => AuthFailure::Unauthorized { realm },
            AuthError::Forbidden => AuthFailure::Forbidden,
            AuthError::UnknownActor => AuthFailure::ActorNotFound,
            AuthError::Backend(e) => AuthFailure::Internal(e),
        }
    }
}

fn request_auth(headers: &HeaderMap) -> RequestAuth {
    RequestAuth::from_headers(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        headers.get(header::COOKIE).and_then(|v| v.to_str().ok()),
    )
}

/// Resolve credentials and consult the ACL; the request proceeds only
/// with a granted identity.
///
/// `owner_peer_id` is the peer id named in the path, enabling "owner"
/// rules regardless of relationship label.
pub async fn require(
    state: &State,
    actor_id: &str,
    headers: &HeaderMap,
    path: &str,
    subpath: &str,
    method: &Method,
    owner_peer_id: Option<&str>,
) -> Result<AuthIdentity, AuthFailure> {
    let decision = state
        .auth()
        .resolve(actor_id, &request_auth(headers), AuthType::Basic, true)
        .await?;
    let identity = match decision {
        AuthDecision::Authenticated(identity) => identity,
        AuthDecision::Redirect(url) => return Err(AuthFailure::Redirect(url)),
        AuthDecision::Unauthenticated => return Err(AuthFailure::Forbidden),
    };

    authorize(state, identity, path, subpath, method, owner_peer_id)
}

/// Like [`require`], but an absent or unmatched credential resolves to an
/// unauthenticated identity and the ACL decides whether that is enough.
pub async fn optional(
    state: &State,
    actor_id: &str,
    headers: &HeaderMap,
    path: &str,
    subpath: &str,
    method: &Method,
) -> Result<AuthIdentity, AuthFailure> {
    let decision = state
        .auth()
        .resolve(actor_id, &request_auth(headers), AuthType::Basic, false)
        .await?;
    let identity = match decision {
        AuthDecision::Authenticated(identity) => identity,
        AuthDecision::Redirect(url) => return Err(AuthFailure::Redirect(url)),
        AuthDecision::Unauthenticated => AuthIdentity::unauthenticated(),
    };

    authorize(state, identity, path, subpath, method, None)
}

fn authorize(
    state: &State,
    identity: AuthIdentity,
    path: &str,
    subpath: &str,
    method: &Method,
    owner_peer_id: Option<&str>,
) -> Result<AuthIdentity, AuthFailure> {
    match state
        .config()
        .acl
        .authorize(&identity, path, subpath, method, owner_peer_id)
    {
        Some(access) => {
            tracing::debug!(
                "granted {} {} {}/{} to {:?}",
                access.as_str(),
                method,
                path,
                subpath,
                identity.relationship
            );
            Ok(identity)
        }
        None => Err(AuthFailure::Forbidden),
    }
}
