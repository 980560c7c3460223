//! OAuth authorization-code callback

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use common::auth::oauth::OauthError;
use common::auth::OAUTH_COOKIE;

use crate::State as ServiceState;

#[derive(Debug, Deserialize)]
pub struct OauthCallbackQuery {
    pub code: Option<String>,
    /// path to send the browser back to once the cookie is set
    #[serde(default)]
    pub cookie_redirect: Option<String>,
}

/// Exchange the provider's authorization code for tokens, persist them,
/// and hand the browser a token cookie.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(actor_id): Path<String>,
    Query(query): Query<OauthCallbackQuery>,
) -> Result<impl IntoResponse, OauthCallbackError> {
    let code = query.code.ok_or(OauthCallbackError::MissingCode)?;

    let grant = state
        .auth()
        .tokens()
        .exchange_code(&actor_id, &code)
        .await?;

    let destination = query
        .cookie_redirect
        .unwrap_or_else(|| state.config().actor_url(&actor_id));
    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly",
        OAUTH_COOKIE, grant.access_token, grant.expires_in
    );
    Ok((
        StatusCode::FOUND,
        [
            (header::SET_COOKIE, cookie),
            (header::LOCATION, destination),
        ],
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum OauthCallbackError {
    #[error("missing authorization code")]
    MissingCode,
    #[error(transparent)]
    Oauth(#[from] OauthError),
}

impl IntoResponse for OauthCallbackError {
    fn into_response(self) -> Response {
        match self {
            OauthCallbackError::MissingCode => {
                (StatusCode::BAD_REQUEST, "Missing authorization code").into_response()
            }
            OauthCallbackError::Oauth(OauthError::Disabled) => {
                (StatusCode::NOT_FOUND, "OAuth is not configured").into_response()
            }
            OauthCallbackError::Oauth(e) => {
                tracing::warn!("token exchange failed: {}", e);
                (StatusCode::BAD_GATEWAY, "Token exchange failed").into_response()
            }
        }
    }
}
