pub mod acl;
pub mod oauth;

use std::sync::Arc;

use base64::Engine;

use crate::actor::{Actor, ActorStore, ActorStoreError};
use crate::config::Config;
use crate::property::PropertyStore;
use crate::trust::{TrustStore, TrustStoreError};

use oauth::{OauthError, TokenExchange, TokenLifecycle};

/// Cookie carrying a previously-issued OAuth access token.
pub const OAUTH_COOKIE: &str = "oauth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// 401 with a basic challenge for the configured realm
    #[error("authentication required")]
    Unauthorized { realm: String },
    /// 403, used for non-basic schemes
    #[error("access denied")]
    Forbidden,
    #[error("actor not found")]
    UnknownActor,
    #[error("auth backend error: {0}")]
    Backend(String),
}

impl From<ActorStoreError> for AuthError {
    fn from(e: ActorStoreError) -> Self {
        AuthError::Backend(e.to_string())
    }
}

impl From<TrustStoreError> for AuthError {
    fn from(e: TrustStoreError) -> Self {
        AuthError::Backend(e.to_string())
    }
}

impl From<OauthError> for AuthError {
    fn from(e: OauthError) -> Self {
        AuthError::Backend(e.to_string())
    }
}

/// Authentication scheme expected for the requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Basic,
    Oauth,
}

/// Credentials extracted from an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestAuth {
    pub bearer: Option<String>,
    pub basic: Option<(String, String)>,
    pub cookie_token: Option<String>,
}

impl RequestAuth {
    /// Parse the Authorization and Cookie header values.
    pub fn from_headers(authorization: Option<&str>, cookie: Option<&str>) -> Self {
        let mut auth = RequestAuth::default();

        if let Some(header) = authorization {
            if let Some(token) = header.strip_prefix("Bearer ") {
                auth.bearer = Some(token.trim().to_string());
            } else if let Some(encoded) = header.strip_prefix("Basic ") {
                auth.basic = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .and_then(|decoded| {
                        decoded
                            .split_once(':')
                            .map(|(user, pass)| (user.to_string(), pass.to_string()))
                    });
            }
        }

        if let Some(cookie) = cookie {
            auth.cookie_token = cookie.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == OAUTH_COOKIE).then(|| value.to_string())
            });
        }

        auth
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn basic(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            basic: Some((user.into(), pass.into())),
            ..Self::default()
        }
    }
}

/// The identity a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    /// peer actor id for bearer-authenticated peers, None for the creator
    pub peer_id: Option<String>,
    /// relationship label: a trust label, or "creator" for basic/oauth
    pub relationship: Option<String>,
    pub authenticated: bool,
}

impl AuthIdentity {
    pub fn unauthenticated() -> Self {
        Self {
            peer_id: None,
            relationship: None,
            authenticated: false,
        }
    }

    pub fn creator() -> Self {
        Self {
            peer_id: None,
            relationship: Some("creator".to_string()),
            authenticated: true,
        }
    }

    pub fn peer(peer_id: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            peer_id: Some(peer_id.into()),
            relationship: Some(relationship.into()),
            authenticated: true,
        }
    }
}

/// Outcome of authentication resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authenticated(AuthIdentity),
    /// no credentials matched and the caller opted out of enforcement
    Unauthenticated,
    /// authentication incomplete: send the caller to this authorization
    /// URL (OAuth suspension point, not an error)
    Redirect(String),
}

/// Resolves request credentials to an authenticated identity.
///
/// Attempts, in priority order: bearer token against trust secrets, OAuth
/// cookie/refresh (only for oauth-typed paths), then basic credentials
/// against the actor's creator/passphrase. First success wins.
pub struct Authenticator<A, T, P>
where
    A: ActorStore,
    T: TrustStore,
    P: PropertyStore,
{
    config: Arc<Config>,
    actors: Arc<A>,
    trusts: Arc<T>,
    tokens: TokenLifecycle<P>,
}

impl<A, T, P> Authenticator<A, T, P>
where
    A: ActorStore,
    T: TrustStore,
    P: PropertyStore,
{
    pub fn new(
        config: Arc<Config>,
        actors: Arc<A>,
        trusts: Arc<T>,
        properties: Arc<P>,
        exchange: Arc<dyn TokenExchange>,
    ) -> Self {
        let tokens = TokenLifecycle::new(config.clone(), properties, exchange);
        Self {
            config,
            actors,
            trusts,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenLifecycle<P> {
        &self.tokens
    }

    /// Resolve the request against one actor's credentials.
    ///
    /// With `enforce` set, an unmatched request becomes an error carrying
    /// the scheme-appropriate status; without it, the caller receives an
    /// unauthenticated decision and decides for itself (optional-auth
    /// probing).
    pub async fn resolve(
        &self,
        actor_id: &str,
        request: &RequestAuth,
        auth_type: AuthType,
        enforce: bool,
    ) -> Result<AuthDecision, AuthError> {
        let actor = self
            .actors
            .get(actor_id)
            .await?
            .ok_or(AuthError::UnknownActor)?;

        // 1. bearer token against trust secrets
        if let Some(ref token) = request.bearer {
            if let Some(rel) = self.trusts.get_by_secret(actor_id, token).await? {
                tracing::debug!(
                    "bearer token resolved to peer {} ({})",
                    rel.peer_id,
                    rel.relationship
                );
                return Ok(AuthDecision::Authenticated(AuthIdentity::peer(
                    rel.peer_id,
                    rel.relationship,
                )));
            }
        }

        // 2. oauth cookie, then silent refresh, then redirect
        if auth_type == AuthType::Oauth && self.config.oauth.enabled() {
            return self.resolve_oauth(&actor, request).await;
        }

        // 3. basic credentials against creator/passphrase
        if let Some((ref user, ref pass)) = request.basic {
            if user == &actor.creator && pass == &actor.passphrase {
                tracing::debug!("basic credentials resolved to creator of {}", actor_id);
                return Ok(AuthDecision::Authenticated(AuthIdentity::creator()));
            }
        }

        if !enforce {
            return Ok(AuthDecision::Unauthenticated);
        }
        match auth_type {
            AuthType::Basic => Err(AuthError::Unauthorized {
                realm: self.config.auth_realm.clone(),
            }),
            AuthType::Oauth => Err(AuthError::Forbidden),
        }
    }

    async fn resolve_oauth(
        &self,
        actor: &Actor,
        request: &RequestAuth,
    ) -> Result<AuthDecision, AuthError> {
        if let Some(ref cookie) = request.cookie_token {
            if self.tokens.valid_token(&actor.id, cookie).await? {
                return Ok(AuthDecision::Authenticated(AuthIdentity::creator()));
            }
            // a stale cookie is dropped so the next round starts clean
            self.tokens.clear_token(&actor.id).await?;
        }

        match self.tokens.refresh(&actor.id).await {
            Ok(_) => Ok(AuthDecision::Authenticated(AuthIdentity::creator())),
            Err(e) => {
                tracing::debug!(
                    "oauth refresh for {} failed ({}), redirecting to provider",
                    actor.id,
                    e
                );
                Ok(AuthDecision::Redirect(
                    self.tokens.authorization_url(&actor.id),
                ))
            }
        }
    }
}
