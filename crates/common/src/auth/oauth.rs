use std::sync::Arc;

use async_trait::async_trait;
use url::form_urlencoded;

use crate::config::Config;
use crate::property::{PropertyStore, PropertyStoreError};

/// Property names used for token bookkeeping.
const TOKEN_PROP: &str = "oauth_token";
const TOKEN_EXPIRY_PROP: &str = "oauth_token_expiry";
const REFRESH_PROP: &str = "oauth_refresh_token";
const REFRESH_EXPIRY_PROP: &str = "oauth_refresh_token_expiry";

/// Tokens are considered stale this many seconds before actual expiry.
const EXPIRY_SKEW_SECS: i64 = 20;

#[derive(thiserror::Error, Debug)]
pub enum OauthError {
    #[error("oauth is not configured")]
    Disabled,
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error(transparent)]
    Store(#[from] PropertyStoreError),
}

/// Result of a successful code or refresh exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_in: Option<u64>,
}

/// External collaborator performing the actual OAuth token exchange.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn request_token(&self, code: &str) -> Result<TokenGrant, OauthError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, OauthError>;
}

/// Token exchange against a real OAuth provider's token endpoint.
///
/// Posts JSON grant requests to the configured `token_uri` with the
/// client credentials attached.
pub struct HttpTokenExchange {
    config: Arc<Config>,
    client: reqwest::Client,
}

impl HttpTokenExchange {
    pub fn new(config: Arc<Config>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.peer_timeout)
            .build()
            .expect("failed to build http client");
        Self { config, client }
    }

    async fn post_grant(&self, params: serde_json::Value) -> Result<TokenGrant, OauthError> {
        let oauth = &self.config.oauth;
        let response = self
            .client
            .post(&oauth.token_uri)
            .json(&params)
            .send()
            .await
            .map_err(|e| OauthError::Exchange(e.to_string()))?;
        if !response.status().is_success() {
            return Err(OauthError::Exchange(format!(
                "token endpoint answered {}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct GrantBody {
            access_token: String,
            expires_in: u64,
            refresh_token: Option<String>,
            refresh_token_expires_in: Option<u64>,
        }
        let body: GrantBody = response
            .json()
            .await
            .map_err(|e| OauthError::Exchange(format!("malformed grant body: {}", e)))?;
        Ok(TokenGrant {
            access_token: body.access_token,
            expires_in: body.expires_in,
            refresh_token: body.refresh_token,
            refresh_token_expires_in: body.refresh_token_expires_in,
        })
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn request_token(&self, code: &str) -> Result<TokenGrant, OauthError> {
        let oauth = &self.config.oauth;
        self.post_grant(serde_json::json!({
            "grant_type": "authorization_code",
            "client_id": oauth.client_id,
            "client_secret": oauth.client_secret,
            "code": code,
            "redirect_uri": oauth.redirect_uri,
        }))
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, OauthError> {
        let oauth = &self.config.oauth;
        self.post_grant(serde_json::json!({
            "grant_type": "refresh_token",
            "client_id": oauth.client_id,
            "client_secret": oauth.client_secret,
            "refresh_token": refresh_token,
        }))
        .await
    }
}

/// Stand-in exchange for deployments with an empty client id.
pub struct OauthDisabled;

#[async_trait]
impl TokenExchange for OauthDisabled {
    async fn request_token(&self, _code: &str) -> Result<TokenGrant, OauthError> {
        Err(OauthError::Disabled)
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, OauthError> {
        Err(OauthError::Disabled)
    }
}

/// Per-actor OAuth token bookkeeping over the property store.
///
/// Expiry timestamps are stored as absolute epoch seconds so that validity
/// checks never depend on when the grant was observed.
pub struct TokenLifecycle<P: PropertyStore> {
    config: Arc<Config>,
    properties: Arc<P>,
    exchange: Arc<dyn TokenExchange>,
}

impl<P: PropertyStore> TokenLifecycle<P> {
    pub fn new(config: Arc<Config>, properties: Arc<P>, exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            config,
            properties,
            exchange,
        }
    }

    /// Whether a presented cookie token matches the stored one and is not
    /// within the expiry skew window.
    pub async fn valid_token(&self, actor_id: &str, presented: &str) -> Result<bool, OauthError> {
        let stored = match self.properties.get(actor_id, TOKEN_PROP).await? {
            Some(token) => token,
            None => return Ok(false),
        };
        if stored != presented {
            return Ok(false);
        }
        let expiry = self
            .properties
            .get(actor_id, TOKEN_EXPIRY_PROP)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        Ok(chrono::Utc::now().timestamp() < expiry - EXPIRY_SKEW_SECS)
    }

    /// Exchange an authorization code and persist the resulting grant.
    pub async fn exchange_code(
        &self,
        actor_id: &str,
        code: &str,
    ) -> Result<TokenGrant, OauthError> {
        if !self.config.oauth.enabled() {
            return Err(OauthError::Disabled);
        }
        let grant = self.exchange.request_token(code).await?;
        self.store_grant(actor_id, &grant).await?;
        Ok(grant)
    }

    /// Silently refresh the actor's access token from its stored refresh
    /// token, persisting the new grant on success.
    pub async fn refresh(&self, actor_id: &str) -> Result<String, OauthError> {
        if !self.config.oauth.enabled() {
            return Err(OauthError::Disabled);
        }
        let refresh_token = self
            .properties
            .get(actor_id, REFRESH_PROP)
            .await?
            .ok_or(OauthError::NoRefreshToken)?;

        let grant = self.exchange.refresh_token(&refresh_token).await?;
        self.store_grant(actor_id, &grant).await?;
        Ok(grant.access_token)
    }

    async fn store_grant(&self, actor_id: &str, grant: &TokenGrant) -> Result<(), OauthError> {
        let now = chrono::Utc::now().timestamp();
        self.properties
            .set(actor_id, TOKEN_PROP, &grant.access_token)
            .await?;
        self.properties
            .set(
                actor_id,
                TOKEN_EXPIRY_PROP,
                &(now + grant.expires_in as i64).to_string(),
            )
            .await?;
        if let Some(ref refresh) = grant.refresh_token {
            self.properties.set(actor_id, REFRESH_PROP, refresh).await?;
            if let Some(refresh_expires_in) = grant.refresh_token_expires_in {
                self.properties
                    .set(
                        actor_id,
                        REFRESH_EXPIRY_PROP,
                        &(now + refresh_expires_in as i64).to_string(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Drop the stored access token, forcing a refresh or a new
    /// authorization round on the next request.
    pub async fn clear_token(&self, actor_id: &str) -> Result<(), OauthError> {
        self.properties.delete(actor_id, TOKEN_PROP).await?;
        self.properties.delete(actor_id, TOKEN_EXPIRY_PROP).await?;
        Ok(())
    }

    /// URL of the provider's authorization endpoint, carrying our client
    /// settings and the caller's state.
    pub fn authorization_url(&self, state: &str) -> String {
        let oauth = &self.config.oauth;
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &oauth.client_id)
            .append_pair("redirect_uri", &oauth.redirect_uri)
            .append_pair("scope", &oauth.scope)
            .append_pair("state", state)
            .finish();
        format!("{}?{}", oauth.auth_uri, query)
    }
}
