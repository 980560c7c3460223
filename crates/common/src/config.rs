use std::time::Duration;

use rand::RngCore;
use uuid::Uuid;

use crate::auth::acl::AclTable;

/// Static configuration for a node hosting actors.
///
/// Passed by reference into the trust engine and the auth layer; there is
/// no process-global configuration object.
#[derive(Debug, Clone)]
pub struct Config {
    /// root URL all actors on this node are addressed under,
    ///  must end with a trailing slash
    pub root: String,
    /// actor-type URN advertised in /meta and in outbound
    ///  trust requests
    pub actor_type: String,
    /// human-readable description advertised in /meta
    pub desc: String,
    /// protocol version advertised in /meta
    pub version: String,
    /// informational URL advertised in /meta
    pub info: String,
    /// realm used in WWW-Authenticate challenges
    pub auth_realm: String,

    // trust policy
    /// relationship label assumed when an inbound trust request
    ///  does not name one
    pub default_relationship: String,
    /// auto-approve inbound requests for the default relationship
    pub auto_accept_default_relationship: bool,

    /// ordered access-control rule table, first match wins
    pub acl: AclTable,

    /// timeout applied to every outbound peer call
    pub peer_timeout: Duration,

    pub oauth: OauthConfig,
}

/// OAuth client settings. An empty `client_id` turns OAuth off.
#[derive(Debug, Clone, Default)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl OauthConfig {
    pub fn enabled(&self) -> bool {
        !self.client_id.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: "http://localhost:8080/".to_string(),
            actor_type: "urn:actant:actant.dev:demo".to_string(),
            desc: "Actant demo actor".to_string(),
            version: "1.0".to_string(),
            info: "https://github.com/actant-dev/actant".to_string(),
            auth_realm: "actant.dev".to_string(),
            default_relationship: "friend".to_string(),
            auto_accept_default_relationship: true,
            acl: AclTable::default(),
            peer_timeout: Duration::from_secs(20),
            oauth: OauthConfig::default(),
        }
    }
}

impl Config {
    /// Absolute URL of an actor hosted on this node.
    pub fn actor_url(&self, actor_id: &str) -> String {
        format!("{}{}", self.root, actor_id)
    }
}

/// Generate a new bearer secret or verification token: `length` chars of
/// lowercase hex from the OS RNG.
pub fn new_token(length: usize) -> String {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut token = hex::encode(bytes);
    token.truncate(length);
    token
}

/// Derive a stable actor id from a seed string (factory URL plus creation
/// timestamp). UUIDv5 over the URL namespace, hex without hyphens.
pub fn actor_id_from_seed(seed: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes())
        .simple()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_length_and_charset() {
        let token = new_token(40);
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let odd = new_token(9);
        assert_eq!(odd.len(), 9);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(new_token(40), new_token(40));
    }

    #[test]
    fn test_actor_id_is_stable() {
        let a = actor_id_from_seed("http://example.com/20250101T000000");
        let b = actor_id_from_seed("http://example.com/20250101T000000");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_actor_url() {
        let config = Config::default();
        assert_eq!(
            config.actor_url("abc123"),
            "http://localhost:8080/abc123"
        );
    }
}
