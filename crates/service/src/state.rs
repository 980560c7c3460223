use std::sync::Arc;

use common::actor::MemoryActorStore;
use common::auth::oauth::{HttpTokenExchange, OauthDisabled, TokenExchange};
use common::auth::Authenticator;
use common::property::MemoryPropertyStore;
use common::trust::{MemoryTrustStore, PeerClient, TrustEngine, TrustHooks};

use super::config::Config;

/// Main service state - wires the stores, the trust engine, and the
/// authentication resolver over one shared configuration
#[derive(Clone)]
pub struct State {
    config: Arc<common::config::Config>,
    actors: Arc<MemoryActorStore>,
    trusts: Arc<MemoryTrustStore>,
    properties: Arc<MemoryPropertyStore>,
    engine: Arc<TrustEngine<MemoryTrustStore>>,
    auth: Arc<Authenticator<MemoryActorStore, MemoryTrustStore, MemoryPropertyStore>>,
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        Self::build(Arc::new(config.core.clone()), None)
    }

    /// Same as [`Self::from_config`] but with trust lifecycle hooks
    /// registered on the engine.
    pub fn from_config_with_hooks(
        config: &Config,
        hooks: Arc<dyn TrustHooks>,
    ) -> Result<Self, StateSetupError> {
        Self::build(Arc::new(config.core.clone()), Some(hooks))
    }

    fn build(
        config: Arc<common::config::Config>,
        hooks: Option<Arc<dyn TrustHooks>>,
    ) -> Result<Self, StateSetupError> {
        if !config.root.ends_with('/') {
            return Err(StateSetupError::InvalidRoot);
        }

        let actors = Arc::new(MemoryActorStore::new());
        let trusts = Arc::new(MemoryTrustStore::new());
        let properties = Arc::new(MemoryPropertyStore::new());

        let client = PeerClient::new(config.peer_timeout);
        let mut engine = TrustEngine::new(config.clone(), trusts.clone(), client);
        if let Some(hooks) = hooks {
            engine = engine.with_hooks(hooks);
        }

        let exchange: Arc<dyn TokenExchange> = if config.oauth.enabled() {
            Arc::new(HttpTokenExchange::new(config.clone()))
        } else {
            Arc::new(OauthDisabled)
        };
        let auth = Arc::new(Authenticator::new(
            config.clone(),
            actors.clone(),
            trusts.clone(),
            properties.clone(),
            exchange,
        ));

        tracing::info!(
            "service state ready (root={}, type={})",
            config.root,
            config.actor_type
        );

        Ok(Self {
            config,
            actors,
            trusts,
            properties,
            engine: Arc::new(engine),
            auth,
        })
    }

    pub fn config(&self) -> &Arc<common::config::Config> {
        &self.config
    }

    pub fn actors(&self) -> &Arc<MemoryActorStore> {
        &self.actors
    }

    pub fn trusts(&self) -> &Arc<MemoryTrustStore> {
        &self.trusts
    }

    pub fn properties(&self) -> &Arc<MemoryPropertyStore> {
        &self.properties
    }

    pub fn engine(&self) -> &Arc<TrustEngine<MemoryTrustStore>> {
        &self.engine
    }

    pub fn auth(
        &self,
    ) -> &Arc<Authenticator<MemoryActorStore, MemoryTrustStore, MemoryPropertyStore>> {
        &self.auth
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("root URL must end with a trailing slash")]
    InvalidRoot,
}
