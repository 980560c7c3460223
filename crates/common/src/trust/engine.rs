use std::sync::Arc;

use async_trait::async_trait;

use crate::actor::Actor;
use crate::config::{new_token, Config};

use super::client::{CreatedStatus, PeerClient, PeerClientError, TrustRequest};
use super::store::{TrustStore, TrustStoreError};
use super::{TrustFilter, TrustRelationship};

#[derive(thiserror::Error, Debug)]
pub enum TrustError {
    /// missing or malformed required fields, rejected before any
    ///  network call
    #[error("invalid trust request: {0}")]
    Validation(String),
    #[error("secret collides with an existing trust relationship")]
    SecretCollision,
    #[error("trust relationship already exists for peer {0}")]
    AlreadyExists(String),
    #[error("trust relationship not found")]
    NotFound,
    #[error(transparent)]
    Peer(#[from] PeerClientError),
    #[error(transparent)]
    Store(TrustStoreError),
}

impl From<TrustStoreError> for TrustError {
    fn from(e: TrustStoreError) -> Self {
        match e {
            TrustStoreError::AlreadyExists(peer_id) => TrustError::AlreadyExists(peer_id),
            TrustStoreError::SecretCollision => TrustError::SecretCollision,
            other => TrustError::Store(other),
        }
    }
}

/// Extension points fired after trust state changes commit locally.
///
/// Registered explicitly on the engine; application-specific behavior hangs
/// off these instead of patching the engine itself.
#[async_trait]
pub trait TrustHooks: Send + Sync {
    async fn on_trust_created(&self, rel: &TrustRelationship) {
        let _ = rel;
    }

    async fn on_trust_deleted(&self, rel: &TrustRelationship) {
        let _ = rel;
    }
}

/// Default no-op hook registration.
pub struct NoHooks;

#[async_trait]
impl TrustHooks for NoHooks {}

/// Single-field-level changes applied through [`TrustEngine::update`].
#[derive(Debug, Clone, Default)]
pub struct TrustChanges {
    pub base_uri: Option<String>,
    pub secret: Option<String>,
    pub desc: Option<String>,
}

impl TrustChanges {
    pub fn is_empty(&self) -> bool {
        self.base_uri.is_none() && self.secret.is_none() && self.desc.is_none()
    }
}

/// Orchestrates the bilateral trust handshake between actors.
///
/// Every flow keeps one invariant above all others: a peer failure during
/// establishment unwinds any partial local write, and a peer failure during
/// teardown never blocks local cleanup.
pub struct TrustEngine<S: TrustStore> {
    config: Arc<Config>,
    store: Arc<S>,
    client: PeerClient,
    hooks: Arc<dyn TrustHooks>,
}

impl<S: TrustStore> TrustEngine<S> {
    pub fn new(config: Arc<Config>, store: Arc<S>, client: PeerClient) -> Self {
        Self {
            config,
            store,
            client,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn TrustHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Initiate a reciprocal trust relationship with the peer at
    /// `peer_uri`.
    ///
    /// Probes the peer's `/meta`, creates the local row with our intent
    /// asserted (`approved=true`), then asks the peer to create its
    /// mirror. A peer answer other than 201/202 rolls the local row back;
    /// a 201 marks `peer_approved` directly with no further callback.
    pub async fn initiate(
        &self,
        actor: &Actor,
        peer_uri: &str,
        relationship: &str,
        secret: Option<String>,
        desc: &str,
        require_type: Option<&str>,
    ) -> Result<TrustRelationship, TrustError> {
        // 1. probe the peer; any failure aborts with no local state
        let meta = self.client.fetch_meta(peer_uri).await?;
        if meta.id.is_empty() || meta.actor_type.is_empty() {
            return Err(TrustError::Validation(
                "peer meta is missing id or type".to_string(),
            ));
        }
        if meta.id == actor.id {
            return Err(TrustError::Validation(
                "cannot create a trust relationship with self".to_string(),
            ));
        }
        if let Some(required) = require_type {
            if !meta.actor_type.eq_ignore_ascii_case(required) {
                return Err(TrustError::Validation(format!(
                    "peer type {} does not match required type {}",
                    meta.actor_type, required
                )));
            }
        }

        let secret = secret.filter(|s| !s.is_empty()).unwrap_or_else(|| new_token(40));
        let verification_token = new_token(40);

        // 2. record local intent before contacting the peer
        let rel = TrustRelationship {
            actor_id: actor.id.clone(),
            peer_id: meta.id.clone(),
            relationship: relationship.to_string(),
            base_uri: peer_uri.trim_end_matches('/').to_string(),
            secret: secret.clone(),
            peer_type: meta.actor_type.clone(),
            approved: true,
            peer_approved: false,
            verified: false,
            verification_token: Some(verification_token.clone()),
            desc: desc.to_string(),
        };
        self.store.create(rel.clone()).await?;

        // 3. ask the peer for its mirror; roll back the local row on
        //    anything but 201/202
        let request = TrustRequest {
            baseuri: self.config.actor_url(&actor.id),
            id: actor.id.clone(),
            actor_type: self.config.actor_type.clone(),
            secret: Some(secret),
            desc: desc.to_string(),
            verify: Some(verification_token),
        };
        let status = match self
            .client
            .create_trust(peer_uri, relationship, &request)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    "peer {} refused trust creation, rolling back local row: {}",
                    meta.id,
                    e
                );
                if let Err(del) = self.store.delete(&actor.id, &meta.id).await {
                    tracing::error!("rollback of trust row for {} failed: {}", meta.id, del);
                }
                return Err(e.into());
            }
        };

        // 4. re-read the row: the peer's verification callback may already
        //    have confirmed it while our POST was in flight. A 201 also
        //    proves peer intent, corrected locally without another round
        //    trip.
        let mut rel = self
            .store
            .get(&actor.id, &meta.id)
            .await?
            .ok_or(TrustError::NotFound)?;
        if status == CreatedStatus::AutoApproved {
            rel.peer_approved = true;
            self.store.modify(rel.clone()).await?;
        }

        tracing::info!(
            "established trust {}/{} with peer {} (peer_approved={})",
            actor.id,
            relationship,
            rel.peer_id,
            rel.peer_approved
        );
        self.hooks.on_trust_created(&rel).await;
        Ok(rel)
    }

    /// Create the local record for a peer-initiated trust request.
    ///
    /// The inbound POST itself is taken as evidence of peer intent, so
    /// `peer_approved` starts true; our own approval depends on the
    /// auto-accept policy. Verification calls back to the peer and
    /// compares its stored token against the one supplied in the request;
    /// the row persists even when that check fails.
    pub async fn receive(
        &self,
        actor: &Actor,
        relationship: &str,
        request: &TrustRequest,
    ) -> Result<TrustRelationship, TrustError> {
        if request.baseuri.is_empty() || request.id.is_empty() || request.actor_type.is_empty() {
            return Err(TrustError::Validation(
                "baseuri, id, and type are mandatory".to_string(),
            ));
        }

        let approved = relationship.eq_ignore_ascii_case(&self.config.default_relationship)
            && self.config.auto_accept_default_relationship;

        let secret = request
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| new_token(40));

        let rel = TrustRelationship {
            actor_id: actor.id.clone(),
            peer_id: request.id.clone(),
            relationship: relationship.to_string(),
            base_uri: request.baseuri.trim_end_matches('/').to_string(),
            secret: secret.clone(),
            peer_type: request.actor_type.clone(),
            approved,
            peer_approved: true,
            verified: false,
            verification_token: Some(new_token(40)),
            desc: request.desc.clone(),
        };
        self.store.create(rel.clone()).await?;

        // advisory verification: read our record back from the initiator
        // and compare tokens
        let verified = match &request.verify {
            Some(expected) => match self
                .client
                .fetch_trust(&request.baseuri, relationship, &actor.id, &secret)
                .await
            {
                Ok(resource) => resource.verification_token.as_deref() == Some(expected.as_str()),
                Err(e) => {
                    tracing::warn!(
                        "verification callback to peer {} failed, keeping row unverified: {}",
                        request.id,
                        e
                    );
                    false
                }
            },
            None => false,
        };

        let rel = {
            let mut rel = self
                .store
                .get(&actor.id, &request.id)
                .await?
                .ok_or(TrustError::NotFound)?;
            rel.verified = verified;
            self.store.modify(rel.clone()).await?;
            rel
        };

        tracing::info!(
            "accepted trust {}/{} from peer {} (approved={}, verified={})",
            actor.id,
            relationship,
            rel.peer_id,
            rel.approved,
            rel.verified
        );
        self.hooks.on_trust_created(&rel).await;
        Ok(rel)
    }

    /// Tear down every relationship matching the filter.
    ///
    /// With `delete_peer`, each peer's mirror is deleted first; a 404 from
    /// the peer counts as success, any other failure is recorded but never
    /// blocks the remaining deletions. Local rows are always removed.
    /// Returns true only if no attempted peer call failed.
    pub async fn remove(
        &self,
        actor_id: &str,
        filter: &TrustFilter,
        delete_peer: bool,
    ) -> Result<bool, TrustError> {
        let rows = self.store.list(actor_id, filter).await?;
        let mut peers_clean = true;

        for rel in rows {
            if delete_peer {
                if let Err(e) = self
                    .client
                    .delete_trust(&rel.base_uri, &rel.relationship, actor_id, &rel.secret)
                    .await
                {
                    tracing::warn!(
                        "mirror deletion at peer {} failed, local row removed anyway: {}",
                        rel.peer_id,
                        e
                    );
                    peers_clean = false;
                }
            }
            self.store.delete(actor_id, &rel.peer_id).await?;
            self.hooks.on_trust_deleted(&rel).await;
        }

        Ok(peers_clean)
    }

    /// Flip our own approval flag to true, notifying the peer first so its
    /// `peer_approved` mirror stays in sync.
    ///
    /// Notification failure is a degraded condition, not a fatal one: the
    /// local state change commits regardless (at-most-once, no retry).
    pub async fn approve(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> Result<TrustRelationship, TrustError> {
        let mut rel = self
            .store
            .get(actor_id, peer_id)
            .await?
            .ok_or(TrustError::NotFound)?;
        if rel.approved {
            return Ok(rel);
        }

        if let Err(e) = self
            .client
            .notify_approved(&rel.base_uri, &rel.relationship, actor_id, &rel.secret, true)
            .await
        {
            tracing::warn!(
                "approval notification to peer {} failed, committing locally anyway: {}",
                peer_id,
                e
            );
        }

        rel.approved = true;
        self.store.modify(rel.clone()).await?;
        Ok(rel)
    }

    /// Record an approval change reported by the peer itself.
    pub async fn set_peer_approved(
        &self,
        actor_id: &str,
        peer_id: &str,
        approved: bool,
    ) -> Result<TrustRelationship, TrustError> {
        let mut rel = self
            .store
            .get(actor_id, peer_id)
            .await?
            .ok_or(TrustError::NotFound)?;
        if rel.peer_approved != approved {
            rel.peer_approved = approved;
            self.store.modify(rel.clone()).await?;
        }
        Ok(rel)
    }

    /// Mark a relationship verified after the peer read back its record.
    ///
    /// Called when the peer GETs its own relationship resource with the
    /// shared secret: proof it received the correct relationship material.
    pub async fn confirm_verification(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> Result<TrustRelationship, TrustError> {
        let mut rel = self
            .store
            .get(actor_id, peer_id)
            .await?
            .ok_or(TrustError::NotFound)?;
        if !rel.verified {
            rel.verified = true;
            self.store.modify(rel.clone()).await?;
        }
        Ok(rel)
    }

    /// Apply baseline attribute changes (base URI, secret, description).
    /// Approval flips go through [`Self::approve`] instead.
    pub async fn update(
        &self,
        actor_id: &str,
        peer_id: &str,
        changes: TrustChanges,
    ) -> Result<TrustRelationship, TrustError> {
        let mut rel = self
            .store
            .get(actor_id, peer_id)
            .await?
            .ok_or(TrustError::NotFound)?;
        if let Some(base_uri) = changes.base_uri {
            rel.base_uri = base_uri.trim_end_matches('/').to_string();
        }
        if let Some(secret) = changes.secret {
            rel.secret = secret;
        }
        if let Some(desc) = changes.desc {
            rel.desc = desc;
        }
        self.store.modify(rel.clone()).await?;
        Ok(rel)
    }
}
