mod store;

pub use store::{ActorStore, ActorStoreError, MemoryActorStore};

use serde::{Deserialize, Serialize};

use crate::config::{actor_id_from_seed, new_token};

/// An actor identity record.
///
/// The id is content-derived (UUIDv5 over the creation seed) and immutable
/// once assigned. The passphrase is the basic-auth secret for the creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub creator: String,
    pub passphrase: String,
    /// optional label of an actor entrusted to manage this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trustee: Option<String>,
}

impl Actor {
    /// Build a new actor record from registration input.
    ///
    /// An empty creator label falls back to `"creator"`; a missing
    /// passphrase is generated. The seed is the factory URL plus a
    /// creation timestamp, keeping ids stable and globally unique.
    pub fn new(
        seed_url: &str,
        creator: &str,
        passphrase: Option<&str>,
        trustee: Option<&str>,
    ) -> Self {
        let now = chrono::Utc::now().format("%Y%m%dT%H%M%S%f");
        let seed = format!("{seed_url}{now}");
        let creator = if creator.is_empty() {
            "creator".to_string()
        } else {
            creator.to_string()
        };
        let passphrase = match passphrase {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => new_token(40),
        };
        Self {
            id: actor_id_from_seed(&seed),
            creator,
            passphrase,
            trustee: trustee.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }
}
