mod client;
mod engine;
mod store;

pub use client::{
    ApprovalBody, CreatedStatus, PeerClient, PeerClientError, PeerMeta, TrustRequest,
    TrustResource,
};
pub use engine::{NoHooks, TrustChanges, TrustEngine, TrustError, TrustHooks};
pub use store::{MemoryTrustStore, TrustStore, TrustStoreError};

use serde::{Deserialize, Serialize};

/// A bilateral trust relationship as recorded on one side.
///
/// Keyed by `(actor_id, peer_id)`. The mirrored record on the peer carries
/// its own independent `approved` flag; `peer_approved` here is only ever
/// learned from explicit peer actions, never self-asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRelationship {
    /// local actor owning this record
    pub actor_id: String,
    /// the peer's actor id
    pub peer_id: String,
    /// relationship label, e.g. "friend" or "admin"
    pub relationship: String,
    /// peer's root address, used for all outbound calls to it
    pub base_uri: String,
    /// shared bearer secret the peer presents on inbound requests
    pub secret: String,
    /// the peer's declared actor-type URN
    pub peer_type: String,
    /// whether this actor has approved the relationship
    pub approved: bool,
    /// whether the peer has approved its mirrored record
    pub peer_approved: bool,
    /// whether the peer confirmed the verification token round-trip
    pub verified: bool,
    /// one-time token issued at creation, consumed during verification
    pub verification_token: Option<String>,
    /// free-text annotation
    pub desc: String,
}

impl TrustRelationship {
    /// A relationship is usable only once both sides have approved it.
    pub fn fully_active(&self) -> bool {
        self.approved && self.peer_approved
    }
}

/// Filter for listing trust relationships. Omitted fields match everything;
/// present fields AND together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustFilter {
    pub relationship: Option<String>,
    pub peer_id: Option<String>,
    pub peer_type: Option<String>,
}

impl TrustFilter {
    pub fn by_peer(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: Some(peer_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, rel: &TrustRelationship) -> bool {
        if let Some(ref relationship) = self.relationship {
            if !rel.relationship.eq_ignore_ascii_case(relationship) {
                return false;
            }
        }
        if let Some(ref peer_id) = self.peer_id {
            if &rel.peer_id != peer_id {
                return false;
            }
        }
        if let Some(ref peer_type) = self.peer_type {
            if !rel.peer_type.eq_ignore_ascii_case(peer_type) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel() -> TrustRelationship {
        TrustRelationship {
            actor_id: "a1".to_string(),
            peer_id: "p1".to_string(),
            relationship: "friend".to_string(),
            base_uri: "http://peer.example/p1".to_string(),
            secret: "s1".to_string(),
            peer_type: "urn:actant:demo".to_string(),
            approved: true,
            peer_approved: false,
            verified: false,
            verification_token: None,
            desc: String::new(),
        }
    }

    #[test]
    fn test_fully_active_requires_both_approvals() {
        let mut r = rel();
        assert!(!r.fully_active());
        r.peer_approved = true;
        assert!(r.fully_active());
    }

    #[test]
    fn test_filter_fields_and_together() {
        let r = rel();
        assert!(TrustFilter::default().matches(&r));
        assert!(TrustFilter::by_peer("p1").matches(&r));

        let filter = TrustFilter {
            relationship: Some("FRIEND".to_string()),
            peer_id: Some("p1".to_string()),
            peer_type: None,
        };
        assert!(filter.matches(&r));

        let mismatched = TrustFilter {
            relationship: Some("admin".to_string()),
            peer_id: Some("p1".to_string()),
            peer_type: None,
        };
        assert!(!mismatched.matches(&r));
    }
}
