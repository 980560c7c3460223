//! Trust relationship endpoints.

pub mod incoming;
pub mod initiate;
pub mod list;
pub mod resource;

use common::auth::AuthIdentity;
use common::trust::{TrustRelationship, TrustResource};

/// Wire representation of a stored relationship.
///
/// The shared secret and the one-time verification token are included
/// only for callers already entitled to them: the actor's own
/// creator/trustee, or the peer the record names.
pub(crate) fn to_resource(rel: &TrustRelationship, identity: &AuthIdentity) -> TrustResource {
    let entitled = identity.peer_id.as_deref() == Some(rel.peer_id.as_str())
        || identity
            .relationship
            .as_deref()
            .is_some_and(|r| r == "creator" || r == "trustee");
    TrustResource {
        id: rel.actor_id.clone(),
        peerid: rel.peer_id.clone(),
        relationship: rel.relationship.clone(),
        baseuri: rel.base_uri.clone(),
        peer_type: rel.peer_type.clone(),
        approved: rel.approved,
        peer_approved: rel.peer_approved,
        verified: rel.verified,
        verification_token: if entitled {
            rel.verification_token.clone()
        } else {
            None
        },
        desc: rel.desc.clone(),
        secret: entitled.then(|| rel.secret.clone()),
    }
}
