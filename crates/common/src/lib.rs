/**
 * Actor identity records and the actor store contract.
 *  An actor is an independently addressable web resource
 *  identified by a stable, content-derived id.
 */
pub mod actor;
/**
 * Authentication resolver, authorization engine (ordered
 *  ACL), and OAuth token lifecycle bookkeeping.
 */
pub mod auth;
/**
 * Explicit configuration passed by reference into the
 *  engines. No ambient/global state.
 */
pub mod config;
/**
 * Property bag contract keyed by (actor, name).
 *  External collaborator for the OAuth lifecycle and
 *  actor cascade deletion.
 */
pub mod property;
/**
 * The trust relationship store, the peer HTTP client,
 *  and the trust protocol engine that orchestrates the
 *  bilateral handshake between actors.
 */
pub mod trust;

pub mod prelude {
    pub use crate::actor::{Actor, ActorStore, MemoryActorStore};
    pub use crate::auth::acl::{Access, AccessRule, AclTable};
    pub use crate::auth::{AuthDecision, AuthIdentity, Authenticator, RequestAuth};
    pub use crate::config::Config;
    pub use crate::property::{MemoryPropertyStore, PropertyStore};
    pub use crate::trust::{
        PeerClient, TrustEngine, TrustError, TrustFilter, TrustRelationship, TrustStore,
    };
}
