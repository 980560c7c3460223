//! Integration tests for reciprocal trust initiation

mod harness;

use common::trust::{TrustError, TrustStore};

#[tokio::test]
async fn test_initiate_with_auto_approving_peer() {
    let peer = harness::StubPeer::spawn("peer-1").await;
    let (engine, store, actor) = harness::test_engine();

    let rel = engine
        .initiate(&actor, &peer.base_uri(), "friend", None, "", None)
        .await
        .unwrap();

    // 201 from the peer means both intents are recorded locally, with no
    // extra approval callback
    assert!(rel.approved);
    assert!(rel.peer_approved);
    assert!(rel.fully_active());
    assert!(!rel.verified);
    assert!(peer.approval_posts().is_empty());

    let stored = store.get(&actor.id, "peer-1").await.unwrap().unwrap();
    assert_eq!(stored, rel);

    // the outbound request carried our identity, the shared secret, and a
    // verification token matching the stored row
    let requests = peer.create_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, actor.id);
    assert_eq!(requests[0].baseuri, format!("http://localhost:7999/{}", actor.id));
    assert_eq!(requests[0].secret.as_deref(), Some(stored.secret.as_str()));
    assert_eq!(requests[0].verify, stored.verification_token);
}

#[tokio::test]
async fn test_initiate_with_pending_peer() {
    let peer = harness::StubPeer::spawn("peer-1").await;
    peer.set_create_status(202);
    let (engine, _, actor) = harness::test_engine();

    let rel = engine
        .initiate(&actor, &peer.base_uri(), "friend", None, "", None)
        .await
        .unwrap();

    assert!(rel.approved);
    assert!(!rel.peer_approved);
    assert!(!rel.fully_active());
}

#[tokio::test]
async fn test_rollback_on_peer_rejection() {
    let peer = harness::StubPeer::spawn("peer-1").await;
    peer.set_create_status(403);
    let (engine, store, actor) = harness::test_engine();

    let result = engine
        .initiate(&actor, &peer.base_uri(), "friend", None, "", None)
        .await;
    assert!(matches!(result, Err(TrustError::Peer(_))));

    // the tentative local row must not survive the rejection
    assert!(store.get(&actor.id, "peer-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_peer_creates_no_state() {
    let (engine, store, actor) = harness::test_engine();

    // nothing listens here; the meta probe fails before any local write
    let result = engine
        .initiate(&actor, "http://127.0.0.1:9", "friend", None, "", None)
        .await;
    assert!(matches!(result, Err(TrustError::Peer(_))));
    assert!(store
        .list(&actor.id, &Default::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_type_filter_mismatch_rejected() {
    let peer = harness::StubPeer::spawn("peer-1").await;
    let (engine, store, actor) = harness::test_engine();

    let result = engine
        .initiate(
            &actor,
            &peer.base_uri(),
            "friend",
            None,
            "",
            Some("urn:actant:other:kind"),
        )
        .await;
    assert!(matches!(result, Err(TrustError::Validation(_))));
    assert!(store.get(&actor.id, "peer-1").await.unwrap().is_none());

    // case difference alone is not a mismatch
    engine
        .initiate(
            &actor,
            &peer.base_uri(),
            "friend",
            None,
            "",
            Some("URN:ACTANT:TEST:PEER"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_secret_collision_rejected_before_peer_call() {
    let peer_a = harness::StubPeer::spawn("peer-a").await;
    let peer_b = harness::StubPeer::spawn("peer-b").await;
    let (engine, _, actor) = harness::test_engine();

    engine
        .initiate(
            &actor,
            &peer_a.base_uri(),
            "friend",
            Some("shared-secret".to_string()),
            "",
            None,
        )
        .await
        .unwrap();

    let result = engine
        .initiate(
            &actor,
            &peer_b.base_uri(),
            "friend",
            Some("shared-secret".to_string()),
            "",
            None,
        )
        .await;
    assert!(matches!(result, Err(TrustError::SecretCollision)));

    // the collision is a local validation failure: peer B never saw a
    // creation request
    assert!(peer_b.create_requests().is_empty());
}
