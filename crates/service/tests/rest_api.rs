//! End-to-end tests for the actor REST surface: two real nodes on
//! ephemeral ports running the full trust handshake against each other.

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::{json, Value};

use service::{Config, State};

struct TestNode {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestNode {
    /// Bind a node on an ephemeral port and serve the full router.
    async fn spawn(configure: impl FnOnce(&mut Config)) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = Config::default();
        config.core.root = format!("http://{}/", addr);
        configure(&mut config);

        let state = State::from_config(&config).unwrap();
        let router = service::http::router(state);
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register an actor and return (id, passphrase).
    async fn create_actor(&self, creator: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/"))
            .json(&json!({ "creator": creator }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        (
            body["id"].as_str().unwrap().to_string(),
            body["passphrase"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_actor_factory_and_root() {
    let node = TestNode::spawn(|_| {}).await;
    let (id, passphrase) = node.create_actor("alice").await;

    // identity requires the creator's basic credentials
    let response = node
        .client
        .get(node.url(&format!("/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));

    let response = node
        .client
        .get(node.url(&format!("/{}", id)))
        .basic_auth("alice", Some(&passphrase))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["creator"], "alice");
}

#[tokio::test]
async fn test_meta_is_public() {
    let node = TestNode::spawn(|_| {}).await;
    let (id, _) = node.create_actor("alice").await;

    let response = node
        .client
        .get(node.url(&format!("/{}/meta", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], id.as_str());
    assert!(body["type"].as_str().unwrap().starts_with("urn:"));

    let response = node
        .client
        .get(node.url(&format!("/{}/meta/type", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = node
        .client
        .get(node.url(&format!("/{}/meta/nope", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_handshake_with_auto_accept() {
    let a = TestNode::spawn(|_| {}).await;
    let b = TestNode::spawn(|_| {}).await;
    let (a_id, a_pass) = a.create_actor("alice").await;
    let (b_id, _) = b.create_actor("bob").await;

    let response = a
        .client
        .post(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .json(&json!({
            "url": b.url(&format!("/{}", b_id)),
            "relationship": "friend",
            "secret": "s1",
            "desc": "a to b",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();

    // B auto-accepted, so A's row is fully active immediately
    assert_eq!(body["peerid"], b_id.as_str());
    assert_eq!(body["approved"], true);
    assert_eq!(body["peer_approved"], true);
    // B's verification callback landed before its 201 did, confirming
    // A's row in passing
    assert_eq!(body["verified"], true);

    let response = a
        .client
        .get(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let a_row: Value = response.json().await.unwrap();
    assert_eq!(a_row["verified"], true);
    assert_eq!(a_row["secret"], "s1");

    // B's mirror: both sides approved, token round-trip verified
    let response = b
        .client
        .get(b.url(&format!("/{}/trust/friend/{}", b_id, a_id)))
        .bearer_auth("s1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let b_row: Value = response.json().await.unwrap();
    assert_eq!(b_row["peerid"], a_id.as_str());
    assert_eq!(b_row["approved"], true);
    assert_eq!(b_row["peer_approved"], true);
    assert_eq!(b_row["verified"], true);
}

#[tokio::test]
async fn test_manual_approval_round() {
    let a = TestNode::spawn(|_| {}).await;
    let b = TestNode::spawn(|config| {
        config.core.auto_accept_default_relationship = false;
    })
    .await;
    let (a_id, a_pass) = a.create_actor("alice").await;
    let (b_id, b_pass) = b.create_actor("bob").await;

    a.client
        .post(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .json(&json!({
            "url": b.url(&format!("/{}", b_id)),
            "secret": "s2",
        }))
        .send()
        .await
        .unwrap();

    // B accepted but has not approved yet, so A's mirror flag stays down
    let a_row: Value = a
        .client
        .get(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(a_row["peer_approved"], false);

    // bob approves; the flip is pushed to A before committing
    let response = b
        .client
        .put(b.url(&format!("/{}/trust/friend/{}", b_id, a_id)))
        .basic_auth("bob", Some(&b_pass))
        .json(&json!({ "approved": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let a_row: Value = a
        .client
        .get(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(a_row["peer_approved"], true);
}

#[tokio::test]
async fn test_reciprocal_delete_over_rest() {
    let a = TestNode::spawn(|_| {}).await;
    let b = TestNode::spawn(|_| {}).await;
    let (a_id, a_pass) = a.create_actor("alice").await;
    let (b_id, b_pass) = b.create_actor("bob").await;

    a.client
        .post(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .json(&json!({
            "url": b.url(&format!("/{}", b_id)),
            "secret": "s3",
        }))
        .send()
        .await
        .unwrap();

    let response = a
        .client
        .delete(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // both sides are gone
    let response = a
        .client
        .get(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = b
        .client
        .get(b.url(&format!("/{}/trust/friend/{}", b_id, a_id)))
        .basic_auth("bob", Some(&b_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // deleting again is a clean 404, not an error
    let response = a
        .client
        .delete(a.url(&format!("/{}/trust/friend/{}", a_id, b_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trust_list_requires_creator() {
    let a = TestNode::spawn(|_| {}).await;
    let b = TestNode::spawn(|_| {}).await;
    let (a_id, a_pass) = a.create_actor("alice").await;
    let (b_id, _) = b.create_actor("bob").await;

    a.client
        .post(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .json(&json!({
            "url": b.url(&format!("/{}", b_id)),
            "secret": "s4",
        }))
        .send()
        .await
        .unwrap();

    let response = a
        .client
        .get(a.url(&format!("/{}/trust", a_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // the peer's bearer secret is not enough to list everything
    let response = a
        .client
        .get(a.url(&format!("/{}/trust", a_id)))
        .bearer_auth("s4")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = a
        .client
        .get(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);

    // filters narrow the listing; an empty result is a 404
    let response = a
        .client
        .get(a.url(&format!("/{}/trust?relationship=admin", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inbound_trust_validation() {
    let node = TestNode::spawn(|_| {}).await;
    let (id, _) = node.create_actor("alice").await;

    // missing mandatory attributes
    let response = node
        .client
        .post(node.url(&format!("/{}/trust/friend", id)))
        .json(&json!({ "baseuri": "", "id": "", "type": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // a well-formed request from an unreachable initiator still creates
    // the row, just unverified
    let response = node
        .client
        .post(node.url(&format!("/{}/trust/friend", id)))
        .json(&json!({
            "baseuri": "http://127.0.0.1:9",
            "id": "remote-peer",
            "type": "urn:actant:test",
            "secret": "s5",
            "verify": "tok",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["verified"], false);
    assert_eq!(body["peer_approved"], true);

    // replaying the request cannot overwrite the existing relationship
    let response = node
        .client
        .post(node.url(&format!("/{}/trust/friend", id)))
        .json(&json!({
            "baseuri": "http://127.0.0.1:9",
            "id": "remote-peer",
            "type": "urn:actant:test",
            "secret": "s5",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_actor_deletion_cascades() {
    let a = TestNode::spawn(|_| {}).await;
    let b = TestNode::spawn(|_| {}).await;
    let (a_id, a_pass) = a.create_actor("alice").await;
    let (b_id, b_pass) = b.create_actor("bob").await;

    a.client
        .post(a.url(&format!("/{}/trust", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .json(&json!({
            "url": b.url(&format!("/{}", b_id)),
            "secret": "s6",
        }))
        .send()
        .await
        .unwrap();

    let response = a
        .client
        .delete(a.url(&format!("/{}", a_id)))
        .basic_auth("alice", Some(&a_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // the actor is gone, and so is its mirror on the peer
    let response = a
        .client
        .get(a.url(&format!("/{}/meta", a_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = b
        .client
        .get(b.url(&format!("/{}/trust/friend/{}", b_id, a_id)))
        .basic_auth("bob", Some(&b_pass))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
