//! Shared test utilities for trust protocol integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use common::actor::Actor;
use common::config::Config;
use common::trust::{
    ApprovalBody, MemoryTrustStore, PeerClient, TrustEngine, TrustRequest, TrustResource,
};

/// Scripted peer behavior and a log of what it received.
#[derive(Debug)]
pub struct StubPeerState {
    /// actor id the stub advertises in /meta
    pub id: String,
    /// actor type the stub advertises in /meta
    pub actor_type: String,
    /// status answered to POST /trust/{relationship}
    pub create_status: AtomicU16,
    /// status answered to DELETE /trust/{relationship}/{peer}
    pub delete_status: AtomicU16,
    /// verificationToken served from GET /trust/{relationship}/{peer}
    pub verification_token: Mutex<Option<String>>,
    pub create_requests: Mutex<Vec<TrustRequest>>,
    pub approval_posts: Mutex<Vec<ApprovalBody>>,
    pub delete_calls: AtomicUsize,
}

/// A scripted trust peer listening on an ephemeral port.
pub struct StubPeer {
    pub addr: SocketAddr,
    pub state: Arc<StubPeerState>,
}

impl StubPeer {
    pub async fn spawn(id: &str) -> Self {
        let state = Arc::new(StubPeerState {
            id: id.to_string(),
            actor_type: "urn:actant:test:peer".to_string(),
            create_status: AtomicU16::new(201),
            delete_status: AtomicU16::new(204),
            verification_token: Mutex::new(None),
            create_requests: Mutex::new(Vec::new()),
            approval_posts: Mutex::new(Vec::new()),
            delete_calls: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/meta", get(meta_handler))
            .route("/trust/:relationship", post(create_handler))
            .route(
                "/trust/:relationship/:peer_id",
                get(fetch_handler)
                    .post(approval_handler)
                    .delete(delete_handler),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    /// The stub's root address as peers would dial it.
    pub fn base_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_create_status(&self, status: u16) {
        self.state.create_status.store(status, Ordering::SeqCst);
    }

    pub fn set_delete_status(&self, status: u16) {
        self.state.delete_status.store(status, Ordering::SeqCst);
    }

    pub fn set_verification_token(&self, token: &str) {
        *self.state.verification_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn create_requests(&self) -> Vec<TrustRequest> {
        self.state.create_requests.lock().unwrap().clone()
    }

    pub fn approval_posts(&self) -> Vec<ApprovalBody> {
        self.state.approval_posts.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }
}

async fn meta_handler(State(state): State<Arc<StubPeerState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "id": state.id,
        "type": state.actor_type,
        "version": "1.0",
    }))
}

async fn create_handler(
    State(state): State<Arc<StubPeerState>>,
    Path(_relationship): Path<String>,
    Json(request): Json<TrustRequest>,
) -> impl IntoResponse {
    state.create_requests.lock().unwrap().push(request);
    StatusCode::from_u16(state.create_status.load(Ordering::SeqCst)).unwrap()
}

async fn fetch_handler(
    State(state): State<Arc<StubPeerState>>,
    Path((relationship, peer_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let token = state.verification_token.lock().unwrap().clone();
    Json(TrustResource {
        id: state.id.clone(),
        peerid: peer_id,
        relationship,
        baseuri: String::new(),
        peer_type: state.actor_type.clone(),
        approved: true,
        peer_approved: false,
        verified: false,
        verification_token: token,
        desc: String::new(),
        secret: None,
    })
}

async fn approval_handler(
    State(state): State<Arc<StubPeerState>>,
    Path((_relationship, _peer_id)): Path<(String, String)>,
    Json(body): Json<ApprovalBody>,
) -> impl IntoResponse {
    state.approval_posts.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn delete_handler(
    State(state): State<Arc<StubPeerState>>,
    Path((_relationship, _peer_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state.delete_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::from_u16(state.delete_status.load(Ordering::SeqCst)).unwrap()
}

/// An engine over fresh in-memory stores plus the actor it runs as.
pub fn test_engine() -> (TrustEngine<MemoryTrustStore>, Arc<MemoryTrustStore>, Actor) {
    let config = Arc::new(Config {
        root: "http://localhost:7999/".to_string(),
        ..Config::default()
    });
    let store = Arc::new(MemoryTrustStore::new());
    let engine = TrustEngine::new(
        config,
        store.clone(),
        PeerClient::new(Duration::from_secs(2)),
    );
    let actor = Actor {
        id: "local-actor".to_string(),
        creator: "creator".to_string(),
        passphrase: "pass".to_string(),
        trustee: None,
    };
    (engine, store, actor)
}
