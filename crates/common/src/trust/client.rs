use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum PeerClientError {
    /// timeout, connection failure, or a malformed response body
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    /// the peer answered with a definitive non-2xx status
    #[error("peer rejected request with status {0}")]
    Rejected(u16),
}

/// Peer capability probe returned by `GET {base}/meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub info: String,
}

/// Body of a peer-initiated `POST {base}/trust/{relationship}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRequest {
    /// the initiator's root address (its node root plus actor id)
    pub baseuri: String,
    /// the initiator's actor id
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub desc: String,
    /// the initiator's one-time verification token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<String>,
}

/// Wire representation of one side's trust relationship record, as served
/// from `GET {base}/trust/{relationship}/{peer_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustResource {
    /// the actor owning the record
    pub id: String,
    pub peerid: String,
    pub relationship: String,
    pub baseuri: String,
    #[serde(rename = "type", default)]
    pub peer_type: String,
    pub approved: bool,
    #[serde(default)]
    pub peer_approved: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(
        rename = "verificationToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Approval-change notification body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalBody {
    pub approved: bool,
}

/// How the peer answered a trust-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedStatus {
    /// 201: the peer auto-approved the relationship
    AutoApproved,
    /// 202: accepted, pending manual approval on the peer
    Pending,
}

/// Outbound HTTP client for the peer-to-peer trust protocol.
///
/// All calls are plain JSON over HTTP with a single configured timeout; a
/// timeout is treated identically to a connection failure.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build http client");
        Self { client }
    }

    fn trust_url(base_uri: &str, relationship: &str, actor_id: Option<&str>) -> String {
        let base = base_uri.trim_end_matches('/');
        match actor_id {
            Some(actor_id) => format!("{}/trust/{}/{}", base, relationship, actor_id),
            None => format!("{}/trust/{}", base, relationship),
        }
    }

    /// Probe a peer's capabilities via `GET {base}/meta`.
    pub async fn fetch_meta(&self, base_uri: &str) -> Result<PeerMeta, PeerClientError> {
        let url = format!("{}/meta", base_uri.trim_end_matches('/'));
        tracing::debug!("fetching peer meta from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerClientError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PeerClientError::Rejected(response.status().as_u16()));
        }
        response
            .json::<PeerMeta>()
            .await
            .map_err(|e| PeerClientError::Unreachable(format!("malformed meta body: {}", e)))
    }

    /// Ask a peer to create its mirrored trust record.
    ///
    /// 201 means the peer auto-approved, 202 means it accepted pending
    /// manual approval; anything else is a rejection.
    pub async fn create_trust(
        &self,
        base_uri: &str,
        relationship: &str,
        request: &TrustRequest,
    ) -> Result<CreatedStatus, PeerClientError> {
        let url = Self::trust_url(base_uri, relationship, None);
        tracing::debug!("requesting trust creation at {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PeerClientError::Unreachable(e.to_string()))?;
        match response.status() {
            StatusCode::CREATED => Ok(CreatedStatus::AutoApproved),
            StatusCode::ACCEPTED => Ok(CreatedStatus::Pending),
            status => Err(PeerClientError::Rejected(status.as_u16())),
        }
    }

    /// Read back our own relationship record on the peer, bearer-authed
    /// with the shared secret. Used for verification-token confirmation
    /// and approval polling.
    pub async fn fetch_trust(
        &self,
        base_uri: &str,
        relationship: &str,
        actor_id: &str,
        secret: &str,
    ) -> Result<TrustResource, PeerClientError> {
        let url = Self::trust_url(base_uri, relationship, Some(actor_id));
        tracing::debug!("fetching trust resource at {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| PeerClientError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PeerClientError::Rejected(response.status().as_u16()));
        }
        response
            .json::<TrustResource>()
            .await
            .map_err(|e| PeerClientError::Unreachable(format!("malformed trust body: {}", e)))
    }

    /// Tell the peer our approval flag changed. Fire-and-forget semantics
    /// are decided by the caller; this reports the outcome faithfully.
    pub async fn notify_approved(
        &self,
        base_uri: &str,
        relationship: &str,
        actor_id: &str,
        secret: &str,
        approved: bool,
    ) -> Result<(), PeerClientError> {
        let url = Self::trust_url(base_uri, relationship, Some(actor_id));
        tracing::debug!("notifying approval change at {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret)
            .json(&ApprovalBody { approved })
            .send()
            .await
            .map_err(|e| PeerClientError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PeerClientError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }

    /// Delete our mirrored record on the peer. A 404 counts as success:
    /// the mirror is already gone.
    ///
    /// The `peer=true` marker tells the recipient this deletion originates
    /// from the peer itself, so it must not call back in turn.
    pub async fn delete_trust(
        &self,
        base_uri: &str,
        relationship: &str,
        actor_id: &str,
        secret: &str,
    ) -> Result<(), PeerClientError> {
        let url = format!(
            "{}?peer=true",
            Self::trust_url(base_uri, relationship, Some(actor_id))
        );
        tracing::debug!("deleting trust mirror at {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| PeerClientError::Unreachable(e.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(PeerClientError::Rejected(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_url_shapes() {
        assert_eq!(
            PeerClient::trust_url("http://peer.example/p1/", "friend", None),
            "http://peer.example/p1/trust/friend"
        );
        assert_eq!(
            PeerClient::trust_url("http://peer.example/p1", "friend", Some("a1")),
            "http://peer.example/p1/trust/friend/a1"
        );
    }

    #[test]
    fn test_wire_field_names() {
        let request = TrustRequest {
            baseuri: "http://a.example/a1".to_string(),
            id: "a1".to_string(),
            actor_type: "urn:actant:demo".to_string(),
            secret: Some("s1".to_string()),
            desc: String::new(),
            verify: Some("tok1".to_string()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "urn:actant:demo");
        assert_eq!(value["verify"], "tok1");

        let resource: TrustResource = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "peerid": "a1",
            "relationship": "friend",
            "baseuri": "http://a.example/a1",
            "type": "urn:actant:demo",
            "approved": true,
            "verificationToken": "tok1",
        }))
        .unwrap();
        assert_eq!(resource.verification_token.as_deref(), Some("tok1"));
        assert!(!resource.peer_approved);
    }
}
