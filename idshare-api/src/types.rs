//! Wire types for the HTTP API

use chrono::{DateTime, SecondsFormat, Utc};
use idshare_core::core_disclosure::{
    ReceivedRequest, Request, RequestId, RequestStatus, RequestVariantId, RequestVariantSummary,
    Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// Request as seen by one of its parties
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub counterparty_username: String,
    pub reasoning: String,
    pub status: RequestStatus,
    pub created_at: String,
}

impl RequestView {
    pub fn new(request: &Request, viewer: UserId) -> Self {
        Self {
            id: request.id,
            counterparty_username: request.counterparty_username(viewer).to_string(),
            reasoning: request.reasoning.clone(),
            status: request.status,
            created_at: rfc3339(request.created_at),
        }
    }

    /// Sender's view: the counterparty is the receiver
    pub fn sent(request: &Request) -> Self {
        Self::new(request, request.sender_id)
    }

    /// Receiver's view: the counterparty is the sender
    pub fn received(request: &Request) -> Self {
        Self::new(request, request.receiver_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceivedRequestView {
    #[serde(flatten)]
    pub request: RequestView,
    pub variants: Vec<RequestVariantSummary>,
}

impl From<ReceivedRequest> for ReceivedRequestView {
    fn from(received: ReceivedRequest) -> Self {
        Self {
            request: RequestView::received(&received.request),
            variants: received.variants,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DisclosureView {
    pub id: RequestVariantId,
    pub disclosed_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

fn rfc3339(timestamp: Timestamp) -> String {
    i64::try_from(timestamp.as_millis())
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
