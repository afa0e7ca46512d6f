//! Requests and their Pending / Accepted / Denied lifecycle

use super::error::{DisclosureError, DisclosureResult, ValidationErrors};
use super::types::{RequestId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ask from a sender to a receiver to disclose identity variants.
///
/// `sender_id` and `receiver_id` are assigned once at creation and never written again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub id: RequestId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_username: String,
    pub receiver_username: String,
    pub reasoning: String,
    pub created_at: Timestamp,
    pub status: RequestStatus,
}

impl Request {
    /// Username of the other party from `viewer`'s point of view
    pub fn counterparty_username(&self, viewer: UserId) -> &str {
        if viewer == self.sender_id {
            &self.receiver_username
        } else {
            &self.sender_username
        }
    }
}

/// Request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Denied => "denied",
        }
    }

    /// Linked values are only visible, and links only writable, while Accepted
    pub fn permits_disclosure(&self) -> bool {
        matches!(self, RequestStatus::Accepted)
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = DisclosureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "denied" => Ok(RequestStatus::Denied),
            other => Err(DisclosureError::Storage(format!("unknown request status '{}'", other))),
        }
    }
}

/// Receiver-driven status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Accept,
    Deny,
}

impl StatusTransition {
    /// Status reached by this transition, whatever the current one.
    ///
    /// There is no way back to Pending.
    pub fn target(&self) -> RequestStatus {
        match self {
            StatusTransition::Accept => RequestStatus::Accepted,
            StatusTransition::Deny => RequestStatus::Denied,
        }
    }

    /// Whether entering the target status wipes every child link
    pub fn clears_links(&self) -> bool {
        !self.target().permits_disclosure()
    }
}

/// Input for creating a request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestDraft {
    pub receiver_username: String,
    pub reasoning: String,
}

impl RequestDraft {
    pub fn new(receiver_username: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            receiver_username: receiver_username.into(),
            reasoning: reasoning.into(),
        }
    }

    pub fn validate(&self) -> DisclosureResult<()> {
        let mut errors = ValidationErrors::new();
        if self.receiver_username.trim().is_empty() {
            errors.add("receiver_username", "This field is required.");
        }
        errors.into_result()
    }
}

/// Sender-writable request fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPatch {
    pub reasoning: Option<String>,
}
