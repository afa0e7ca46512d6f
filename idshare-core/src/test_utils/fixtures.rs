//! Test fixtures for creating common test objects
//!
//! Provides a [`TestWorld`] over a fresh database and a builder for requests
//! in a given state.

use crate::core_disclosure::{
    AccountDirectory, Caller, DisclosureLinker, DisclosureManager, DisclosureSqlStore,
    IdentityStore, Principal, ProfileIdentityVariant, ProfileVariantDraft, Request, RequestDraft,
    RequestLifecycle, RequestStatus, RequestVariantDraft, RequestVariantSummary,
};
use std::time::Duration;
use tempfile::TempDir;

/// Placeholder hash for accounts created outside the password flow
pub const TEST_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$dGVzdHNhbHQ$dGVzdGhhc2g";

/// A manager over a fresh database plus helpers to populate it
pub struct TestWorld {
    pub manager: DisclosureManager,
    _dir: Option<TempDir>,
}

impl TestWorld {
    /// In-memory database
    pub fn new() -> Self {
        let store = DisclosureSqlStore::memory().expect("in-memory store");
        Self {
            manager: DisclosureManager::new(store),
            _dir: None,
        }
    }

    /// File-backed database in a temporary directory, with a multi-connection pool
    pub fn on_disk() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = DisclosureSqlStore::open(dir.path().join("idshare.db"), 4, Duration::from_secs(5))
            .expect("file store");
        Self {
            manager: DisclosureManager::new(store),
            _dir: Some(dir),
        }
    }

    /// Register a user and return them as an authenticated principal
    pub fn user(&self, username: &str) -> Principal {
        let account = self
            .manager
            .register_account(username, TEST_PASSWORD_HASH)
            .expect("register account");
        Principal::Authenticated(Caller::new(account.id, account.username))
    }

    /// Store a profile variant for `owner`
    pub fn profile_variant(
        &self,
        owner: &Principal,
        label: &str,
        value: &str,
    ) -> ProfileIdentityVariant {
        self.manager
            .create_profile_variant(owner, ProfileVariantDraft::new(label, "", value))
            .expect("create profile variant")
    }

    /// Start building a request from `sender` to `receiver`
    pub fn request<'a>(&'a self, sender: &'a Principal, receiver: &'a Principal) -> TestRequestBuilder<'a> {
        TestRequestBuilder {
            world: self,
            sender,
            receiver,
            reasoning: "need info".to_string(),
            labels: Vec::new(),
            status: RequestStatus::Pending,
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test requests
pub struct TestRequestBuilder<'a> {
    world: &'a TestWorld,
    sender: &'a Principal,
    receiver: &'a Principal,
    reasoning: String,
    labels: Vec<String>,
    status: RequestStatus,
}

impl<'a> TestRequestBuilder<'a> {
    pub fn reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Attach a request variant with this label
    pub fn asking_for(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> (Request, Vec<RequestVariantSummary>) {
        let manager = &self.world.manager;
        let receiver_name = match self.receiver {
            Principal::Authenticated(caller) => caller.username.clone(),
            Principal::Anonymous => panic!("receiver must be authenticated"),
        };

        let request = manager
            .create_request(self.sender, RequestDraft::new(receiver_name, self.reasoning))
            .expect("create request");

        let variants = self
            .labels
            .iter()
            .map(|label| {
                manager
                    .create_request_variant(self.sender, request.id, RequestVariantDraft::new(label.as_str(), ""))
                    .expect("create request variant")
            })
            .collect();

        let request = match self.status {
            RequestStatus::Pending => request,
            RequestStatus::Accepted => manager.accept_request(self.receiver, request.id).expect("accept"),
            RequestStatus::Denied => manager.deny_request(self.receiver, request.id).expect("deny"),
        };

        (request, variants)
    }
}
