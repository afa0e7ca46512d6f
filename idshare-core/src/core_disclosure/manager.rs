//! Manager traits for the disclosure components
//!
//! Every operation takes the invoking [`Principal`] and authenticates it before
//! touching storage.

use super::access::Principal;
use super::account::{Account, AccountCredentials};
use super::allow_list::LinkUpdate;
use super::error::DisclosureResult;
use super::identity_variant::{ProfileIdentityVariant, ProfileVariantDraft, ProfileVariantPatch};
use super::request::{Request, RequestDraft, RequestPatch};
use super::request_variant::{
    RequestVariantDetail, RequestVariantDraft, RequestVariantPatch, RequestVariantSummary,
};
use super::types::{ProfileVariantId, RequestId, RequestVariantId};
use serde::Serialize;

/// A received request together with its field asks
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedRequest {
    #[serde(flatten)]
    pub request: Request,
    pub variants: Vec<RequestVariantSummary>,
}

/// Registered users, consulted by the session layer and by request creation
pub trait AccountDirectory {
    /// Register a new account with an already-hashed password
    fn register_account(&self, username: &str, password_hash: &str) -> DisclosureResult<Account>;

    fn find_account_by_username(&self, username: &str) -> DisclosureResult<Option<Account>>;

    /// Account plus stored password hash, for login
    fn find_credentials(&self, username: &str) -> DisclosureResult<Option<AccountCredentials>>;
}

/// Owner-scoped CRUD over profile identity variants
pub trait IdentityStore {
    fn create_profile_variant(
        &self,
        principal: &Principal,
        draft: ProfileVariantDraft,
    ) -> DisclosureResult<ProfileIdentityVariant>;

    fn list_profile_variants(&self, principal: &Principal) -> DisclosureResult<Vec<ProfileIdentityVariant>>;

    fn get_profile_variant(
        &self,
        principal: &Principal,
        id: ProfileVariantId,
    ) -> DisclosureResult<ProfileIdentityVariant>;

    fn update_profile_variant(
        &self,
        principal: &Principal,
        id: ProfileVariantId,
        patch: ProfileVariantPatch,
    ) -> DisclosureResult<ProfileIdentityVariant>;

    /// Delete a variant; request links pointing at it become null
    fn delete_profile_variant(&self, principal: &Principal, id: ProfileVariantId) -> DisclosureResult<()>;
}

/// Requests and their status state machine
pub trait RequestLifecycle {
    /// Create a request from the caller to `draft.receiver_username`
    fn create_request(&self, principal: &Principal, draft: RequestDraft) -> DisclosureResult<Request>;

    /// Requests the caller sent, newest first
    fn list_sent_requests(&self, principal: &Principal) -> DisclosureResult<Vec<Request>>;

    fn get_sent_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request>;

    /// Sender edit; only `reasoning` is writable
    fn update_sent_request(
        &self,
        principal: &Principal,
        id: RequestId,
        patch: RequestPatch,
    ) -> DisclosureResult<Request>;

    /// Delete a sent request and all of its request variants
    fn delete_sent_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<()>;

    /// Requests addressed to the caller, newest first
    fn list_received_requests(&self, principal: &Principal) -> DisclosureResult<Vec<Request>>;

    fn get_received_request(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> DisclosureResult<ReceivedRequest>;

    /// Move to Accepted; existing links are kept
    fn accept_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request>;

    /// Move to Denied, clearing every link in the same transaction
    fn deny_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request>;
}

/// Request variants and the receiver's links to profile variants
pub trait DisclosureLinker {
    fn create_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        draft: RequestVariantDraft,
    ) -> DisclosureResult<RequestVariantSummary>;

    /// Empty when the caller is not the request's sender
    fn list_sent_request_variants(
        &self,
        principal: &Principal,
        request_id: RequestId,
    ) -> DisclosureResult<Vec<RequestVariantSummary>>;

    /// Sender detail, including the disclosed value
    fn get_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<RequestVariantDetail>;

    fn update_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        patch: RequestVariantPatch,
    ) -> DisclosureResult<RequestVariantDetail>;

    fn delete_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<()>;

    /// Empty when the caller is not the request's receiver
    fn list_received_request_variants(
        &self,
        principal: &Principal,
        request_id: RequestId,
    ) -> DisclosureResult<Vec<RequestVariantSummary>>;

    /// Receiver detail; `Forbidden` unless the request is Accepted
    fn get_received_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<RequestVariantDetail>;

    /// Receiver edit; only the link is writable, and only while Accepted
    fn update_received_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        update: LinkUpdate,
    ) -> DisclosureResult<RequestVariantDetail>;

    /// Link to one of the caller's profile variants, or unlink with `None`
    fn link(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        target: Option<ProfileVariantId>,
    ) -> DisclosureResult<RequestVariantDetail>;

    /// Derived value, for either party; `None` unless linked and Accepted
    fn read_disclosed_value(
        &self,
        principal: &Principal,
        id: RequestVariantId,
    ) -> DisclosureResult<Option<String>>;
}
