//! Manager trait implementations with business logic

use super::access::{
    AccessGuard, Caller, ChildOf, OwnerOf, Principal, ProfileVariantOp, RequestOp,
    RequestVariantOp,
};
use super::account::{validate_username, Account, AccountCredentials};
use super::allow_list::LinkUpdate;
use super::error::{DisclosureError, DisclosureResult};
use super::identity_variant::{ProfileIdentityVariant, ProfileVariantDraft, ProfileVariantPatch};
use super::manager::{
    AccountDirectory, DisclosureLinker, IdentityStore, ReceivedRequest, RequestLifecycle,
};
use super::request::{Request, RequestDraft, RequestPatch, StatusTransition};
use super::request_variant::{
    RequestVariantDetail, RequestVariantDraft, RequestVariantPatch, RequestVariantRecord,
    RequestVariantSummary,
};
use super::storage::DisclosureSqlStore;
use super::types::{ProfileVariantId, RequestId, RequestVariantId};
use crate::metrics;

/// Implements every disclosure component over one SQL store
#[derive(Clone)]
pub struct DisclosureManager {
    store: DisclosureSqlStore,
}

impl DisclosureManager {
    /// Create a new manager with storage
    pub fn new(store: DisclosureSqlStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DisclosureSqlStore {
        &self.store
    }

    /// Load a request variant and its parent, then run the parent's rule for `op`
    fn authorize_child(
        &self,
        caller: &Caller,
        request_id: RequestId,
        id: RequestVariantId,
        op: RequestVariantOp,
    ) -> DisclosureResult<(Request, RequestVariantRecord)> {
        let parent = self.store.find_request(request_id)?;
        let record = self.store.find_request_variant(id)?;

        let child = match (&parent, &record) {
            (Some(parent), Some(record)) => Some(ChildOf {
                variant: &record.variant,
                parent,
            }),
            _ => None,
        };
        AccessGuard::check(caller, child.as_ref(), op)?;

        match (parent, record) {
            (Some(parent), Some(record)) => Ok((parent, record)),
            _ => Err(DisclosureError::not_found("RequestIdentityVariant")),
        }
    }

    fn owned_profile_variant(
        &self,
        caller: &Caller,
        id: ProfileVariantId,
        op: ProfileVariantOp,
    ) -> DisclosureResult<(ProfileIdentityVariant, OwnerOf)> {
        let variant = self.store.find_profile_variant(id)?;
        let owner = AccessGuard::owner_of(caller, variant.as_ref(), op)?;
        let variant = variant.ok_or(DisclosureError::not_found("ProfileIdentityVariant"))?;
        Ok((variant, owner))
    }

    fn transition(
        &self,
        principal: &Principal,
        id: RequestId,
        transition: StatusTransition,
    ) -> DisclosureResult<Request> {
        let caller = principal.require()?;
        let op = match transition {
            StatusTransition::Accept => RequestOp::Accept,
            StatusTransition::Deny => RequestOp::Deny,
        };

        let request = self.store.find_request(id)?;
        let receiver = AccessGuard::receiver_of(caller, request.as_ref(), op)?;
        let (updated, cleared) = self.store.transition_status(&receiver, transition)?;

        match transition {
            StatusTransition::Accept => metrics::request_accepted(),
            StatusTransition::Deny => metrics::request_denied(cleared),
        }
        tracing::info!(
            request = %id,
            receiver = %caller.user_id,
            status = %updated.status,
            links_cleared = cleared,
            "Request status changed"
        );

        Ok(updated)
    }
}

impl AccountDirectory for DisclosureManager {
    fn register_account(&self, username: &str, password_hash: &str) -> DisclosureResult<Account> {
        validate_username(username)?;
        let account = self.store.insert_account(username, password_hash)?;
        tracing::info!(user = %account.id, username = %account.username, "Account registered");
        Ok(account)
    }

    fn find_account_by_username(&self, username: &str) -> DisclosureResult<Option<Account>> {
        self.store.find_account_by_username(username)
    }

    fn find_credentials(&self, username: &str) -> DisclosureResult<Option<AccountCredentials>> {
        self.store.find_credentials(username)
    }
}

impl IdentityStore for DisclosureManager {
    fn create_profile_variant(
        &self,
        principal: &Principal,
        draft: ProfileVariantDraft,
    ) -> DisclosureResult<ProfileIdentityVariant> {
        let caller = principal.require()?;
        draft.validate()?;
        let variant = self.store.insert_profile_variant(caller.user_id, &draft)?;
        tracing::debug!(user = %caller.user_id, variant = %variant.id, "Profile variant created");
        Ok(variant)
    }

    fn list_profile_variants(&self, principal: &Principal) -> DisclosureResult<Vec<ProfileIdentityVariant>> {
        let caller = principal.require()?;
        self.store.list_profile_variants(caller.user_id)
    }

    fn get_profile_variant(
        &self,
        principal: &Principal,
        id: ProfileVariantId,
    ) -> DisclosureResult<ProfileIdentityVariant> {
        let caller = principal.require()?;
        let (variant, _) = self.owned_profile_variant(caller, id, ProfileVariantOp::Read)?;
        Ok(variant)
    }

    fn update_profile_variant(
        &self,
        principal: &Principal,
        id: ProfileVariantId,
        patch: ProfileVariantPatch,
    ) -> DisclosureResult<ProfileIdentityVariant> {
        let caller = principal.require()?;
        let (mut variant, owner) = self.owned_profile_variant(caller, id, ProfileVariantOp::Update)?;
        patch.validate()?;
        patch.apply_to(&mut variant);
        self.store.update_profile_variant(&owner, &variant)?;
        Ok(variant)
    }

    fn delete_profile_variant(&self, principal: &Principal, id: ProfileVariantId) -> DisclosureResult<()> {
        let caller = principal.require()?;
        let (_, owner) = self.owned_profile_variant(caller, id, ProfileVariantOp::Delete)?;
        self.store.delete_profile_variant(&owner)?;
        tracing::debug!(user = %caller.user_id, variant = %id, "Profile variant deleted");
        Ok(())
    }
}

impl RequestLifecycle for DisclosureManager {
    fn create_request(&self, principal: &Principal, draft: RequestDraft) -> DisclosureResult<Request> {
        let caller = principal.require()?;
        draft.validate()?;

        let sender = self
            .store
            .find_account(caller.user_id)?
            .ok_or(DisclosureError::Unauthenticated)?;
        let receiver = self
            .store
            .find_account_by_username(draft.receiver_username.trim())?
            .ok_or_else(|| {
                DisclosureError::invalid(
                    "receiver_username",
                    format!("User '{}' does not exist.", draft.receiver_username.trim()),
                )
            })?;
        if receiver.id == sender.id {
            return Err(DisclosureError::invalid(
                "receiver_username",
                "You cannot send a request to yourself.",
            ));
        }

        let request = self.store.insert_request(&sender, &receiver, &draft.reasoning)?;
        metrics::request_created();
        tracing::info!(
            request = %request.id,
            sender = %sender.id,
            receiver = %receiver.id,
            "Request created"
        );
        Ok(request)
    }

    fn list_sent_requests(&self, principal: &Principal) -> DisclosureResult<Vec<Request>> {
        let caller = principal.require()?;
        self.store.list_sent_requests(caller.user_id)
    }

    fn get_sent_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request> {
        let caller = principal.require()?;
        let request = self.store.find_request(id)?;
        AccessGuard::check(caller, request.as_ref(), RequestOp::ReadAsSender)?;
        request.ok_or(DisclosureError::not_found("Request"))
    }

    fn update_sent_request(
        &self,
        principal: &Principal,
        id: RequestId,
        patch: RequestPatch,
    ) -> DisclosureResult<Request> {
        let caller = principal.require()?;
        let request = self.store.find_request(id)?;
        let sender = AccessGuard::sender_of(caller, request.as_ref(), RequestOp::UpdateReasoning)?;
        let mut request = request.ok_or(DisclosureError::not_found("Request"))?;

        if let Some(reasoning) = patch.reasoning {
            self.store.update_reasoning(&sender, &reasoning)?;
            request.reasoning = reasoning;
        }
        Ok(request)
    }

    fn delete_sent_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<()> {
        let caller = principal.require()?;
        let request = self.store.find_request(id)?;
        let sender = AccessGuard::sender_of(caller, request.as_ref(), RequestOp::Delete)?;
        self.store.delete_request(&sender)?;
        tracing::info!(request = %id, sender = %caller.user_id, "Request deleted");
        Ok(())
    }

    fn list_received_requests(&self, principal: &Principal) -> DisclosureResult<Vec<Request>> {
        let caller = principal.require()?;
        self.store.list_received_requests(caller.user_id)
    }

    fn get_received_request(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> DisclosureResult<ReceivedRequest> {
        let caller = principal.require()?;
        let request = self.store.find_request(id)?;
        AccessGuard::check(caller, request.as_ref(), RequestOp::ReadAsReceiver)?;
        let request = request.ok_or(DisclosureError::not_found("Request"))?;

        let variants = self
            .store
            .list_request_variants(id)?
            .iter()
            .map(RequestVariantSummary::from)
            .collect();
        Ok(ReceivedRequest { request, variants })
    }

    fn accept_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request> {
        self.transition(principal, id, StatusTransition::Accept)
    }

    fn deny_request(&self, principal: &Principal, id: RequestId) -> DisclosureResult<Request> {
        self.transition(principal, id, StatusTransition::Deny)
    }
}

impl DisclosureLinker for DisclosureManager {
    fn create_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        draft: RequestVariantDraft,
    ) -> DisclosureResult<RequestVariantSummary> {
        let caller = principal.require()?;
        let request = self.store.find_request(request_id)?;
        let sender = AccessGuard::sender_of(caller, request.as_ref(), RequestOp::ManageVariants)?;
        draft.validate()?;

        let variant = self.store.insert_request_variant(&sender, &draft)?;
        tracing::debug!(request = %request_id, variant = %variant.id, "Request variant created");
        Ok(RequestVariantSummary::from(&variant))
    }

    fn list_sent_request_variants(
        &self,
        principal: &Principal,
        request_id: RequestId,
    ) -> DisclosureResult<Vec<RequestVariantSummary>> {
        let caller = principal.require()?;
        let request = self.store.find_request(request_id)?;
        if AccessGuard::check(caller, request.as_ref(), RequestOp::ReadAsSender).is_err() {
            return Ok(Vec::new());
        }

        let variants = self.store.list_request_variants(request_id)?;
        Ok(variants.iter().map(RequestVariantSummary::from).collect())
    }

    fn get_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<RequestVariantDetail> {
        let caller = principal.require()?;
        let (_, record) = self.authorize_child(caller, request_id, id, RequestVariantOp::ReadAsSender)?;
        Ok(RequestVariantDetail::for_sender(&record))
    }

    fn update_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        patch: RequestVariantPatch,
    ) -> DisclosureResult<RequestVariantDetail> {
        let caller = principal.require()?;
        let (parent, record) =
            self.authorize_child(caller, request_id, id, RequestVariantOp::EditAsSender)?;
        let sender = AccessGuard::sender_of(caller, Some(&parent), RequestOp::ManageVariants)?;
        patch.validate()?;

        if patch.is_empty() {
            return Ok(RequestVariantDetail::for_sender(&record));
        }

        self.store.update_request_variant(&sender, id, &patch)?;
        let record = self
            .store
            .find_request_variant(id)?
            .ok_or(DisclosureError::not_found("RequestIdentityVariant"))?;
        Ok(RequestVariantDetail::for_sender(&record))
    }

    fn delete_sent_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<()> {
        let caller = principal.require()?;
        let (parent, _) =
            self.authorize_child(caller, request_id, id, RequestVariantOp::DeleteAsSender)?;
        let sender = AccessGuard::sender_of(caller, Some(&parent), RequestOp::ManageVariants)?;
        self.store.delete_request_variant(&sender, id)?;
        tracing::debug!(request = %request_id, variant = %id, "Request variant deleted");
        Ok(())
    }

    fn list_received_request_variants(
        &self,
        principal: &Principal,
        request_id: RequestId,
    ) -> DisclosureResult<Vec<RequestVariantSummary>> {
        let caller = principal.require()?;
        let request = self.store.find_request(request_id)?;
        if AccessGuard::check(caller, request.as_ref(), RequestOp::ReadAsReceiver).is_err() {
            return Ok(Vec::new());
        }

        let variants = self.store.list_request_variants(request_id)?;
        Ok(variants.iter().map(RequestVariantSummary::from).collect())
    }

    fn get_received_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
    ) -> DisclosureResult<RequestVariantDetail> {
        let caller = principal.require()?;
        let (_, record) =
            self.authorize_child(caller, request_id, id, RequestVariantOp::ReadDetailAsReceiver)?;
        Ok(RequestVariantDetail::for_receiver(&record))
    }

    fn update_received_request_variant(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        update: LinkUpdate,
    ) -> DisclosureResult<RequestVariantDetail> {
        match update.linked_profile_variant_id {
            Some(target) => self.link(principal, request_id, id, target),
            None => {
                // Nothing writable in the payload, but the status gate still applies
                let caller = principal.require()?;
                let (_, record) = self.authorize_child(caller, request_id, id, RequestVariantOp::Link)?;
                Ok(RequestVariantDetail::for_receiver(&record))
            }
        }
    }

    fn link(
        &self,
        principal: &Principal,
        request_id: RequestId,
        id: RequestVariantId,
        target: Option<ProfileVariantId>,
    ) -> DisclosureResult<RequestVariantDetail> {
        let caller = principal.require()?;

        // Scope first: parent and target mismatches are NotFound before any status check
        let (parent, record) =
            self.authorize_child(caller, request_id, id, RequestVariantOp::ListAsReceiver)?;
        let owner = match target {
            Some(target) => Some(self.owned_profile_variant(caller, target, ProfileVariantOp::LinkTarget)?.1),
            None => None,
        };
        let receiver = AccessGuard::linker_of(
            caller,
            Some(ChildOf {
                variant: &record.variant,
                parent: &parent,
            }),
        )?;

        let record = self.store.set_link(&receiver, id, owner.as_ref())?;
        match target {
            Some(target) => {
                metrics::link_set();
                tracing::info!(request = %request_id, variant = %id, target = %target, "Link set");
            }
            None => {
                metrics::link_cleared();
                tracing::info!(request = %request_id, variant = %id, "Link cleared");
            }
        }

        Ok(RequestVariantDetail::for_receiver(&record))
    }

    fn read_disclosed_value(
        &self,
        principal: &Principal,
        id: RequestVariantId,
    ) -> DisclosureResult<Option<String>> {
        let caller = principal.require()?;
        let request_id = match self.store.find_request_variant(id)? {
            Some(record) => record.variant.request_id,
            None => return Err(DisclosureError::not_found("RequestIdentityVariant")),
        };

        let (_, record) = self.authorize_child(caller, request_id, id, RequestVariantOp::ReadDisclosed)?;
        Ok(record.disclosed_value())
    }
}
