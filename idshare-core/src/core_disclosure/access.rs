//! Access Guard
//!
//! Every disclosure operation passes through here. Authentication is checked first
//! ([`Principal::require`]); authorization is a typed policy per resource type
//! ([`AccessPolicy`]), dispatched statically.
//!
//! A caller outside a resource's scope is told the resource does not exist
//! (`NotFound`). `Forbidden` only reaches a caller who holds the right role but is
//! blocked by the parent request's status.
//!
//! Successful checks hand out role relations ([`OwnerOf`], [`SenderOf`],
//! [`ReceiverOf`]). They can only be built in this module, and every store
//! mutation demands the matching one.

use super::error::{DisclosureError, DisclosureResult};
use super::identity_variant::ProfileIdentityVariant;
use super::request::Request;
use super::request_variant::RequestIdentityVariant;
use super::types::{ProfileVariantId, RequestId, UserId};
use crate::metrics;

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub username: String,
}

impl Caller {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Whoever is invoking an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Authenticated(Caller),
}

impl Principal {
    /// Authentication gate, checked before any lookup
    pub fn require(&self) -> DisclosureResult<&Caller> {
        match self {
            Principal::Authenticated(caller) => Ok(caller),
            Principal::Anonymous => {
                metrics::access_denied("unauthenticated");
                tracing::debug!("Rejected anonymous caller");
                Err(DisclosureError::Unauthenticated)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Authenticated(_))
    }
}

impl From<Caller> for Principal {
    fn from(caller: Caller) -> Self {
        Principal::Authenticated(caller)
    }
}

/// Why a check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Caller has no role on the resource
    OutOfScope,

    /// Caller has the role but the request status blocks the operation
    Precondition(&'static str),
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    fn role(holds: bool) -> Self {
        if holds {
            Decision::Allow
        } else {
            Decision::Deny(Denial::OutOfScope)
        }
    }

    fn and_then(self, next: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => next(),
            deny => deny,
        }
    }
}

/// Authorization capability, implemented once per resource type
pub trait AccessPolicy {
    type Operation: Copy + std::fmt::Debug;

    /// Name used in `NotFound` errors
    const RESOURCE: &'static str;

    fn authorize(&self, caller: &Caller, op: Self::Operation) -> Decision;
}

/// Operations on a profile identity variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariantOp {
    Read,
    Update,
    Delete,
    /// Use as a link target
    LinkTarget,
}

impl AccessPolicy for ProfileIdentityVariant {
    type Operation = ProfileVariantOp;
    const RESOURCE: &'static str = "ProfileIdentityVariant";

    fn authorize(&self, caller: &Caller, _op: ProfileVariantOp) -> Decision {
        Decision::role(caller.user_id == self.owner_id)
    }
}

/// Which side of a request an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    fn held_by(&self, caller: &Caller, request: &Request) -> bool {
        match self {
            Role::Sender => caller.user_id == request.sender_id,
            Role::Receiver => caller.user_id == request.receiver_id,
        }
    }
}

/// Operations on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOp {
    ReadAsSender,
    UpdateReasoning,
    Delete,
    ManageVariants,
    ReadAsReceiver,
    Accept,
    Deny,
}

impl RequestOp {
    pub fn role(&self) -> Role {
        match self {
            RequestOp::ReadAsSender
            | RequestOp::UpdateReasoning
            | RequestOp::Delete
            | RequestOp::ManageVariants => Role::Sender,
            RequestOp::ReadAsReceiver | RequestOp::Accept | RequestOp::Deny => Role::Receiver,
        }
    }
}

impl AccessPolicy for Request {
    type Operation = RequestOp;
    const RESOURCE: &'static str = "Request";

    fn authorize(&self, caller: &Caller, op: RequestOp) -> Decision {
        // Status never blocks a request-level operation
        Decision::role(op.role().held_by(caller, self))
    }
}

/// Operations on a request identity variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVariantOp {
    ReadAsSender,
    EditAsSender,
    DeleteAsSender,
    ListAsReceiver,
    ReadDetailAsReceiver,
    Link,
    ReadDisclosed,
}

impl RequestVariantOp {
    /// `None` means either party
    fn role(&self) -> Option<Role> {
        match self {
            RequestVariantOp::ReadAsSender
            | RequestVariantOp::EditAsSender
            | RequestVariantOp::DeleteAsSender => Some(Role::Sender),
            RequestVariantOp::ListAsReceiver
            | RequestVariantOp::ReadDetailAsReceiver
            | RequestVariantOp::Link => Some(Role::Receiver),
            RequestVariantOp::ReadDisclosed => None,
        }
    }

    fn needs_accepted(&self) -> bool {
        matches!(self, RequestVariantOp::ReadDetailAsReceiver | RequestVariantOp::Link)
    }
}

/// A request variant checked against its parent request's rules
#[derive(Debug, Clone, Copy)]
pub struct ChildOf<'a> {
    pub variant: &'a RequestIdentityVariant,
    pub parent: &'a Request,
}

impl AccessPolicy for ChildOf<'_> {
    type Operation = RequestVariantOp;
    const RESOURCE: &'static str = "RequestIdentityVariant";

    fn authorize(&self, caller: &Caller, op: RequestVariantOp) -> Decision {
        if self.variant.request_id != self.parent.id {
            return Decision::Deny(Denial::OutOfScope);
        }

        let in_scope = match op.role() {
            Some(role) => role.held_by(caller, self.parent),
            None => {
                Role::Sender.held_by(caller, self.parent)
                    || Role::Receiver.held_by(caller, self.parent)
            }
        };

        Decision::role(in_scope).and_then(|| {
            if op.needs_accepted() && !self.parent.status.permits_disclosure() {
                Decision::Deny(Denial::Precondition("request is not accepted"))
            } else {
                Decision::Allow
            }
        })
    }
}

/// Caller owns a profile variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerOf {
    user_id: UserId,
    variant_id: ProfileVariantId,
}

impl OwnerOf {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn variant_id(&self) -> ProfileVariantId {
        self.variant_id
    }
}

/// Caller is a request's sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderOf {
    user_id: UserId,
    request_id: RequestId,
}

impl SenderOf {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Caller is a request's receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverOf {
    user_id: UserId,
    request_id: RequestId,
}

impl ReceiverOf {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Turns policy decisions into errors and role relations
pub struct AccessGuard;

impl AccessGuard {
    /// Check `op` on a looked-up resource; absent and out-of-scope are the same `NotFound`
    pub fn check<R: AccessPolicy>(
        caller: &Caller,
        resource: Option<&R>,
        op: R::Operation,
    ) -> DisclosureResult<()> {
        let decision = match resource {
            Some(resource) => resource.authorize(caller, op),
            None => Decision::Deny(Denial::OutOfScope),
        };

        match decision {
            Decision::Allow => Ok(()),
            Decision::Deny(Denial::OutOfScope) => {
                metrics::access_denied("not_found");
                tracing::debug!(user = %caller.user_id, resource = R::RESOURCE, ?op, "Out of scope");
                Err(DisclosureError::not_found(R::RESOURCE))
            }
            Decision::Deny(Denial::Precondition(reason)) => {
                metrics::access_denied("forbidden");
                tracing::debug!(user = %caller.user_id, resource = R::RESOURCE, ?op, reason, "Precondition failed");
                Err(DisclosureError::forbidden(reason))
            }
        }
    }

    pub fn owner_of(
        caller: &Caller,
        variant: Option<&ProfileIdentityVariant>,
        op: ProfileVariantOp,
    ) -> DisclosureResult<OwnerOf> {
        Self::check(caller, variant, op)?;
        let variant = variant.ok_or(DisclosureError::not_found(ProfileIdentityVariant::RESOURCE))?;
        Ok(OwnerOf {
            user_id: caller.user_id,
            variant_id: variant.id,
        })
    }

    pub fn sender_of(
        caller: &Caller,
        request: Option<&Request>,
        op: RequestOp,
    ) -> DisclosureResult<SenderOf> {
        debug_assert_eq!(op.role(), Role::Sender);
        Self::check(caller, request, op)?;
        let request = request.ok_or(DisclosureError::not_found(Request::RESOURCE))?;
        Ok(SenderOf {
            user_id: caller.user_id,
            request_id: request.id,
        })
    }

    pub fn receiver_of(
        caller: &Caller,
        request: Option<&Request>,
        op: RequestOp,
    ) -> DisclosureResult<ReceiverOf> {
        debug_assert_eq!(op.role(), Role::Receiver);
        Self::check(caller, request, op)?;
        let request = request.ok_or(DisclosureError::not_found(Request::RESOURCE))?;
        Ok(ReceiverOf {
            user_id: caller.user_id,
            request_id: request.id,
        })
    }

    /// Receiver relation for link writes, which also require an Accepted parent
    pub fn linker_of(caller: &Caller, child: Option<ChildOf<'_>>) -> DisclosureResult<ReceiverOf> {
        Self::check(caller, child.as_ref(), RequestVariantOp::Link)?;
        let child = child.ok_or(DisclosureError::not_found(ChildOf::RESOURCE))?;
        Ok(ReceiverOf {
            user_id: caller.user_id,
            request_id: child.parent.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_disclosure::request::RequestStatus;
    use crate::core_disclosure::types::{RequestVariantId, Timestamp};

    const SENDER: UserId = UserId(1);
    const RECEIVER: UserId = UserId(2);
    const STRANGER: UserId = UserId(3);

    fn caller(id: UserId) -> Caller {
        Caller::new(id, format!("user{}", id))
    }

    fn request(status: RequestStatus) -> Request {
        Request {
            id: RequestId(10),
            sender_id: SENDER,
            receiver_id: RECEIVER,
            sender_username: "john".to_string(),
            receiver_username: "mary".to_string(),
            reasoning: "need info".to_string(),
            created_at: Timestamp::from_millis(0),
            status,
        }
    }

    fn child() -> RequestIdentityVariant {
        RequestIdentityVariant {
            id: RequestVariantId(20),
            request_id: RequestId(10),
            label: "first name".to_string(),
            context: String::new(),
            linked_profile_variant_id: None,
        }
    }

    #[test]
    fn test_anonymous_is_unauthenticated() {
        let err = Principal::Anonymous.require().unwrap_err();
        assert!(matches!(err, DisclosureError::Unauthenticated));
        assert!(Principal::from(caller(SENDER)).require().is_ok());
    }

    #[test]
    fn test_profile_variant_owner_only() {
        let variant = ProfileIdentityVariant {
            id: ProfileVariantId(1),
            owner_id: RECEIVER,
            label: "first name".to_string(),
            context: String::new(),
            variant_value: "Michal".to_string(),
        };

        assert!(AccessGuard::owner_of(&caller(RECEIVER), Some(&variant), ProfileVariantOp::Read).is_ok());
        let err = AccessGuard::owner_of(&caller(SENDER), Some(&variant), ProfileVariantOp::Read).unwrap_err();
        assert!(matches!(err, DisclosureError::NotFound { .. }));
    }

    #[test]
    fn test_request_roles_are_disjoint() {
        let req = request(RequestStatus::Pending);

        assert!(AccessGuard::sender_of(&caller(SENDER), Some(&req), RequestOp::Delete).is_ok());
        assert!(AccessGuard::sender_of(&caller(RECEIVER), Some(&req), RequestOp::Delete).is_err());
        assert!(AccessGuard::receiver_of(&caller(RECEIVER), Some(&req), RequestOp::Accept).is_ok());
        assert!(AccessGuard::receiver_of(&caller(SENDER), Some(&req), RequestOp::Accept).is_err());
    }

    #[test]
    fn test_stranger_gets_not_found() {
        let req = request(RequestStatus::Accepted);
        for op in [RequestOp::ReadAsSender, RequestOp::ReadAsReceiver, RequestOp::Deny] {
            let err = AccessGuard::check(&caller(STRANGER), Some(&req), op).unwrap_err();
            assert!(matches!(err, DisclosureError::NotFound { resource: "Request" }));
        }
    }

    #[test]
    fn test_absent_resource_is_not_found() {
        let err = AccessGuard::check::<Request>(&caller(SENDER), None, RequestOp::ReadAsSender)
            .unwrap_err();
        assert!(matches!(err, DisclosureError::NotFound { .. }));
    }

    #[test]
    fn test_receiver_detail_forbidden_until_accepted() {
        let variant = child();
        for status in [RequestStatus::Pending, RequestStatus::Denied] {
            let parent = request(status);
            let target = ChildOf { variant: &variant, parent: &parent };
            let err = AccessGuard::check(
                &caller(RECEIVER),
                Some(&target),
                RequestVariantOp::ReadDetailAsReceiver,
            )
            .unwrap_err();
            assert!(matches!(err, DisclosureError::Forbidden { .. }));
        }

        let parent = request(RequestStatus::Accepted);
        let target = ChildOf { variant: &variant, parent: &parent };
        assert!(AccessGuard::check(&caller(RECEIVER), Some(&target), RequestVariantOp::ReadDetailAsReceiver).is_ok());
    }

    #[test]
    fn test_scope_checked_before_status() {
        let variant = child();
        let parent = request(RequestStatus::Pending);
        let target = ChildOf { variant: &variant, parent: &parent };

        // Sender asking for the receiver-only link op is out of scope, not forbidden
        let err = AccessGuard::linker_of(&caller(SENDER), Some(target)).unwrap_err();
        assert!(matches!(err, DisclosureError::NotFound { .. }));
    }

    #[test]
    fn test_sender_reads_child_in_any_status() {
        let variant = child();
        for status in [RequestStatus::Pending, RequestStatus::Accepted, RequestStatus::Denied] {
            let parent = request(status);
            let target = ChildOf { variant: &variant, parent: &parent };
            assert!(AccessGuard::check(&caller(SENDER), Some(&target), RequestVariantOp::ReadAsSender).is_ok());
        }
    }

    #[test]
    fn test_disclosed_read_allows_either_party() {
        let variant = child();
        let parent = request(RequestStatus::Pending);
        let target = ChildOf { variant: &variant, parent: &parent };

        assert!(AccessGuard::check(&caller(SENDER), Some(&target), RequestVariantOp::ReadDisclosed).is_ok());
        assert!(AccessGuard::check(&caller(RECEIVER), Some(&target), RequestVariantOp::ReadDisclosed).is_ok());
        assert!(AccessGuard::check(&caller(STRANGER), Some(&target), RequestVariantOp::ReadDisclosed).is_err());
    }

    #[test]
    fn test_mismatched_parent_is_out_of_scope() {
        let mut variant = child();
        variant.request_id = RequestId(99);
        let parent = request(RequestStatus::Accepted);
        let target = ChildOf { variant: &variant, parent: &parent };

        let err = AccessGuard::check(&caller(SENDER), Some(&target), RequestVariantOp::ReadAsSender)
            .unwrap_err();
        assert!(matches!(err, DisclosureError::NotFound { .. }));
    }

    #[test]
    fn test_relations_carry_caller_and_resource() {
        let req = request(RequestStatus::Accepted);
        let receiver = AccessGuard::receiver_of(&caller(RECEIVER), Some(&req), RequestOp::Deny).unwrap();
        assert_eq!(receiver.user_id(), RECEIVER);
        assert_eq!(receiver.request_id(), RequestId(10));
    }
}
