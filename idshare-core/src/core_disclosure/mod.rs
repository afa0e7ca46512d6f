//! Identity-variant disclosure
//!
//! A sender asks a receiver for specific identity facts; the receiver answers by
//! linking each ask to one of their stored profile variants.
//!
//! ## Components
//!
//! - **Identity Store**: owner-scoped [`ProfileIdentityVariant`] records
//! - **Request Lifecycle**: [`Request`] and its Pending / Accepted / Denied state machine
//! - **Disclosure Linker**: [`RequestIdentityVariant`] asks and their links
//! - **Access Guard**: [`access`], consulted by every operation above
//!
//! A linked value is visible to the sender only while the request is Accepted.
//! Denying a request clears every link in the same transaction as the status write.

pub mod access;
pub mod account;
pub mod allow_list;
pub mod error;
pub mod identity_variant;
pub mod manager;
pub mod manager_impl;
pub mod request;
pub mod request_variant;
pub mod storage;
pub mod types;

pub use access::{AccessGuard, AccessPolicy, Caller, Principal};
pub use account::{Account, AccountCredentials};
pub use allow_list::{AllowList, LinkUpdate};
pub use error::{DisclosureError, DisclosureResult, FieldError, ValidationErrors};
pub use identity_variant::{ProfileIdentityVariant, ProfileVariantDraft, ProfileVariantPatch};
pub use manager::{AccountDirectory, DisclosureLinker, IdentityStore, ReceivedRequest, RequestLifecycle};
pub use manager_impl::DisclosureManager;
pub use request::{Request, RequestDraft, RequestPatch, RequestStatus, StatusTransition};
pub use request_variant::{
    RequestIdentityVariant, RequestVariantDetail, RequestVariantDraft, RequestVariantPatch,
    RequestVariantSummary,
};
pub use storage::DisclosureSqlStore;
pub use types::{ProfileVariantId, RequestId, RequestVariantId, Timestamp, UserId};
