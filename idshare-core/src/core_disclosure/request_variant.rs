//! Request identity variants: the per-field asks attached to a request
//!
//! The disclosed value is never stored. It is derived from the linked profile
//! variant and the parent request's status through [`disclose`].

use super::error::{DisclosureResult, ValidationErrors};
use super::identity_variant::check_label;
use super::request::RequestStatus;
use super::types::{ProfileVariantId, RequestId, RequestVariantId};
use serde::{Deserialize, Serialize};

/// A field slot on a request, optionally linked to one of the receiver's variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentityVariant {
    pub id: RequestVariantId,
    pub request_id: RequestId,
    pub label: String,
    pub context: String,
    pub linked_profile_variant_id: Option<ProfileVariantId>,
}

/// A request variant loaded together with what its disclosure depends on
#[derive(Debug, Clone)]
pub struct RequestVariantRecord {
    pub variant: RequestIdentityVariant,
    pub request_status: RequestStatus,

    /// Raw value of the linked profile variant, before status gating
    pub(crate) linked_value: Option<String>,
}

impl RequestVariantRecord {
    pub fn disclosed_value(&self) -> Option<String> {
        disclose(self.request_status, self.linked_value.as_deref())
    }
}

/// The single place a linked value becomes visible: linked AND Accepted
pub fn disclose(status: RequestStatus, linked_value: Option<&str>) -> Option<String> {
    if status.permits_disclosure() {
        linked_value.map(str::to_string)
    } else {
        None
    }
}

/// List view, identical for both parties and independent of status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestVariantSummary {
    pub id: RequestVariantId,
    pub label: String,
    pub context: String,
}

impl From<&RequestIdentityVariant> for RequestVariantSummary {
    fn from(variant: &RequestIdentityVariant) -> Self {
        Self {
            id: variant.id,
            label: variant.label.clone(),
            context: variant.context.clone(),
        }
    }
}

/// Detail view with the derived disclosed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestVariantDetail {
    pub id: RequestVariantId,
    pub request_id: RequestId,
    pub label: String,
    pub context: String,

    /// Present only in the receiver's view; inner `None` means unlinked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_profile_variant_id: Option<Option<ProfileVariantId>>,

    pub disclosed_value: Option<String>,
}

impl RequestVariantDetail {
    /// Sender's view: no link id
    pub fn for_sender(record: &RequestVariantRecord) -> Self {
        Self::build(record, None)
    }

    /// Receiver's view: includes the link id
    pub fn for_receiver(record: &RequestVariantRecord) -> Self {
        Self::build(record, Some(record.variant.linked_profile_variant_id))
    }

    fn build(
        record: &RequestVariantRecord,
        link: Option<Option<ProfileVariantId>>,
    ) -> Self {
        let variant = &record.variant;
        Self {
            id: variant.id,
            request_id: variant.request_id,
            label: variant.label.clone(),
            context: variant.context.clone(),
            linked_profile_variant_id: link,
            disclosed_value: record.disclosed_value(),
        }
    }
}

/// Input for attaching a field ask to a request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestVariantDraft {
    pub label: String,
    pub context: String,
}

impl RequestVariantDraft {
    pub fn new(label: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            context: context.into(),
        }
    }

    pub fn validate(&self) -> DisclosureResult<()> {
        let mut errors = ValidationErrors::new();
        check_label(&mut errors, &self.label);
        errors.into_result()
    }
}

/// Sender-writable request variant fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestVariantPatch {
    pub label: Option<String>,
    pub context: Option<String>,
}

impl RequestVariantPatch {
    pub fn validate(&self) -> DisclosureResult<()> {
        let mut errors = ValidationErrors::new();
        if let Some(label) = &self.label {
            check_label(&mut errors, label);
        }
        errors.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.context.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: RequestStatus, linked: Option<&str>) -> RequestVariantRecord {
        RequestVariantRecord {
            variant: RequestIdentityVariant {
                id: RequestVariantId(5),
                request_id: RequestId(2),
                label: "first name".to_string(),
                context: "in Polish".to_string(),
                linked_profile_variant_id: linked.map(|_| ProfileVariantId(9)),
            },
            request_status: status,
            linked_value: linked.map(str::to_string),
        }
    }

    #[test]
    fn test_disclose_requires_link_and_accepted() {
        assert_eq!(disclose(RequestStatus::Accepted, Some("Michal")), Some("Michal".to_string()));
        assert_eq!(disclose(RequestStatus::Accepted, None), None);
        assert_eq!(disclose(RequestStatus::Pending, Some("Michal")), None);
        assert_eq!(disclose(RequestStatus::Denied, Some("Michal")), None);
    }

    #[test]
    fn test_sender_detail_hides_link_id() {
        let detail = RequestVariantDetail::for_sender(&record(RequestStatus::Accepted, Some("Michal")));
        let json = serde_json::to_value(&detail).unwrap();

        assert!(json.get("linked_profile_variant_id").is_none());
        assert_eq!(json["disclosed_value"], "Michal");
    }

    #[test]
    fn test_receiver_detail_shows_null_link() {
        let detail = RequestVariantDetail::for_receiver(&record(RequestStatus::Accepted, None));
        let json = serde_json::to_value(&detail).unwrap();

        assert!(json["linked_profile_variant_id"].is_null());
        assert!(json.get("linked_profile_variant_id").is_some());
        assert!(json["disclosed_value"].is_null());
    }

    #[test]
    fn test_summary_has_no_value() {
        let rec = record(RequestStatus::Accepted, Some("Michal"));
        let json = serde_json::to_value(RequestVariantSummary::from(&rec.variant)).unwrap();
        assert!(json.get("disclosed_value").is_none());
        assert_eq!(json["label"], "first name");
    }

    #[test]
    fn test_draft_validation() {
        assert!(RequestVariantDraft::new("", "ctx").validate().is_err());
        assert!(RequestVariantDraft::new("first name", "").validate().is_ok());
    }

    #[test]
    fn test_empty_patch() {
        assert!(RequestVariantPatch::default().is_empty());
    }
}
