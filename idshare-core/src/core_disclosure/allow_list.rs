//! Per-operation writable-field allow-lists
//!
//! Client payloads are filtered down to the fields the calling role may write
//! before they are parsed into typed inputs. Anything else (ids, `sender_id`,
//! `status`, a sender's attempt at `linked_profile_variant_id`) is dropped.

use super::error::{DisclosureError, DisclosureResult};
use super::types::ProfileVariantId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Field name for errors not tied to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Writable fields for one operation
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    operation: &'static str,
    fields: &'static [&'static str],
}

pub const PROFILE_VARIANT_CREATE: AllowList = AllowList {
    operation: "create_profile_variant",
    fields: &["label", "context", "variant_value"],
};

pub const PROFILE_VARIANT_UPDATE: AllowList = AllowList {
    operation: "update_profile_variant",
    fields: &["label", "context", "variant_value"],
};

pub const REQUEST_CREATE: AllowList = AllowList {
    operation: "create_request",
    fields: &["receiver_username", "reasoning"],
};

pub const SENT_REQUEST_UPDATE: AllowList = AllowList {
    operation: "update_sent_request",
    fields: &["reasoning"],
};

pub const REQUEST_VARIANT_CREATE: AllowList = AllowList {
    operation: "create_request_variant",
    fields: &["label", "context"],
};

pub const SENT_REQUEST_VARIANT_UPDATE: AllowList = AllowList {
    operation: "update_sent_request_variant",
    fields: &["label", "context"],
};

pub const RECEIVED_REQUEST_VARIANT_UPDATE: AllowList = AllowList {
    operation: "update_received_request_variant",
    fields: &["linked_profile_variant_id"],
};

impl AllowList {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn permits(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Keep only writable fields of a JSON object payload
    pub fn filter(&self, payload: Value) -> DisclosureResult<Map<String, Value>> {
        let object = match payload {
            Value::Object(object) => object,
            Value::Null => Map::new(),
            _ => {
                return Err(DisclosureError::invalid(
                    NON_FIELD_ERRORS,
                    "Invalid data. Expected a dictionary.",
                ))
            }
        };

        let (kept, dropped): (Map<String, Value>, Map<String, Value>) =
            object.into_iter().partition(|(key, _)| self.permits(key));

        if !dropped.is_empty() {
            let names: Vec<&str> = dropped.keys().map(String::as_str).collect();
            tracing::debug!(operation = self.operation, dropped = ?names, "Ignored non-writable fields");
        }

        Ok(kept)
    }

    /// Filter then parse into a typed input
    pub fn parse<T: DeserializeOwned>(&self, payload: Value) -> DisclosureResult<T> {
        let kept = self.filter(payload)?;
        serde_json::from_value(Value::Object(kept))
            .map_err(|e| DisclosureError::invalid(NON_FIELD_ERRORS, e.to_string()))
    }
}

/// Receiver-writable link field.
///
/// Outer `None`: field absent, leave the link alone. `Some(None)`: explicit null, unlink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinkUpdate {
    #[serde(default, deserialize_with = "present")]
    pub linked_profile_variant_id: Option<Option<ProfileVariantId>>,
}

/// Distinguishes an explicit `null` from a missing field
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_disclosure::request::RequestPatch;
    use crate::core_disclosure::request_variant::{RequestVariantDraft, RequestVariantPatch};
    use serde_json::json;

    #[test]
    fn test_sender_cannot_rewrite_parties() {
        let patch: RequestPatch = SENT_REQUEST_UPDATE
            .parse(json!({
                "reasoning": "updated",
                "sender_id": 99,
                "receiver_id": 98,
                "status": "accepted"
            }))
            .unwrap();

        assert_eq!(patch.reasoning.as_deref(), Some("updated"));
    }

    #[test]
    fn test_filter_drops_unlisted_fields() {
        let kept = SENT_REQUEST_VARIANT_UPDATE
            .filter(json!({"label": "name", "linked_profile_variant_id": 3}))
            .unwrap();

        assert!(kept.contains_key("label"));
        assert!(!kept.contains_key("linked_profile_variant_id"));
    }

    #[test]
    fn test_receiver_cannot_write_label() {
        let update: LinkUpdate = RECEIVED_REQUEST_VARIANT_UPDATE
            .parse(json!({"label": "hijacked", "context": "x"}))
            .unwrap();
        assert_eq!(update, LinkUpdate::default());
    }

    #[test]
    fn test_link_update_distinguishes_null_from_absent() {
        let absent: LinkUpdate = RECEIVED_REQUEST_VARIANT_UPDATE.parse(json!({})).unwrap();
        assert_eq!(absent.linked_profile_variant_id, None);

        let unlink: LinkUpdate = RECEIVED_REQUEST_VARIANT_UPDATE
            .parse(json!({"linked_profile_variant_id": null}))
            .unwrap();
        assert_eq!(unlink.linked_profile_variant_id, Some(None));

        let link: LinkUpdate = RECEIVED_REQUEST_VARIANT_UPDATE
            .parse(json!({"linked_profile_variant_id": 7}))
            .unwrap();
        assert_eq!(link.linked_profile_variant_id, Some(Some(ProfileVariantId(7))));
    }

    #[test]
    fn test_non_object_payload_is_invalid() {
        let err = SENT_REQUEST_UPDATE.filter(json!(["reasoning"])).unwrap_err();
        match err {
            DisclosureError::Validation(errors) => assert!(errors.has_field(NON_FIELD_ERRORS)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let result: DisclosureResult<RequestVariantPatch> =
            SENT_REQUEST_VARIANT_UPDATE.parse(json!({"label": 12}));
        assert!(matches!(result, Err(DisclosureError::Validation(_))));
    }

    #[test]
    fn test_create_drops_request_id() {
        let draft: RequestVariantDraft = REQUEST_VARIANT_CREATE
            .parse(json!({"label": "first name", "context": "", "request": 4}))
            .unwrap();
        assert_eq!(draft.label, "first name");
    }
}
