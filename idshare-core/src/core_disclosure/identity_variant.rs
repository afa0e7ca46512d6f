//! Profile identity variants: labeled facts a user keeps about themselves

use super::error::{DisclosureResult, ValidationErrors};
use super::types::{ProfileVariantId, UserId};
use serde::{Deserialize, Serialize};

/// Maximum label length in characters
pub const MAX_LABEL_LEN: usize = 50;

/// Maximum stored value length in characters
pub const MAX_VARIANT_VALUE_LEN: usize = 100;

/// A single labeled fact, owned exclusively by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileIdentityVariant {
    pub id: ProfileVariantId,

    #[serde(skip_serializing)]
    pub owner_id: UserId,

    /// Short description, e.g. "first name"
    pub label: String,

    /// Private note on where the value applies, e.g. "in Polish"
    pub context: String,

    /// The value itself
    pub variant_value: String,
}

/// Input for creating a profile variant
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileVariantDraft {
    pub label: String,
    pub context: String,
    pub variant_value: String,
}

impl ProfileVariantDraft {
    pub fn new(
        label: impl Into<String>,
        context: impl Into<String>,
        variant_value: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            context: context.into(),
            variant_value: variant_value.into(),
        }
    }

    pub fn validate(&self) -> DisclosureResult<()> {
        let mut errors = ValidationErrors::new();
        check_label(&mut errors, &self.label);
        check_variant_value(&mut errors, &self.variant_value);
        errors.into_result()
    }
}

/// Partial update for a profile variant; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileVariantPatch {
    pub label: Option<String>,
    pub context: Option<String>,
    pub variant_value: Option<String>,
}

impl ProfileVariantPatch {
    pub fn validate(&self) -> DisclosureResult<()> {
        let mut errors = ValidationErrors::new();
        if let Some(label) = &self.label {
            check_label(&mut errors, label);
        }
        if let Some(value) = &self.variant_value {
            check_variant_value(&mut errors, value);
        }
        errors.into_result()
    }

    /// Apply the patch onto an existing record
    pub fn apply_to(self, variant: &mut ProfileIdentityVariant) {
        if let Some(label) = self.label {
            variant.label = label;
        }
        if let Some(context) = self.context {
            variant.context = context;
        }
        if let Some(value) = self.variant_value {
            variant.variant_value = value;
        }
    }
}

/// Shared `label` rules for profile and request variants
pub(crate) fn check_label(errors: &mut ValidationErrors, label: &str) {
    if label.trim().is_empty() {
        errors.add("label", "This field is required.");
    } else if label.chars().count() > MAX_LABEL_LEN {
        errors.add(
            "label",
            format!("Ensure this field has no more than {} characters.", MAX_LABEL_LEN),
        );
    }
}

fn check_variant_value(errors: &mut ValidationErrors, value: &str) {
    if value.trim().is_empty() {
        errors.add("variant_value", "This field is required.");
    } else if value.chars().count() > MAX_VARIANT_VALUE_LEN {
        errors.add(
            "variant_value",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_VARIANT_VALUE_LEN
            ),
        );
    }
}
