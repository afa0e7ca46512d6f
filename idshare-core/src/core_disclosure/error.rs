//! Error taxonomy for disclosure operations

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result type for disclosure operations
pub type DisclosureResult<T> = Result<T, DisclosureError>;

/// Errors surfaced by every disclosure operation.
///
/// `NotFound` covers both "absent" and "caller has no role on it"; `Forbidden` is
/// only produced for the correct-role party blocked by a request status.
#[derive(Debug, thiserror::Error)]
pub enum DisclosureError {
    /// No authenticated principal was supplied
    #[error("Authentication required")]
    Unauthenticated,

    /// Resource does not exist or is outside the caller's scope
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// Caller holds the right role but a precondition blocks the operation
    #[error("Forbidden: {reason}")]
    Forbidden { reason: &'static str },

    /// Malformed input
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DisclosureError {
    pub fn not_found(resource: &'static str) -> Self {
        DisclosureError::NotFound { resource }
    }

    pub fn forbidden(reason: &'static str) -> Self {
        DisclosureError::Forbidden { reason }
    }

    /// Single-field validation failure
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        DisclosureError::Validation(errors)
    }
}

impl From<rusqlite::Error> for DisclosureError {
    fn from(e: rusqlite::Error) -> Self {
        DisclosureError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for DisclosureError {
    fn from(e: r2d2::Error) -> Self {
        DisclosureError::Storage(format!("connection pool: {}", e))
    }
}

impl From<ValidationErrors> for DisclosureError {
    fn from(errors: ValidationErrors) -> Self {
        DisclosureError::Validation(errors)
    }
}

/// A single field-level validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collected field-level validation failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether any message was recorded against `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Messages grouped by field name
    pub fn by_field(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut grouped: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            grouped.entry(error.field).or_default().push(error.message.clone());
        }
        grouped
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), DisclosureError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DisclosureError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
