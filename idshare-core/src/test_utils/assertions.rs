//! Assertions over disclosure results
//!
//! Each helper panics with the actual outcome, so failures show what the guard
//! returned instead of a bare `assert!(matches!(..))`.

use crate::core_disclosure::{DisclosureError, DisclosureResult};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

pub fn assert_not_found<T: Debug>(result: DisclosureResult<T>) {
    match result {
        Err(DisclosureError::NotFound { .. }) => {}
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

pub fn assert_forbidden<T: Debug>(result: DisclosureResult<T>) {
    match result {
        Err(DisclosureError::Forbidden { .. }) => {}
        other => panic!("Expected Forbidden, got {:?}", other),
    }
}

pub fn assert_unauthenticated<T: Debug>(result: DisclosureResult<T>) {
    match result {
        Err(DisclosureError::Unauthenticated) => {}
        other => panic!("Expected Unauthenticated, got {:?}", other),
    }
}

/// Assert a validation failure that names `field`
pub fn assert_invalid_field<T: Debug>(result: DisclosureResult<T>, field: &str) {
    match result {
        Err(DisclosureError::Validation(errors)) if errors.has_field(field) => {}
        other => panic!("Expected validation error on '{}', got {:?}", field, other),
    }
}
