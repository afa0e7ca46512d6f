//! Registered user accounts

use super::error::{DisclosureResult, ValidationErrors};
use super::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Maximum username length in characters
pub const MAX_USERNAME_LEN: usize = 150;

/// Public view of a registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub created_at: Timestamp,
}

/// Stored login material for an account
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,

    /// PHC-formatted password hash
    pub password_hash: String,
}

/// Check a username against the account naming rules.
///
/// Letters, digits and `@ . + - _` only, at most 150 characters.
pub fn validate_username(username: &str) -> DisclosureResult<()> {
    let mut errors = ValidationErrors::new();

    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else {
        if username.chars().count() > MAX_USERNAME_LEN {
            errors.add(
                "username",
                format!("Ensure this field has no more than {} characters.", MAX_USERNAME_LEN),
            );
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("john").is_ok());
        assert!(validate_username("mary.jane+work@example_1-x").is_ok());
    }

    #[test]
    fn test_empty_username_rejected() {
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_username_charset() {
        assert!(validate_username("john doe").is_err());
        assert!(validate_username("john/doe").is_err());
    }

    #[test]
    fn test_username_length_limit() {
        let at_limit = "a".repeat(MAX_USERNAME_LEN);
        assert!(validate_username(&at_limit).is_ok());

        let over = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_username(&over).is_err());
    }
}
