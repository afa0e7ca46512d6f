use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use idshare_core::core_disclosure::{Account, AccountDirectory, DisclosureError, DisclosureManager};

use crate::error::{ApiError, ApiResult};

/// Password registration and login over the account directory
///
/// Hashing is CPU-bound; call these from a blocking task.
pub struct AuthManager {
    accounts: DisclosureManager,
    min_password_length: usize,
}

impl AuthManager {
    pub fn new(accounts: DisclosureManager, min_password_length: usize) -> Self {
        Self {
            accounts,
            min_password_length,
        }
    }

    pub fn register(&self, username: &str, password: &str) -> ApiResult<Account> {
        if password.chars().count() < self.min_password_length {
            return Err(DisclosureError::invalid(
                "password",
                format!(
                    "Ensure this field has at least {} characters.",
                    self.min_password_length
                ),
            )
            .into());
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(self.accounts.register_account(username, &password_hash)?)
    }

    /// Verify credentials; unknown user and wrong password fail the same way
    pub fn login(&self, username: &str, password: &str) -> ApiResult<Account> {
        let credentials = self
            .accounts
            .find_credentials(username)?
            .ok_or(ApiError::AuthenticationFailed)?;

        let parsed_hash = PasswordHash::new(&credentials.password_hash)
            .map_err(|e| ApiError::Internal(format!("Invalid password hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::AuthenticationFailed)?;

        Ok(credentials.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idshare_core::core_disclosure::DisclosureSqlStore;

    fn auth() -> AuthManager {
        let manager = DisclosureManager::new(DisclosureSqlStore::memory().unwrap());
        AuthManager::new(manager, 8)
    }

    #[test]
    fn test_register_then_login() {
        let auth = auth();
        let account = auth.register("john", "correct horse").unwrap();

        let logged_in = auth.login("john", "correct horse").unwrap();
        assert_eq!(logged_in.id, account.id);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let auth = auth();
        auth.register("john", "correct horse").unwrap();

        assert!(matches!(
            auth.login("john", "battery staple"),
            Err(ApiError::AuthenticationFailed)
        ));
        assert!(matches!(
            auth.login("nobody", "correct horse"),
            Err(ApiError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_short_password_is_invalid() {
        let auth = auth();
        match auth.register("john", "short") {
            Err(ApiError::Disclosure(DisclosureError::Validation(errors))) => {
                assert!(errors.has_field("password"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
