// Authentication Failure Types
// Login failures shown back to the user on the login form

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the last login attempt failed.
///
/// These are expected outcomes of a login POST, recorded in the session and
/// rendered on the next login view. They never abort request processing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Account is disabled")]
    AccountDisabled,
}

impl AuthenticationError {
    /// Translation key for the login form
    pub fn message_key(&self) -> &'static str {
        match self {
            AuthenticationError::BadCredentials => "security.login.bad_credentials",
            AuthenticationError::MissingCredentials => "security.login.missing_credentials",
            AuthenticationError::AccountDisabled => "security.login.account_disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys_are_distinct() {
        let keys = [
            AuthenticationError::BadCredentials.message_key(),
            AuthenticationError::MissingCredentials.message_key(),
            AuthenticationError::AccountDisabled.message_key(),
        ];
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert_ne!(keys[0], keys[2]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AuthenticationError::BadCredentials.to_string(),
            "Invalid credentials"
        );
    }
}
