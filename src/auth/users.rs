// User Provider
// Users come from configuration; passwords are stored as Argon2 PHC strings

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::error::AuthenticationError;
use crate::config::UserConfig;
use crate::error::AppError;

/// Role every authenticated user holds
pub const ROLE_USER: &str = "ROLE_USER";

/// The user attached to an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    password_hash: String,
    roles: Vec<String>,
    enabled: bool,
}

/// Looks users up by name and checks their passwords
#[derive(Debug, Default)]
pub struct UserProvider {
    users: HashMap<String, StoredUser>,
}

impl UserProvider {
    /// Build from configuration. Malformed hashes are configuration errors.
    pub fn from_config(users: &[UserConfig]) -> Result<Self, AppError> {
        let mut provider = Self::default();
        for user in users {
            PasswordHash::new(&user.password_hash).map_err(|e| {
                AppError::invalid_config(
                    format!("users.{}.password_hash", user.username),
                    e.to_string(),
                )
            })?;

            let mut roles = user.roles.clone();
            if !roles.iter().any(|r| r == ROLE_USER) {
                roles.insert(0, ROLE_USER.to_string());
            }

            provider.users.insert(
                user.username.clone(),
                StoredUser {
                    password_hash: user.password_hash.clone(),
                    roles,
                    enabled: user.enabled,
                },
            );
        }
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials. Unknown users and wrong passwords both yield
    /// `BadCredentials`.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthenticationError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthenticationError::MissingCredentials);
        }

        let Some(stored) = self.users.get(username) else {
            return Err(AuthenticationError::BadCredentials);
        };

        let hash = PasswordHash::new(&stored.password_hash).map_err(|e| {
            warn!(user = username, "stored password hash is unreadable: {}", e);
            AuthenticationError::BadCredentials
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|_| AuthenticationError::BadCredentials)?;

        if !stored.enabled {
            return Err(AuthenticationError::AccountDisabled);
        }

        Ok(AuthenticatedUser {
            username: username.to_string(),
            roles: stored.roles.clone(),
        })
    }
}

/// Hash a password into an Argon2id PHC string for the `users` configuration
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::internal(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::internal(e.to_string()))?;
    Ok(hash.to_string())
}
