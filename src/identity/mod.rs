//! Identity provider port and a local SQLite-backed implementation.

mod local;

pub use local::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::UserId;

/// Minimum password length accepted when creating an account.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated identity, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: String,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    #[error("Password should be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("An account already exists for {0}")]
    EmailAlreadyInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Identity provider error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Operations consumed from an authentication service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Receiver notified whenever the signed-in user changes.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Trim and lowercase an email address, rejecting anything without an `@`
/// between two non-empty parts.
pub fn normalize_email(raw_email: &str) -> Result<String, AuthError> {
    let email = raw_email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail(raw_email.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
    }

    #[test]
    fn test_normalize_email_rejects_invalid() {
        for raw in ["", "foobar.baz", "@example.com", "ada@"] {
            assert!(
                matches!(normalize_email(raw), Err(AuthError::InvalidEmail(_))),
                "{raw} should be rejected"
            );
        }
    }
}
