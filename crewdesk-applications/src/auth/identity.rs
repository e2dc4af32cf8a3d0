//! Identity provider seam
//!
//! The identity provider issues signed tokens and owns the `role` custom claim.
//! Everything above it (route guard, API middleware, client context) only talks to
//! this trait.

use super::roles::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Account record as stored by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    /// Raw custom claim; `None` until someone assigns a role
    pub role: Option<Role>,
}

impl IdentityRecord {
    /// Effective role, `Public` when no claim is attached
    pub fn effective_role(&self) -> Role {
        self.role.unwrap_or(Role::Public)
    }
}

/// Claims resolved from a verified token.
///
/// The role claim is the one embedded at issuance time; a role change only shows
/// up here once the token has been refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub role_claim: Option<String>,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl VerifiedClaims {
    pub fn role(&self) -> Role {
        Role::from_claim(self.role_claim.as_deref())
    }

    pub fn has_role_claim(&self) -> bool {
        self.role_claim.is_some()
    }
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: IdentityRecord,
    pub token: String,
}

/// Identity provider errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Token creation failed")]
    TokenCreation,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl IdentityError {
    /// Token could not be turned into trusted claims
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidToken | IdentityError::TokenExpired
        )
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity provider operations used by crewdesk
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify signature, expiry and that the account still exists
    async fn verify_token(&self, token: &str) -> IdentityResult<VerifiedClaims>;

    /// Mint a fresh token for the same account carrying its current role claim
    async fn refresh_token(&self, token: &str) -> IdentityResult<String>;

    /// Set the `role` custom claim
    async fn set_role_claim(&self, uid: &str, role: Role) -> IdentityResult<()>;

    async fn delete_user(&self, uid: &str) -> IdentityResult<()>;

    async fn get_user(&self, uid: &str) -> IdentityResult<IdentityRecord>;

    async fn list_users(&self) -> IdentityResult<Vec<IdentityRecord>>;

    /// Create an account without any role claim
    async fn register(&self, email: &str, password: &str) -> IdentityResult<IdentityRecord>;

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<SignIn>;
}
