//! Local identity provider
//!
//! In-process implementation of [`IdentityProvider`]: accounts in memory, argon2
//! password hashes, HS256 identity tokens carrying the `role` custom claim.

use super::identity::{
    IdentityError, IdentityProvider, IdentityRecord, IdentityResult, SignIn, VerifiedClaims,
};
use super::roles::Role;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// Claims carried inside an identity token
#[derive(Debug, Serialize, Deserialize, Clone)]
struct TokenClaims {
    sub: String,
    email: String,
    email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct Account {
    record: IdentityRecord,
    password_hash: String,
}

#[derive(Default)]
struct Accounts {
    by_uid: HashMap<String, Account>,
    uid_by_email: HashMap<String, String>,
}

/// Builder for [`LocalIdentityProvider`]
pub struct LocalIdentityProviderBuilder {
    secret: Vec<u8>,
    token_ttl: Duration,
    hash_params: Params,
}

impl LocalIdentityProviderBuilder {
    /// Token lifetime
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Argon2 cost. Falls back to the argon2 defaults on invalid values.
    pub fn hash_cost(mut self, memory_kib: u32, iterations: u32) -> Self {
        match Params::new(memory_kib, iterations, 1, None) {
            Ok(params) => self.hash_params = params,
            Err(e) => warn!("Ignoring invalid argon2 parameters: {}", e),
        }
        self
    }

    pub fn build(self) -> LocalIdentityProvider {
        LocalIdentityProvider {
            encoding: EncodingKey::from_secret(&self.secret),
            decoding: DecodingKey::from_secret(&self.secret),
            token_ttl: self.token_ttl,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, self.hash_params),
            accounts: RwLock::new(Accounts::default()),
        }
    }
}

/// In-memory identity provider
pub struct LocalIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
    hasher: Argon2<'static>,
    accounts: RwLock<Accounts>,
}

impl LocalIdentityProvider {
    pub fn builder(secret: impl AsRef<[u8]>) -> LocalIdentityProviderBuilder {
        LocalIdentityProviderBuilder {
            secret: secret.as_ref().to_vec(),
            token_ttl: Duration::hours(1),
            hash_params: Params::default(),
        }
    }

    /// Create an account with a preset role claim. This is the out-of-band path,
    /// the only one able to produce an `Admin`.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> IdentityResult<IdentityRecord> {
        let record = self.create_account(email, password, role, true)?;
        info!(uid = %record.uid, role = ?record.role, "Seeded account {}", record.email);
        Ok(record)
    }

    fn read(&self) -> RwLockReadGuard<'_, Accounts> {
        self.accounts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Accounts> {
        self.accounts.write().unwrap_or_else(|e| e.into_inner())
    }

    fn create_account(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
        email_verified: bool,
    ) -> IdentityResult<IdentityRecord> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(IdentityError::InvalidCredentials);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let password_hash = self.hash_password(password)?;

        let mut accounts = self.write();
        if accounts.uid_by_email.contains_key(&email) {
            return Err(IdentityError::EmailTaken);
        }

        let record = IdentityRecord {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            email_verified,
            role,
        };
        accounts.uid_by_email.insert(email, record.uid.clone());
        accounts.by_uid.insert(
            record.uid.clone(),
            Account {
                record: record.clone(),
                password_hash,
            },
        );

        Ok(record)
    }

    fn hash_password(&self, password: &str) -> IdentityResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| IdentityError::Hashing(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn mint(&self, record: &IdentityRecord) -> IdentityResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: record.uid.clone(),
            email: record.email.clone(),
            email_verified: record.email_verified,
            role: record.role.map(|role| role.to_string()),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            warn!("Failed to encode identity token: {}", e);
            IdentityError::TokenCreation
        })
    }

    fn decode(&self, token: &str) -> IdentityResult<TokenClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token verification failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                    _ => IdentityError::InvalidToken,
                }
            })
    }

    fn record(&self, uid: &str) -> IdentityResult<IdentityRecord> {
        self.read()
            .by_uid
            .get(uid)
            .map(|account| account.record.clone())
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn verify_token(&self, token: &str) -> IdentityResult<VerifiedClaims> {
        let claims = self.decode(token)?;

        // Tokens of deleted accounts stop verifying immediately.
        if !self.read().by_uid.contains_key(&claims.sub) {
            debug!(uid = %claims.sub, "Token belongs to a deleted account");
            return Err(IdentityError::InvalidToken);
        }

        Ok(VerifiedClaims {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            role_claim: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    async fn refresh_token(&self, token: &str) -> IdentityResult<String> {
        let claims = self.decode(token)?;
        let record = self.record(&claims.sub).map_err(|_| IdentityError::InvalidToken)?;
        debug!(uid = %record.uid, role = ?record.role, "Refreshing identity token");
        self.mint(&record)
    }

    async fn set_role_claim(&self, uid: &str, role: Role) -> IdentityResult<()> {
        let mut accounts = self.write();
        let account = accounts
            .by_uid
            .get_mut(uid)
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))?;
        account.record.role = Some(role);
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> IdentityResult<()> {
        let mut accounts = self.write();
        let account = accounts
            .by_uid
            .remove(uid)
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))?;
        accounts.uid_by_email.remove(&account.record.email);
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> IdentityResult<IdentityRecord> {
        self.record(uid)
    }

    async fn list_users(&self) -> IdentityResult<Vec<IdentityRecord>> {
        let mut users: Vec<IdentityRecord> = self
            .read()
            .by_uid
            .values()
            .map(|account| account.record.clone())
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn register(&self, email: &str, password: &str) -> IdentityResult<IdentityRecord> {
        let record = self.create_account(email, password, None, false)?;
        info!(uid = %record.uid, "Registered account {}", record.email);
        Ok(record)
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<SignIn> {
        let email = email.trim().to_lowercase();
        let account = {
            let accounts = self.read();
            accounts
                .uid_by_email
                .get(&email)
                .and_then(|uid| accounts.by_uid.get(uid))
                .cloned()
        }
        .ok_or(IdentityError::InvalidCredentials)?;

        if !self.verify_password(password, &account.password_hash) {
            warn!("Invalid password for {}", email);
            return Err(IdentityError::InvalidCredentials);
        }

        let token = self.mint(&account.record)?;
        Ok(SignIn {
            user: account.record,
            token,
        })
    }
}
