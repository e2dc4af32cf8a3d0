//! Session cookie handling
//!
//! The raw identity token travels in a single cookie (`token` by default). The
//! server never trusts anything but the claims of a token that verified on this
//! request.

use crate::AppState;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use crewdesk_applications::{IdentityError, IdentityProvider, Role, VerifiedClaims};
use serde::Serialize;
use tracing::debug;

/// Identity of the caller for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedSession {
    pub uid: String,
    pub email: String,
    pub role: Role,
    /// Whether the token carried any role claim at all
    pub has_role_claim: bool,
}

impl From<VerifiedClaims> for VerifiedSession {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            role: claims.role(),
            has_role_claim: claims.has_role_claim(),
            uid: claims.uid,
            email: claims.email,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No session cookie")]
    Missing,
    #[error("Session token rejected: {0}")]
    Rejected(#[from] IdentityError),
}

/// Token from the session cookie. An empty value counts as missing.
pub fn session_token(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie carrying a freshly minted token
pub fn session_cookie(name: &str, token: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that overwrites the session with an empty value and `Max-Age=0`
pub fn clearing_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), String::new()))
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}

pub async fn verify_session(
    identity: &dyn IdentityProvider,
    token: &str,
) -> Result<VerifiedSession, IdentityError> {
    let claims = identity.verify_token(token).await?;
    Ok(claims.into())
}

/// Resolve the session from request headers, verifying on every call
pub async fn resolve_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<VerifiedSession, SessionError> {
    let jar = CookieJar::from_headers(headers);
    let token = session_token(&jar, state.cookie_name()).ok_or(SessionError::Missing)?;

    let session = verify_session(state.identity.as_ref(), &token).await?;
    debug!(uid = %session.uid, role = %session.role, "Session verified");
    Ok(session)
}
