//! Server route guard for protected pages

use super::session::{resolve_session, SessionError, VerifiedSession};
use crate::AppState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use crewdesk_applications::{is_authorized, AllowSet};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Message shown on the landing page after a role check failed
pub const INSUFFICIENT_AUTHENTICATION: &str = "InsufficientAuthentication";

/// A page that only some roles may see
pub trait ProtectedPage: Send + Sync + 'static {
    const PATH: &'static str;

    fn allow() -> AllowSet;
}

/// Extractor that admits a request to page `P` or redirects it.
///
/// Runs on every request before the page handler; nothing is cached between
/// requests.
pub struct GuardedPage<P> {
    pub session: VerifiedSession,
    _page: PhantomData<fn() -> P>,
}

impl<P> GuardedPage<P> {
    pub fn into_session(self) -> VerifiedSession {
        self.session
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRedirect {
    /// Not signed in (or the token did not verify): go to the login page
    Login { path: &'static str },
    /// Signed in with a role outside the allow-set
    Insufficient,
}

impl GuardRedirect {
    pub fn location(&self) -> String {
        match self {
            GuardRedirect::Login { path } => login_location(path),
            GuardRedirect::Insufficient => format!("/?msg={}", INSUFFICIENT_AUTHENTICATION),
        }
    }
}

impl IntoResponse for GuardRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.location()).into_response()
    }
}

/// `/login?redirect=<path without leading slash>`
pub fn login_location(path: &str) -> String {
    format!(
        "/login?redirect={}",
        urlencoding::encode(path.trim_start_matches('/'))
    )
}

impl<S, P> FromRequestParts<S> for GuardedPage<P>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    P: ProtectedPage,
{
    type Rejection = GuardRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = match resolve_session(&parts.headers, &app_state).await {
            Ok(session) => session,
            Err(SessionError::Missing) => {
                debug!("No session for {}, redirecting to login", P::PATH);
                return Err(GuardRedirect::Login { path: P::PATH });
            }
            Err(SessionError::Rejected(e)) => {
                warn!("Session for {} rejected: {}", P::PATH, e);
                return Err(GuardRedirect::Login { path: P::PATH });
            }
        };

        if !is_authorized(session.role, &P::allow()) {
            warn!(
                uid = %session.uid,
                role = %session.role,
                "Role not allowed on {}",
                P::PATH
            );
            return Err(GuardRedirect::Insufficient);
        }

        Ok(GuardedPage {
            session,
            _page: PhantomData,
        })
    }
}

/// `/admin`: user administration
pub struct AdminPage;

impl ProtectedPage for AdminPage {
    const PATH: &'static str = "/admin";

    fn allow() -> AllowSet {
        AllowSet::admin_only()
    }
}

/// `/technik`: equipment inventory
pub struct TechnikPage;

impl ProtectedPage for TechnikPage {
    const PATH: &'static str = "/technik";

    fn allow() -> AllowSet {
        AllowSet::staff()
    }
}

/// `/account`: own account, any verified identity
pub struct AccountPage;

impl ProtectedPage for AccountPage {
    const PATH: &'static str = "/account";

    fn allow() -> AllowSet {
        AllowSet::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_location_strips_leading_slash() {
        assert_eq!(login_location("/technik"), "/login?redirect=technik");
        assert_eq!(login_location("/admin/users"), "/login?redirect=admin%2Fusers");
    }

    #[test]
    fn test_insufficient_location() {
        assert_eq!(
            GuardRedirect::Insufficient.location(),
            "/?msg=InsufficientAuthentication"
        );
    }

    #[test]
    fn test_redirect_is_temporary() {
        let response = GuardRedirect::Login { path: "/admin" }.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/login?redirect=admin"
        );
    }
}
