//! Authentication and Authorization Module
//!
//! - [`roles`]: roles, allow-sets and the authorization check
//! - [`identity`]: the identity provider seam
//! - [`provider`]: local JWT-backed identity provider
//! - [`context`]: client-side session state with periodic token refresh

pub mod context;
pub mod identity;
pub mod provider;
pub mod roles;

pub use context::{
    AuthContext, AuthSnapshot, IdTokenEvent, MemoryCookieStore, RefreshHandle,
    SessionCookieStore, SessionUser,
};
pub use identity::{
    IdentityError, IdentityProvider, IdentityRecord, IdentityResult, SignIn, VerifiedClaims,
};
pub use provider::{LocalIdentityProvider, LocalIdentityProviderBuilder};
pub use roles::{is_authorized, AllowSet, Role};
