//! Authentication and authorization using axum extractors
//!
//! - [`session`]: the `token` cookie and turning it into a [`VerifiedSession`]
//! - [`guard`]: page guard, redirects unauthorised visitors
//! - [`api`]: API authorization, rejects with bare status codes
//! - [`handlers`]: register/login/refresh/logout for the local identity provider

pub mod api;
pub mod guard;
pub mod handlers;
pub mod session;

pub use api::{ApiCaller, ApiJson, ApiRejection, EndpointPolicy};
pub use guard::{GuardRedirect, GuardedPage, ProtectedPage};
pub use session::VerifiedSession;
