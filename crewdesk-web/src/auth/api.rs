//! API authorization
//!
//! Each mutating endpoint names an [`EndpointPolicy`]. Handlers take
//! [`ApiCaller<E>`] as their first argument and [`ApiJson`] (if any) last, so
//! the caller is authenticated and authorized before the body is even parsed:
//!
//! no cookie → `401`, token rejected → `401`, role outside the allow-set → `418`,
//! malformed body → `400`.

use super::session::{resolve_session, SessionError, VerifiedSession};
use crate::AppState;
use axum::{
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crewdesk_applications::{is_authorized, AllowSet, DeviceError, LendingError};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::{debug, error, warn};

/// Rejections of the JSON API. Always rendered as a bare status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApiRejection {
    #[error("missing or invalid session")]
    Unauthenticated,
    #[error("role not allowed")]
    Forbidden,
    #[error("malformed request")]
    BadRequest,
    #[error("conflict")]
    Conflict,
    #[error("internal error")]
    Internal,
}

impl ApiRejection {
    pub fn status(self) -> StatusCode {
        match self {
            ApiRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiRejection::Forbidden => StatusCode::IM_A_TEAPOT,
            ApiRejection::BadRequest => StatusCode::BAD_REQUEST,
            ApiRejection::Conflict => StatusCode::CONFLICT,
            ApiRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

impl From<DeviceError> for ApiRejection {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Invalid(message) => {
                debug!("Rejected device request: {}", message);
                ApiRejection::BadRequest
            }
            DeviceError::Forbidden(field) => {
                debug!("Rejected device edit touching '{}'", field);
                ApiRejection::Forbidden
            }
            DeviceError::Store(e) => {
                error!("Device storage failed: {}", e);
                ApiRejection::Internal
            }
        }
    }
}

impl From<LendingError> for ApiRejection {
    fn from(e: LendingError) -> Self {
        match e {
            LendingError::Invalid(message) => {
                debug!("Rejected lending request: {}", message);
                ApiRejection::BadRequest
            }
            LendingError::Delivery(message) => {
                error!("Lending request delivery failed: {}", message);
                ApiRejection::Internal
            }
        }
    }
}

/// Allow-set of one API endpoint
pub trait EndpointPolicy: Send + Sync + 'static {
    const NAME: &'static str;

    fn allow() -> AllowSet;
}

/// Verified and authorized caller of endpoint `E`
pub struct ApiCaller<E> {
    pub session: VerifiedSession,
    _endpoint: PhantomData<fn() -> E>,
}

impl<S, E> FromRequestParts<S> for ApiCaller<E>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    E: EndpointPolicy,
{
    type Rejection = ApiRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = match resolve_session(&parts.headers, &app_state).await {
            Ok(session) => session,
            Err(SessionError::Missing) => {
                debug!("{}: no session cookie", E::NAME);
                return Err(ApiRejection::Unauthenticated);
            }
            Err(SessionError::Rejected(e)) => {
                warn!("{}: session token rejected: {}", E::NAME, e);
                return Err(ApiRejection::Unauthenticated);
            }
        };

        if !is_authorized(session.role, &E::allow()) {
            warn!(
                uid = %session.uid,
                role = %session.role,
                "{}: role not allowed",
                E::NAME
            );
            return Err(ApiRejection::Forbidden);
        }

        Ok(ApiCaller {
            session,
            _endpoint: PhantomData,
        })
    }
}

/// JSON body whose rejection is a bare `400`
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!("Malformed JSON body: {}", e);
            ApiRejection::BadRequest
        })?;
        Ok(ApiJson(value))
    }
}

macro_rules! endpoint_policy {
    ($(#[$meta:meta])* $ty:ident, $name:literal, $allow:expr) => {
        $(#[$meta])*
        pub struct $ty;

        impl EndpointPolicy for $ty {
            const NAME: &'static str = $name;

            fn allow() -> AllowSet {
                $allow
            }
        }
    };
}

/// Policies of the guarded endpoints
pub mod endpoints {
    use super::EndpointPolicy;
    use crewdesk_applications::AllowSet;

    endpoint_policy!(ChangeRole, "changeRole", AllowSet::admin_only());
    endpoint_policy!(DeleteUser, "deleteUser", AllowSet::admin_only());
    endpoint_policy!(DeleteOwnAccount, "deleteOwnAccount", AllowSet::any());
    endpoint_policy!(
        /// Any verified identity; the handler itself refuses callers that already
        /// hold a role
        NewUser,
        "newUser",
        AllowSet::any()
    );
    endpoint_policy!(AddDevice, "devices/add", AllowSet::editors());
    endpoint_policy!(
        /// Members pass here; the field-level device policy narrows what they change
        EditDevice,
        "devices/edit",
        AllowSet::staff()
    );
    endpoint_policy!(BulkEditDevices, "devices/bulkEdit", AllowSet::admin_only());
    endpoint_policy!(RequestLending, "email", AllowSet::staff());
}

#[cfg(test)]
mod tests {
    use super::endpoints::*;
    use super::*;
    use crewdesk_applications::Role;

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(ApiRejection::Unauthenticated.status().as_u16(), 401);
        assert_eq!(ApiRejection::Forbidden.status().as_u16(), 418);
        assert_eq!(ApiRejection::BadRequest.status().as_u16(), 400);
        assert_eq!(ApiRejection::Internal.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn test_rejection_has_no_body() {
        use http_body_util::BodyExt;

        let response = ApiRejection::Forbidden.into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_endpoint_allow_sets() {
        assert!(ChangeRole::allow().contains(Role::Admin));
        assert!(!ChangeRole::allow().contains(Role::Moderator));
        assert!(AddDevice::allow().contains(Role::Moderator));
        assert!(!AddDevice::allow().contains(Role::Member));
        assert!(EditDevice::allow().contains(Role::Member));
        assert!(!EditDevice::allow().contains(Role::Public));
        assert!(NewUser::allow().contains(Role::Public));
        assert!(!BulkEditDevices::allow().contains(Role::Moderator));
    }
}
