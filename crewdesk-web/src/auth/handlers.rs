//! Account handlers for the local identity provider: registration, login,
//! token refresh and logout.

use super::api::{ApiJson, ApiRejection};
use super::session::{clearing_cookie, session_cookie, session_token};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::CookieJar;
use crewdesk_applications::IdentityError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Create an account without any role claim
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<Credentials>,
) -> Result<Json<RegisteredUser>, ApiRejection> {
    let record = state
        .identity
        .register(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            IdentityError::WeakPassword(_) | IdentityError::InvalidCredentials => {
                ApiRejection::BadRequest
            }
            IdentityError::EmailTaken => ApiRejection::Conflict,
            e => {
                error!("Registration failed: {}", e);
                ApiRejection::Internal
            }
        })?;

    info!(uid = %record.uid, "Registered account {}", record.email);
    Ok(Json(RegisteredUser {
        uid: record.uid,
        email: record.email,
    }))
}

/// Sign in and mirror the token into the session cookie
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<Credentials>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiRejection> {
    let sign_in = state
        .identity
        .sign_in(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidCredentials | IdentityError::UserNotFound(_) => {
                warn!("Failed login for {}", request.email);
                ApiRejection::Unauthenticated
            }
            e => {
                error!("Login failed: {}", e);
                ApiRejection::Internal
            }
        })?;

    info!(uid = %sign_in.user.uid, "Signed in {}", sign_in.user.email);
    let jar = jar.add(session_cookie(state.cookie_name(), &sign_in.token));
    Ok((jar, Json(TokenResponse { token: sign_in.token })))
}

/// Re-mint the cookie token so it carries the account's current role claim
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>), ApiRejection> {
    let token = session_token(&jar, state.cookie_name()).ok_or(ApiRejection::Unauthenticated)?;

    let token = state.identity.refresh_token(&token).await.map_err(|e| {
        warn!("Token refresh rejected: {}", e);
        if e.is_credential_failure() {
            ApiRejection::Unauthenticated
        } else {
            ApiRejection::Internal
        }
    })?;

    let jar = jar.add(session_cookie(state.cookie_name(), &token));
    Ok((jar, Json(TokenResponse { token })))
}

/// Clear the session cookie
pub async fn logout_user(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(clearing_cookie(state.cookie_name())), StatusCode::OK)
}
