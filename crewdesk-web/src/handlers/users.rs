//! User administration endpoints

use crate::auth::api::endpoints::{ChangeRole, DeleteOwnAccount, DeleteUser, NewUser};
use crate::auth::session::clearing_cookie;
use crate::auth::{ApiCaller, ApiJson, ApiRejection};
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use crewdesk_applications::{IdentityError, Role};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeRoleRequest {
    pub uid: Option<String>,
    #[serde(rename = "newRole")]
    pub new_role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteUserRequest {
    pub uid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    pub confirm: Option<String>,
}

fn required_uid(uid: Option<String>) -> Result<String, ApiRejection> {
    uid.filter(|uid| !uid.trim().is_empty())
        .ok_or(ApiRejection::BadRequest)
}

/// Unknown accounts answer like a forbidden call, so the endpoint does not
/// reveal which uids exist.
fn target_error(uid: &str, e: IdentityError) -> ApiRejection {
    match e {
        IdentityError::UserNotFound(_) => {
            debug!("Target account {} does not exist", uid);
            ApiRejection::Forbidden
        }
        e => {
            error!("Identity provider failed for {}: {}", uid, e);
            ApiRejection::Internal
        }
    }
}

/// `POST /api/changeRole {uid, newRole}`
pub async fn change_role(
    caller: ApiCaller<ChangeRole>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChangeRoleRequest>,
) -> Result<StatusCode, ApiRejection> {
    let uid = required_uid(request.uid)?;
    let role: Role = request
        .new_role
        .as_deref()
        .ok_or(ApiRejection::BadRequest)?
        .parse()
        .map_err(|_| ApiRejection::BadRequest)?;

    if !role.is_api_assignable() {
        warn!(caller = %caller.session.uid, "Refused to assign {} through the API", role);
        return Err(ApiRejection::BadRequest);
    }

    let target = state
        .identity
        .get_user(&uid)
        .await
        .map_err(|e| target_error(&uid, e))?;
    if target.role == Some(Role::Admin) {
        warn!(caller = %caller.session.uid, "Refused to change the role of admin {}", uid);
        return Err(ApiRejection::Forbidden);
    }

    state
        .identity
        .set_role_claim(&uid, role)
        .await
        .map_err(|e| target_error(&uid, e))?;

    info!(caller = %caller.session.uid, "Set role of {} to {}", uid, role);
    Ok(StatusCode::OK)
}

/// `POST /api/deleteUser {uid}`
pub async fn delete_user(
    caller: ApiCaller<DeleteUser>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteUserRequest>,
) -> Result<StatusCode, ApiRejection> {
    let uid = required_uid(request.uid)?;

    state
        .identity
        .delete_user(&uid)
        .await
        .map_err(|e| target_error(&uid, e))?;

    info!(caller = %caller.session.uid, "Deleted account {}", uid);
    Ok(StatusCode::OK)
}

/// `DELETE /api/deleteOwnAccount?confirm=true`
pub async fn delete_own_account(
    caller: ApiCaller<DeleteOwnAccount>,
    State(state): State<AppState>,
    jar: CookieJar,
    params: Result<Query<ConfirmParams>, QueryRejection>,
) -> Result<(CookieJar, StatusCode), ApiRejection> {
    let confirmed = matches!(
        params,
        Ok(Query(ConfirmParams { confirm: Some(ref value) })) if value == "true"
    );
    if !confirmed {
        return Err(ApiRejection::BadRequest);
    }

    let uid = caller.session.uid;
    state.identity.delete_user(&uid).await.map_err(|e| {
        error!("Failed to delete own account {}: {}", uid, e);
        ApiRejection::Internal
    })?;

    info!("Account {} deleted by its owner", uid);
    Ok((jar.add(clearing_cookie(state.cookie_name())), StatusCode::OK))
}

/// `POST /api/newUser`: give a fresh account the `public` role claim
pub async fn new_user(
    caller: ApiCaller<NewUser>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiRejection> {
    let session = caller.session;
    if session.has_role_claim {
        warn!(uid = %session.uid, role = %session.role, "newUser called by an account that already has a role");
        return Err(ApiRejection::Forbidden);
    }

    state
        .identity
        .set_role_claim(&session.uid, Role::Public)
        .await
        .map_err(|e| {
            error!("Failed to initialise role of {}: {}", session.uid, e);
            ApiRejection::Internal
        })?;

    info!(uid = %session.uid, "Initialised role claim of {}", session.email);
    Ok(StatusCode::OK)
}
