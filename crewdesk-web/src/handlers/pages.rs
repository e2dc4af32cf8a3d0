//! Server-rendered pages

use crate::auth::guard::{AccountPage, AdminPage, TechnikPage};
use crate::auth::GuardedPage;
use crate::templates::{
    render, AccountTemplate, AdminTemplate, IndexTemplate, LoginTemplate, TechnikTemplate,
};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crewdesk_applications::{is_authorized, AllowSet, Role};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub msg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub redirect: Option<String>,
}

pub async fn index_page(Query(params): Query<IndexParams>) -> Response {
    render(&IndexTemplate::new(params.msg))
}

pub async fn login_page(Query(params): Query<LoginParams>) -> Response {
    render(&LoginTemplate::new(params.redirect))
}

pub async fn admin_page(page: GuardedPage<AdminPage>, State(state): State<AppState>) -> Response {
    let session = page.into_session();

    match state.identity.list_users().await {
        Ok(users) => render(&AdminTemplate::new(
            session.email,
            &users,
            state.settings.auth.refresh_interval_secs,
        )),
        Err(e) => {
            error!("Failed to list users: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn technik_page(page: GuardedPage<TechnikPage>, State(state): State<AppState>) -> Response {
    let session = page.into_session();

    match state.devices.list_sorted().await {
        Ok(devices) => render(&TechnikTemplate {
            title: "Crewdesk - Technik".to_string(),
            is_admin: session.role == Role::Admin,
            can_edit_inventory: is_authorized(session.role, &AllowSet::editors()),
            email: session.email,
            devices,
            refresh_secs: state.settings.auth.refresh_interval_secs,
        }),
        Err(e) => {
            error!("Failed to list devices: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn account_page(page: GuardedPage<AccountPage>, State(state): State<AppState>) -> Response {
    let session = page.into_session();

    render(&AccountTemplate {
        title: "Crewdesk - Account".to_string(),
        role: session.role.to_string(),
        has_role: session.has_role_claim,
        email: session.email,
        refresh_secs: state.settings.auth.refresh_interval_secs,
    })
}
