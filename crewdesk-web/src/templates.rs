//! Template system for server-side rendering
//!
//! This module provides templates for server-side rendering using Askama.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use crewdesk_applications::{Device, IdentityRecord, Role};
use tracing::error;

/// Landing page
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub version: String,
    pub msg: Option<String>,
}

/// Login page
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub title: String,
    /// Page to return to after sign-in, without leading slash
    pub redirect: String,
}

/// User administration
#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub title: String,
    pub email: String,
    pub groups: Vec<RoleGroup>,
    /// Session cookie refresh interval in seconds
    pub refresh_secs: u64,
}

/// Equipment inventory
#[derive(Template)]
#[template(path = "technik.html")]
pub struct TechnikTemplate {
    pub title: String,
    pub email: String,
    pub is_admin: bool,
    pub can_edit_inventory: bool,
    pub devices: Vec<Device>,
    pub refresh_secs: u64,
}

/// Own account
#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub title: String,
    pub email: String,
    pub role: String,
    pub has_role: bool,
    pub refresh_secs: u64,
}

/// Users sharing one role on the admin page
pub struct RoleGroup {
    pub role: String,
    pub users: Vec<UserRow>,
}

pub struct UserRow {
    pub uid: String,
    pub email: String,
    /// Admins are listed without an update control
    pub can_update: bool,
}

impl IndexTemplate {
    pub fn new(msg: Option<String>) -> Self {
        Self {
            title: "Crewdesk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            msg,
        }
    }
}

impl LoginTemplate {
    pub fn new(redirect: Option<String>) -> Self {
        Self {
            title: "Crewdesk - Login".to_string(),
            redirect: redirect
                .filter(|target| is_local_redirect(target))
                .unwrap_or_default(),
        }
    }
}

/// A redirect target must stay a relative path on this site once prefixed with `/`
fn is_local_redirect(target: &str) -> bool {
    !target.starts_with('/')
        && !target.starts_with('\\')
        && !target.contains("://")
        && !target.chars().any(char::is_control)
}

impl AdminTemplate {
    /// Group users by effective role, highest role first
    pub fn new(email: String, users: &[IdentityRecord], refresh_secs: u64) -> Self {
        let groups = Role::ALL
            .iter()
            .rev()
            .map(|role| RoleGroup {
                role: role.to_string(),
                users: users
                    .iter()
                    .filter(|user| user.effective_role() == *role)
                    .map(|user| UserRow {
                        uid: user.uid.clone(),
                        email: user.email.clone(),
                        can_update: *role != Role::Admin,
                    })
                    .collect(),
            })
            .filter(|group| !group.users.is_empty())
            .collect();

        Self {
            title: "Crewdesk - Admin".to_string(),
            email,
            groups,
            refresh_secs,
        }
    }
}

/// Render a template, logging failures as `500`
pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
