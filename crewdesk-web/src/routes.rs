//! Route definitions for the Crewdesk web server

use crate::{auth, handlers, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Server-rendered pages
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index_page))
        .route("/login", get(handlers::login_page))
        .route("/admin", get(handlers::admin_page))
        .route("/technik", get(handlers::technik_page))
        .route("/account", get(handlers::account_page))
}

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Local identity provider
        .route("/auth/register", post(auth::handlers::register_user))
        .route("/auth/login", post(auth::handlers::login_user))
        .route("/auth/refresh", post(auth::handlers::refresh_token))
        .route("/auth/logout", post(auth::handlers::logout_user))
        // User administration
        .route("/changeRole", post(handlers::change_role))
        .route("/deleteUser", post(handlers::delete_user))
        .route("/deleteOwnAccount", delete(handlers::delete_own_account))
        .route("/newUser", post(handlers::new_user))
        // Inventory
        .route("/devices/add", post(handlers::add_device))
        .route("/devices/edit", post(handlers::edit_device))
        .route("/devices/bulkEdit", post(handlers::bulk_edit_devices))
        // Lending
        .route("/email", post(handlers::request_lending))
}
