//! Lending requests

use crate::auth::api::endpoints::RequestLending;
use crate::auth::{ApiCaller, ApiJson, ApiRejection};
use crate::AppState;
use axum::{extract::State, http::StatusCode};
use crewdesk_applications::LendingRequest;
use tracing::info;

/// `POST /api/email {devices, fromDate, untilDate, comments}`
pub async fn request_lending(
    caller: ApiCaller<RequestLending>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LendingRequest>,
) -> Result<StatusCode, ApiRejection> {
    let payload = request.into_payload(&caller.session.email)?;
    state.lending.notify(&payload).await?;

    info!(caller = %caller.session.uid, devices = %payload.value1, "Lending request sent");
    Ok(StatusCode::OK)
}
