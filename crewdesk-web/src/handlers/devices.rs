//! Inventory endpoints

use crate::auth::api::endpoints::{AddDevice, BulkEditDevices, EditDevice};
use crate::auth::{ApiCaller, ApiJson, ApiRejection};
use crate::AppState;
use axum::{extract::State, http::StatusCode};
use crewdesk_applications::devices::{BulkField, DeviceEdit, NewDevice};
use serde::Deserialize;
use tracing::{debug, info};

/// Separator of the joined id string sent by the bulk edit dialog
const BULK_ID_SEPARATOR: &str = "+++";

/// Device ids as a JSON list or as one `+++`-joined string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BulkIds {
    List(Vec<String>),
    Joined(String),
}

impl BulkIds {
    pub fn into_ids(self) -> Vec<String> {
        let ids = match self {
            BulkIds::List(ids) => ids,
            BulkIds::Joined(joined) => joined
                .split(BULK_ID_SEPARATOR)
                .map(str::to_string)
                .collect(),
        };
        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkEditRequest {
    pub ids: Option<BulkIds>,
    pub cat: Option<String>,
    pub value: Option<String>,
}

/// `POST /api/devices/add`
pub async fn add_device(
    caller: ApiCaller<AddDevice>,
    State(state): State<AppState>,
    ApiJson(device): ApiJson<NewDevice>,
) -> Result<StatusCode, ApiRejection> {
    let device = state.devices.add(device).await?;
    info!(caller = %caller.session.uid, "Device {} added", device.id);
    Ok(StatusCode::OK)
}

/// `POST /api/devices/edit`
pub async fn edit_device(
    caller: ApiCaller<EditDevice>,
    State(state): State<AppState>,
    ApiJson(edit): ApiJson<DeviceEdit>,
) -> Result<StatusCode, ApiRejection> {
    let device = state.devices.edit(caller.session.role, edit).await?;
    debug!(caller = %caller.session.uid, "Device {} edited", device.id);
    Ok(StatusCode::OK)
}

/// `POST /api/devices/bulkEdit {ids, cat, value}`
pub async fn bulk_edit_devices(
    caller: ApiCaller<BulkEditDevices>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkEditRequest>,
) -> Result<StatusCode, ApiRejection> {
    let field: BulkField = request
        .cat
        .as_deref()
        .ok_or(ApiRejection::BadRequest)?
        .parse()
        .map_err(|_| ApiRejection::BadRequest)?;
    let value = request.value.ok_or(ApiRejection::BadRequest)?;
    let ids = request
        .ids
        .map(BulkIds::into_ids)
        .ok_or(ApiRejection::BadRequest)?;

    let updated = state.devices.bulk_edit(&ids, field, &value).await?;
    info!(caller = %caller.session.uid, "Bulk edited {} devices", updated);
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_ids_accept_both_shapes() {
        let list: BulkIds = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(list.into_ids(), vec!["a", "b"]);

        let joined: BulkIds = serde_json::from_str(r#""a+++b+++""#).unwrap();
        assert_eq!(joined.into_ids(), vec!["a", "b"]);
    }
}
