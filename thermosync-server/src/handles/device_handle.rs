use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::configs::Storage;
use crate::errors::{ApiError, DeviceError};
use crate::repositories::DeviceRepository;
use crate::services::bridge_service::DeviceBridge;

#[derive(Clone)]
pub struct DeviceState {
    pub bridge: Arc<DeviceBridge>,
    pub storage: Arc<Storage>,
}

pub async fn get_devices(
    State(state): State<DeviceState>,
) -> Result<impl IntoResponse, ApiError> {
    let devices = DeviceRepository::new(state.storage.clone()).find_all().await?;

    Ok(Json(devices))
}

pub async fn get_device(
    State(state): State<DeviceState>,
    Path(device_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let device = DeviceRepository::new(state.storage.clone())
        .find_by_id(device_id)
        .await?
        .ok_or(DeviceError::DeviceNotFound)?;

    Ok(Json(device))
}

/// Persistent per-device channel, addressed by serial number.
pub async fn device_ws(
    State(state): State<DeviceState>,
    Path(serial): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| state.bridge.handle_device_socket(serial, socket))
}

/// Dashboard connection: receives broadcasts, may submit control messages.
pub async fn observer_ws(
    State(state): State<DeviceState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| state.bridge.handle_observer_socket(socket))
}
