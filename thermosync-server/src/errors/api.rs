use super::{DeviceError, EventError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Event error: {0}")]
    EventError(#[from] EventError),

    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
