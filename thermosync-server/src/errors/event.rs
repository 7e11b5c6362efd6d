use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Event end time must be after start time")]
    InvalidInterval,

    #[error("Time must be formatted as HH:MM or HH:MM:SS")]
    InvalidTimeFormat,

    #[error("Temperature must be between 16 and 30 degrees")]
    TemperatureOutOfRange,

    #[error("Invalid recurrence descriptor")]
    InvalidRecurrence,

    #[error("No date in the recurrence range falls on a selected weekday")]
    NoValidOccurrence,

    #[error("Device does not belong to the caller's tenancy")]
    DeviceNotOwned,

    #[error("An overlapping tenant event already exists on this device")]
    DuplicateTenantEvent,

    #[error("An overlapping event already exists for this sub-tenant on this device")]
    DuplicateSubTenantEvent,

    #[error("A tenant event occupies this window on this device")]
    TenantPriorityConflict,

    #[error("Event not found")]
    NotFound,

    #[error("Event is already active")]
    AlreadyActive,

    #[error("Event is not active")]
    NotActive,

    #[error("Event has reached a terminal status")]
    InvalidTerminalTransition,

    #[error("Recurring templates are never run directly; their daily instances are")]
    TemplateNotRunnable,

    #[error("Event is disabled")]
    EventDisabled,

    #[error("Event is already disabled")]
    AlreadyDisabled,

    #[error("Event is not disabled")]
    NotDisabled,

    #[error("Active events cannot be modified or deleted")]
    CannotModifyActive,

    #[error("Invalid or missing actor identity")]
    InvalidActor,
}

impl EventError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EventError::MissingField(_)
            | EventError::InvalidInterval
            | EventError::InvalidTimeFormat
            | EventError::TemperatureOutOfRange
            | EventError::InvalidRecurrence
            | EventError::NoValidOccurrence
            | EventError::InvalidActor => StatusCode::BAD_REQUEST,
            EventError::DeviceNotOwned => StatusCode::FORBIDDEN,
            EventError::DuplicateTenantEvent
            | EventError::DuplicateSubTenantEvent
            | EventError::TenantPriorityConflict
            | EventError::AlreadyActive
            | EventError::NotActive
            | EventError::InvalidTerminalTransition
            | EventError::TemplateNotRunnable
            | EventError::EventDisabled
            | EventError::AlreadyDisabled
            | EventError::NotDisabled
            | EventError::CannotModifyActive => StatusCode::CONFLICT,
            EventError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}
