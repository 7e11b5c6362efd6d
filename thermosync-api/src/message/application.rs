use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Id;

/// Notification broadcast to every connected observer (dashboard) client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObserverEvent {
    EventCreated {
        event_id: Id,
        device_id: Id,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    EventStarted {
        event_id: Id,
        device_id: Id,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    EventStopped {
        event_id: Id,
        device_id: Id,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    EventCompleted {
        event_id: Id,
        device_id: Id,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    EventDeleted {
        event_id: Id,
        device_id: Id,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    /// Ephemeral device state change, rebroadcast from inbound telemetry.
    DeviceStateChanged {
        serial: String,
        power: Option<bool>,
        temperature: Option<i32>,
        locked: Option<bool>,
        room_temperature: Option<i32>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
}

/// Device-control request an observer connection may submit. The bridge
/// translates these into the corresponding outbound device commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObserverCommand {
    SetPower { serial: String, power: bool },
    SetTemperature { serial: String, temp: i32 },
    PulseTemperature { serial: String, steps: i32 },
    SetLock { serial: String, locked: bool },
}
