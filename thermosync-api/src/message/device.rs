use serde::{Deserialize, Serialize};

/// Telemetry sent by a physical device over its persistent channel.
///
/// The `type` tag and field names mirror what the hardware firmware emits,
/// so the enum deserializes straight off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceTelemetry {
    /// Power state changed on the hardware side.
    PowerUpdate {
        /// Serial number of the reporting device.
        serial: String,
        /// New power state.
        power: bool,
    },
    /// Target temperature changed on the hardware side.
    TempUpdate {
        /// Serial number of the reporting device.
        serial: String,
        /// New target temperature in whole degrees.
        temp: i32,
    },
    /// Panel lock state changed.
    LockUpdate {
        /// Serial number of the reporting device.
        serial: String,
        /// New lock state.
        locked: bool,
    },
    /// Ambient room temperature reading.
    RoomTempUpdate {
        /// Serial number of the reporting device.
        serial: String,
        /// Measured room temperature in whole degrees.
        room_temp: i32,
    },
    /// Hardware detected an out-of-band change from a physical IR remote.
    IrViolation {
        /// Serial number of the reporting device.
        serial: String,
        /// Temperature the hardware now holds after the violation.
        temp: i32,
    },
}

impl DeviceTelemetry {
    /// Serial number of the device that produced this message.
    pub fn serial(&self) -> &str {
        match self {
            Self::PowerUpdate { serial, .. }
            | Self::TempUpdate { serial, .. }
            | Self::LockUpdate { serial, .. }
            | Self::RoomTempUpdate { serial, .. }
            | Self::IrViolation { serial, .. } => serial,
        }
    }
}

/// Command pushed to a physical device. Fire-and-forget, no acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceCommand {
    PowerOn,
    PowerOff,
    /// Absolute temperature setpoint.
    SetTemp { temp: i32 },
    /// Relative adjustment expressed as signed remote-button steps.
    TempPulse { steps: i32 },
    Lock,
    Unlock,
    /// Human-readable lifecycle annotation shown on the device display.
    EventStatus { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_deserializes_wire_tags() {
        let msg: DeviceTelemetry =
            serde_json::from_str(r#"{"type":"POWER_UPDATE","serial":"AC-01","power":true}"#)
                .unwrap();
        assert_eq!(
            msg,
            DeviceTelemetry::PowerUpdate {
                serial: "AC-01".to_string(),
                power: true,
            }
        );

        let msg: DeviceTelemetry =
            serde_json::from_str(r#"{"type":"IR_VIOLATION","serial":"AC-01","temp":27}"#).unwrap();
        assert_eq!(msg.serial(), "AC-01");
    }

    #[test]
    fn command_serializes_wire_tags() {
        let json = serde_json::to_value(DeviceCommand::SetTemp { temp: 22 }).unwrap();
        assert_eq!(json["type"], "SET_TEMP");
        assert_eq!(json["temp"], 22);

        let json = serde_json::to_value(DeviceCommand::TempPulse { steps: -3 }).unwrap();
        assert_eq!(json["type"], "TEMP_PULSE");
        assert_eq!(json["steps"], -3);

        let json = serde_json::to_value(DeviceCommand::PowerOff).unwrap();
        assert_eq!(json["type"], "POWER_OFF");
    }
}
