pub mod message;

pub use message::application::{ObserverCommand, ObserverEvent};
pub use message::device::{DeviceCommand, DeviceTelemetry};

/// Database surrogate identifier shared by every entity.
pub type Id = i32;
