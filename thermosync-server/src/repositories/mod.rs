mod activity_log;
mod device;
mod event;

pub use activity_log::ActivityLogRepository;
pub use device::DeviceRepository;
pub use event::EventRepository;
