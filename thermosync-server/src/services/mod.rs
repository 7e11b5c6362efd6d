pub mod bridge_service;
pub mod calendar_service;
pub mod event_service;
pub mod recurring_service;
pub mod scheduler_service;

pub use bridge_service::DeviceBridge;
pub use calendar_service::CalendarService;
pub use event_service::{EnableOutcome, EventChanges, EventDraft, EventService, RecurrenceDraft};
pub use recurring_service::RecurringService;
pub use scheduler_service::SchedulerService;
