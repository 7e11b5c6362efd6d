mod activity_log;
mod actor;
mod device;
mod event;

pub use activity_log::{ActivityLog, ActivityLogTable};
pub use actor::{Actor, ActorRole};
pub use device::{Device, DeviceTable};
pub use event::{Event, EventStatus, EventTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
