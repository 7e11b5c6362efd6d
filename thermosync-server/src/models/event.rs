use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime, Time};

use super::{ActorRole, Table};

/// Lifecycle state of an event. Orthogonal to the disable overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
    Stopped,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventStatus::Completed | EventStatus::Cancelled | EventStatus::Stopped
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i32,
    pub name: String,
    /// Always "device"; kept as a column for store compatibility.
    pub event_type: String,
    pub created_by_role: ActorRole,
    pub tenant_id: i32,
    pub sub_tenant_id: Option<i32>,
    pub device_id: i32,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    /// Pre-extension end time, recorded the first time the event is disabled.
    pub original_end_time: Option<OffsetDateTime>,
    pub temperature: i32,
    /// Temperature to leave the device at when the event completes.
    pub end_temperature: Option<i32>,
    pub power_on: bool,
    pub status: EventStatus,
    pub is_disabled: bool,
    pub disabled_at: Option<OffsetDateTime>,
    /// Accumulated milliseconds spent disabled.
    pub total_disabled_duration: i64,
    pub is_recurring: bool,
    pub recurring_type: Option<String>,
    /// JSON array of weekday indices, 0 = Sunday.
    pub days_of_week: Option<Value>,
    pub recurring_start_date: Option<Date>,
    pub recurring_end_date: Option<Date>,
    pub time_start: Option<Time>,
    pub time_end: Option<Time>,
    /// Set only on instances generated from a recurring template.
    pub parent_recurring_event_id: Option<i32>,
    pub started_at: Option<OffsetDateTime>,
    pub stopped_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    /// Durable deferred-deletion deadline, swept by the cleanup phase.
    pub delete_after: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

impl Event {
    /// A recurring definition that is materialized daily but never runs itself.
    pub fn is_template(&self) -> bool {
        self.is_recurring && self.parent_recurring_event_id.is_none()
    }

    /// Weekday indices (0 = Sunday) this template recurs on.
    pub fn days_of_week(&self) -> Vec<u8> {
        self.days_of_week
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|days| {
                days.iter()
                    .filter_map(|day| day.as_u64())
                    .filter(|day| *day <= 6)
                    .map(|day| day as u8)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// End the disable overlay enforces: the pre-extension deadline when one
    /// was recorded, the current end otherwise.
    pub fn effective_deadline(&self) -> OffsetDateTime {
        self.original_end_time.unwrap_or(self.end_time)
    }
}

#[derive(Clone)]
pub struct EventTable;

impl Table for EventTable {
    fn name(&self) -> &'static str {
        "events"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                event_type VARCHAR(32) NOT NULL DEFAULT 'device',
                created_by_role VARCHAR(32) NOT NULL,
                tenant_id INTEGER NOT NULL,
                sub_tenant_id INTEGER,
                device_id INTEGER NOT NULL,
                start_time TIMESTAMP NOT NULL,
                end_time TIMESTAMP NOT NULL,
                original_end_time TIMESTAMP,
                temperature INTEGER NOT NULL,
                end_temperature INTEGER,
                power_on BOOLEAN NOT NULL DEFAULT TRUE,
                status VARCHAR(32) NOT NULL DEFAULT 'scheduled',
                is_disabled BOOLEAN NOT NULL DEFAULT FALSE,
                disabled_at TIMESTAMP,
                total_disabled_duration BIGINT NOT NULL DEFAULT 0,
                is_recurring BOOLEAN NOT NULL DEFAULT FALSE,
                recurring_type VARCHAR(32),
                days_of_week JSON,
                recurring_start_date DATE,
                recurring_end_date DATE,
                time_start TIME,
                time_end TIME,
                parent_recurring_event_id INTEGER,
                started_at TIMESTAMP,
                stopped_at TIMESTAMP,
                completed_at TIMESTAMP,
                delete_after TIMESTAMP,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (device_id) REFERENCES devices (id) ON DELETE CASCADE,
                FOREIGN KEY (parent_recurring_event_id) REFERENCES events (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS events;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["devices"]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn sample_event() -> Event {
        Event {
            id: 1,
            name: "Morning warm-up".to_string(),
            event_type: "device".to_string(),
            created_by_role: ActorRole::Tenant,
            tenant_id: 1,
            sub_tenant_id: None,
            device_id: 1,
            start_time: datetime!(2026-03-02 08:00 UTC),
            end_time: datetime!(2026-03-02 10:00 UTC),
            original_end_time: None,
            temperature: 22,
            end_temperature: None,
            power_on: true,
            status: EventStatus::Scheduled,
            is_disabled: false,
            disabled_at: None,
            total_disabled_duration: 0,
            is_recurring: false,
            recurring_type: None,
            days_of_week: None,
            recurring_start_date: None,
            recurring_end_date: None,
            time_start: None,
            time_end: None,
            parent_recurring_event_id: None,
            started_at: None,
            stopped_at: None,
            completed_at: None,
            delete_after: None,
            updated_at: datetime!(2026-03-01 12:00 UTC),
        }
    }

    #[test]
    fn template_detection_requires_missing_parent() {
        let mut event = sample_event();
        assert!(!event.is_template());

        event.is_recurring = true;
        assert!(event.is_template());

        event.parent_recurring_event_id = Some(9);
        assert!(!event.is_template());
    }

    #[test]
    fn days_of_week_filters_invalid_entries() {
        let mut event = sample_event();
        event.days_of_week = Some(json!([0, 3, 6, 9, "x"]));

        assert_eq!(event.days_of_week(), vec![0, 3, 6]);
    }

    #[test]
    fn effective_deadline_prefers_original_end() {
        let mut event = sample_event();
        assert_eq!(event.effective_deadline(), event.end_time);

        event.original_end_time = Some(datetime!(2026-03-02 09:00 UTC));
        assert_eq!(event.effective_deadline(), datetime!(2026-03-02 09:00 UTC));
    }
}
