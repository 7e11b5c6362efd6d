//! Shared fixtures for in-crate unit tests.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::configs::{Database, SchemaManager, Storage};
use crate::models::{ActorRole, Event, EventStatus};
use crate::services::CalendarService;

pub async fn setup_test_db() -> Arc<Storage> {
    Arc::new(
        Storage::new(
            Database {
                url: String::from("sqlite::memory:"),
                clean_start: true,
            },
            SchemaManager::default(),
        )
        .await
        .unwrap(),
    )
}

pub fn test_calendar() -> CalendarService {
    CalendarService::from_offset_str("+02:00").unwrap()
}

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Insert a device owned by tenant 1 and return its id.
pub async fn seed_device(storage: &Arc<Storage>, serial_number: &str) -> i32 {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO devices (serial_number, name, tenant_id, is_on, temperature, is_locked, updated_at)
            VALUES ($1, 'Test Unit', 1, FALSE, 22, FALSE, $2)
            RETURNING id;
        "#,
    )
    .bind(serial_number)
    .bind(now_utc())
    .fetch_one(storage.get_pool())
    .await
    .unwrap();

    id
}

/// A plain scheduled tenant event over the given window.
pub fn test_event(device_id: i32, start_time: OffsetDateTime, end_time: OffsetDateTime) -> Event {
    Event {
        id: 0,
        name: "Test Event".to_string(),
        event_type: "device".to_string(),
        created_by_role: ActorRole::Tenant,
        tenant_id: 1,
        sub_tenant_id: None,
        device_id,
        start_time,
        end_time,
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
        updated_at: start_time,
    }
}
