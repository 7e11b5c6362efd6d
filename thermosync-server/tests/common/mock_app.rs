use std::sync::Arc;

use time::OffsetDateTime;

use thermosync_server::configs::{Database, SchemaManager, Storage};
use thermosync_server::models::{Actor, ActorRole, Device, Event, EventStatus};
use thermosync_server::repositories::{DeviceRepository, EventRepository};
use thermosync_server::services::{
    CalendarService, DeviceBridge, EventService, RecurringService, SchedulerService,
};

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub calendar: CalendarService,
    pub bridge: Arc<DeviceBridge>,
    pub event_service: Arc<EventService>,
    pub recurring: RecurringService,
    pub scheduler: Arc<SchedulerService>,
    pub events: EventRepository,
    pub devices: DeviceRepository,
}

impl MockApp {
    pub async fn new() -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    url: String::from("sqlite::memory:"),
                    clean_start: true,
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let calendar = CalendarService::from_offset_str("+02:00").unwrap();
        let bridge = Arc::new(DeviceBridge::new(storage.clone()));
        let event_service = Arc::new(EventService::new(storage.clone(), bridge.clone(), calendar));
        let recurring = RecurringService::new(storage.clone(), calendar);
        let events = EventRepository::new(storage.clone());
        let devices = DeviceRepository::new(storage.clone());

        let scheduler = Arc::new(SchedulerService::new(
            events.clone(),
            event_service.clone(),
            RecurringService::new(storage.clone(), calendar),
            bridge.clone(),
            calendar,
        ));

        Self {
            storage,
            calendar,
            bridge,
            event_service,
            recurring,
            scheduler,
            events,
            devices,
        }
    }

    pub fn tenant(&self) -> Actor {
        Actor::Tenant { id: 1 }
    }

    pub fn sub_tenant(&self) -> Actor {
        Actor::SubTenant { id: 10, tenant_id: 1 }
    }

    /// Device owned by tenant 1 and assigned to sub-tenant 10.
    pub async fn create_test_device(&self, serial_number: &str) -> Device {
        sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices
                (serial_number, name, tenant_id, sub_tenant_id, is_on, temperature, is_locked, updated_at)
                VALUES ($1, 'Conference Room AC', 1, 10, FALSE, 22, FALSE, $2)
                RETURNING *;
            "#,
        )
        .bind(serial_number)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }

    /// A plain scheduled tenant event over the given window, for direct
    /// repository inserts that bypass orchestration.
    pub fn scheduled_event(
        &self,
        device_id: i32,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
    ) -> Event {
        Event {
            id: 0,
            name: "Seeded Event".to_string(),
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

    pub async fn insert_event(&self, event: &Event) -> i32 {
        let mut tx = self.storage.get_pool().begin().await.unwrap();
        let id = self.events.create(event, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        id
    }

    /// Device owned by a different tenant entirely.
    pub async fn create_foreign_device(&self, serial_number: &str) -> Device {
        sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices
                (serial_number, name, tenant_id, is_on, temperature, is_locked, updated_at)
                VALUES ($1, 'Lobby AC', 99, FALSE, 22, FALSE, $2)
                RETURNING *;
            "#,
        )
        .bind(serial_number)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }
}
