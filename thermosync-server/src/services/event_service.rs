use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use thermosync_api::ObserverEvent;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::configs::Storage;
use crate::errors::{ApiError, DeviceError, EventError};
use crate::models::{Actor, ActorRole, Device, Event, EventStatus};
use crate::repositories::{ActivityLogRepository, DeviceRepository, EventRepository};
use crate::services::bridge_service::DeviceBridge;
use crate::services::calendar_service::CalendarService;

pub const MIN_TEMPERATURE: i32 = 16;
pub const MAX_TEMPERATURE: i32 = 30;

/// Grace between a terminal transition and deletion of the row, enforced by
/// the cleanup sweep via the durable `delete_after` column.
pub const DELETE_GRACE: time::Duration = time::Duration::seconds(5);

#[derive(Debug, Clone, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub device_id: i32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub temperature: i32,
    pub end_temperature: Option<i32>,
    #[serde(default = "default_power_on")]
    pub power_on: bool,
    pub recurrence: Option<RecurrenceDraft>,
}

fn default_power_on() -> bool {
    true
}

/// Weekly recurrence descriptor. Times are venue-local wall clock.
#[derive(Debug, Clone, Deserialize)]
pub struct RecurrenceDraft {
    pub days_of_week: Vec<u8>,
    pub start_date: Date,
    pub end_date: Date,
    pub time_start: String,
    pub time_end: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventChanges {
    pub name: Option<String>,
    pub temperature: Option<i32>,
    pub end_temperature: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

/// Outcome of enabling a disabled event. `Expired` is the by-design
/// non-success case: the original window closed while the event was paused.
#[derive(Debug)]
pub enum EnableOutcome {
    Enabled(Event),
    Expired,
}

struct PreparedEvent {
    event: Event,
    immediate_start: bool,
}

/// Role-parameterized business logic for the event lifecycle: validation,
/// conflict arbitration, state transitions, and device-state application.
pub struct EventService {
    storage: Arc<Storage>,
    events: EventRepository,
    devices: DeviceRepository,
    activity: ActivityLogRepository,
    bridge: Arc<DeviceBridge>,
    calendar: CalendarService,
}

impl EventService {
    pub fn new(storage: Arc<Storage>, bridge: Arc<DeviceBridge>, calendar: CalendarService) -> Self {
        Self {
            events: EventRepository::new(storage.clone()),
            devices: DeviceRepository::new(storage.clone()),
            activity: ActivityLogRepository::new(storage.clone()),
            storage,
            bridge,
            calendar,
        }
    }

    pub fn events(&self) -> &EventRepository {
        &self.events
    }

    /// The actor that owns an event, for loop-driven transitions.
    pub fn owner_of(event: &Event) -> Actor {
        match event.created_by_role {
            ActorRole::Tenant => Actor::Tenant {
                id: event.tenant_id,
            },
            ActorRole::SubTenant => Actor::SubTenant {
                id: event.sub_tenant_id.unwrap_or_default(),
                tenant_id: event.tenant_id,
            },
        }
    }

    pub async fn create_event(&self, actor: Actor, draft: EventDraft) -> Result<Event, ApiError> {
        if draft.name.trim().is_empty() {
            return Err(EventError::MissingField("name").into());
        }
        Self::check_temperature(draft.temperature)?;
        if let Some(end_temperature) = draft.end_temperature {
            Self::check_temperature(end_temperature)?;
        }

        let now = self.calendar.now_utc();
        let prepared = self.prepare_draft(actor, &draft, now)?;

        let mut tx = self.storage.get_pool().begin().await?;

        let device = self
            .devices
            .find_by_id_in(draft.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;
        if !Self::owns_device(actor, &device) {
            return Err(EventError::DeviceNotOwned.into());
        }

        let overlapping = self
            .events
            .find_overlapping(
                device.id,
                prepared.event.start_time,
                prepared.event.end_time,
                &mut tx,
            )
            .await?;

        let mut preempted_active = false;
        let mut preempted_count = 0;
        match actor.role() {
            ActorRole::Tenant => {
                if overlapping
                    .iter()
                    .any(|other| other.created_by_role == ActorRole::Tenant)
                {
                    return Err(EventError::DuplicateTenantEvent.into());
                }

                // Tenant precedence: pause every outranked event in the
                // window before taking it over.
                for conflict in overlapping
                    .iter()
                    .filter(|other| actor.role().outranks(other.created_by_role))
                {
                    self.events.set_disabled(conflict.id, now, &mut tx).await?;
                    if conflict.status == EventStatus::Active {
                        preempted_active = true;
                    }
                    preempted_count += 1;
                }
            }
            ActorRole::SubTenant => {
                if overlapping
                    .iter()
                    .any(|other| other.created_by_role == ActorRole::Tenant)
                {
                    return Err(EventError::TenantPriorityConflict.into());
                }
                if overlapping
                    .iter()
                    .any(|other| other.created_by_role == ActorRole::SubTenant)
                {
                    return Err(EventError::DuplicateSubTenantEvent.into());
                }
            }
        }

        // The store is authoritative: a preempted active event leaves the
        // device off until something turns it back on.
        if preempted_active {
            self.devices
                .update_power(device.id, false, now, &mut tx)
                .await?;
        }

        // The dashboard reflects intent even before the event starts.
        self.devices
            .update_temperature(device.id, draft.temperature, now, &mut tx)
            .await?;
        if prepared.immediate_start {
            self.devices
                .update_power(device.id, true, now, &mut tx)
                .await?;
        }

        let id = self.events.create(&prepared.event, &mut tx).await?;
        tx.commit().await?;

        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or(EventError::NotFound)?;

        // Device commands only after the unit of work commits; failures are
        // logged, never unwound.
        if preempted_active {
            if let Err(e) = self.bridge.power(&device.serial_number, false).await {
                tracing::warn!(serial = %device.serial_number, "failed to power off preempted device: {}", e);
            }
        }
        if prepared.immediate_start {
            self.apply_settings(&device, &event).await;
        }

        self.bridge.broadcast(ObserverEvent::EventCreated {
            event_id: event.id,
            device_id: device.id,
            timestamp: now,
        });
        if prepared.immediate_start {
            self.bridge.broadcast(ObserverEvent::EventStarted {
                event_id: event.id,
                device_id: device.id,
                timestamp: now,
            });
        }

        self.log_activity(
            actor,
            "create",
            json!({
                "event_id": event.id,
                "device_id": device.id,
                "recurring": event.is_recurring,
                "preempted": preempted_count,
            }),
        )
        .await;

        Ok(event)
    }

    pub async fn start_event(&self, actor: Actor, event_id: i32) -> Result<Event, ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if event.is_template() {
            return Err(EventError::TemplateNotRunnable.into());
        }
        if event.is_disabled {
            return Err(EventError::EventDisabled.into());
        }
        match event.status {
            EventStatus::Active => return Err(EventError::AlreadyActive.into()),
            EventStatus::Completed | EventStatus::Cancelled | EventStatus::Stopped => {
                return Err(EventError::InvalidTerminalTransition.into());
            }
            EventStatus::Scheduled => {}
        }

        let device = self
            .devices
            .find_by_id_in(event.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        self.events.mark_active(event_id, now, &mut tx).await?;
        self.devices
            .update_power(device.id, true, now, &mut tx)
            .await?;
        self.devices
            .update_temperature(device.id, event.temperature, now, &mut tx)
            .await?;
        tx.commit().await?;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventError::NotFound)?;

        self.apply_settings(&device, &event).await;
        self.bridge.broadcast(ObserverEvent::EventStarted {
            event_id,
            device_id: device.id,
            timestamp: now,
        });
        self.log_activity(actor, "start", json!({ "event_id": event_id }))
            .await;

        Ok(event)
    }

    pub async fn stop_event(&self, actor: Actor, event_id: i32) -> Result<Event, ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if event.status != EventStatus::Active {
            return Err(EventError::NotActive.into());
        }

        let device = self
            .devices
            .find_by_id_in(event.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        self.events
            .mark_stopped(event_id, now, now + DELETE_GRACE, &mut tx)
            .await?;
        self.devices
            .update_power(device.id, false, now, &mut tx)
            .await?;
        tx.commit().await?;

        if let Err(e) = self.bridge.power(&device.serial_number, false).await {
            tracing::warn!(serial = %device.serial_number, "failed to power off device: {}", e);
        }
        if let Err(e) = self
            .bridge
            .send_event_status(&device.serial_number, "Event stopped")
            .await
        {
            tracing::debug!(serial = %device.serial_number, "failed to annotate device: {}", e);
        }

        self.bridge.broadcast(ObserverEvent::EventStopped {
            event_id,
            device_id: device.id,
            timestamp: now,
        });
        self.log_activity(actor, "stop", json!({ "event_id": event_id }))
            .await;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventError::NotFound)?;

        Ok(event)
    }

    pub async fn disable_event(&self, actor: Actor, event_id: i32) -> Result<Event, ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if event.is_disabled {
            return Err(EventError::AlreadyDisabled.into());
        }
        if !matches!(event.status, EventStatus::Active | EventStatus::Scheduled) {
            return Err(EventError::InvalidTerminalTransition.into());
        }

        let device = self
            .devices
            .find_by_id_in(event.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        self.events.set_disabled(event_id, now, &mut tx).await?;
        let was_active = event.status == EventStatus::Active;
        if was_active {
            self.devices
                .update_power(device.id, false, now, &mut tx)
                .await?;
        }
        tx.commit().await?;

        if was_active {
            if let Err(e) = self.bridge.power(&device.serial_number, false).await {
                tracing::warn!(serial = %device.serial_number, "failed to power off device: {}", e);
            }
        }

        self.log_activity(actor, "disable", json!({ "event_id": event_id }))
            .await;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventError::NotFound)?;

        Ok(event)
    }

    pub async fn enable_event(
        &self,
        actor: Actor,
        event_id: i32,
    ) -> Result<EnableOutcome, ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if !event.is_disabled {
            return Err(EventError::NotDisabled.into());
        }

        // The window closed while paused; the event cannot be resurrected.
        if now >= event.effective_deadline() {
            self.events
                .mark_completed(event_id, now, None, &mut tx)
                .await?;
            self.events.delete(event_id, &mut tx).await?;
            tx.commit().await?;

            self.bridge.broadcast(ObserverEvent::EventCompleted {
                event_id,
                device_id: event.device_id,
                timestamp: now,
            });
            self.bridge.broadcast(ObserverEvent::EventDeleted {
                event_id,
                device_id: event.device_id,
                timestamp: now,
            });
            self.log_activity(
                actor,
                "enable",
                json!({ "event_id": event_id, "expired": true }),
            )
            .await;

            return Ok(EnableOutcome::Expired);
        }

        let disabled_at = event.disabled_at.unwrap_or(now);
        let paused_ms = (now - disabled_at).whole_milliseconds() as i64;

        self.events
            .clear_disabled(
                event_id,
                event.end_time + time::Duration::milliseconds(paused_ms),
                event.total_disabled_duration + paused_ms,
                now,
                &mut tx,
            )
            .await?;

        let device = self
            .devices
            .find_by_id_in(event.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        let resume_active = event.status == EventStatus::Active;
        if resume_active {
            self.devices
                .update_power(device.id, true, now, &mut tx)
                .await?;
            self.devices
                .update_temperature(device.id, event.temperature, now, &mut tx)
                .await?;
        }
        tx.commit().await?;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventError::NotFound)?;

        if resume_active {
            self.apply_settings(&device, &event).await;
        }
        self.log_activity(
            actor,
            "enable",
            json!({ "event_id": event_id, "paused_ms": paused_ms }),
        )
        .await;

        Ok(EnableOutcome::Enabled(event))
    }

    pub async fn update_event(
        &self,
        actor: Actor,
        event_id: i32,
        changes: EventChanges,
    ) -> Result<Event, ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let mut event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if event.status == EventStatus::Active {
            return Err(EventError::CannotModifyActive.into());
        }
        if event.status.is_terminal() {
            return Err(EventError::InvalidTerminalTransition.into());
        }

        if let Some(name) = changes.name {
            if name.trim().is_empty() {
                return Err(EventError::MissingField("name").into());
            }
            event.name = name;
        }
        if let Some(temperature) = changes.temperature {
            Self::check_temperature(temperature)?;
            event.temperature = temperature;
        }
        if let Some(end_temperature) = changes.end_temperature {
            Self::check_temperature(end_temperature)?;
            event.end_temperature = Some(end_temperature);
        }
        if let Some(start_time) = changes.start_time {
            event.start_time = start_time.to_offset(UtcOffset::UTC);
        }
        if let Some(end_time) = changes.end_time {
            event.end_time = end_time.to_offset(UtcOffset::UTC);
        }
        if event.end_time <= event.start_time {
            return Err(EventError::InvalidInterval.into());
        }

        event.updated_at = now;
        self.events.update(event_id, &event, &mut tx).await?;
        tx.commit().await?;

        self.log_activity(actor, "update", json!({ "event_id": event_id }))
            .await;

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(EventError::NotFound)?;

        Ok(event)
    }

    pub async fn delete_event(&self, actor: Actor, event_id: i32) -> Result<(), ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let event = self
            .events
            .find_by_id_in(event_id, &mut tx)
            .await?
            .ok_or(EventError::NotFound)?;
        Self::check_scope(actor, &event)?;

        if event.status == EventStatus::Active {
            return Err(EventError::CannotModifyActive.into());
        }

        self.events.delete(event_id, &mut tx).await?;
        tx.commit().await?;

        self.bridge.broadcast(ObserverEvent::EventDeleted {
            event_id,
            device_id: event.device_id,
            timestamp: now,
        });
        self.log_activity(actor, "delete", json!({ "event_id": event_id }))
            .await;

        Ok(())
    }

    /// End-phase transition. Re-reads the row and quietly skips when the
    /// store no longer agrees the event should complete.
    pub async fn complete_event(&self, event_id: i32) -> Result<(), ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let Some(event) = self.events.find_by_id_in(event_id, &mut tx).await? else {
            return Ok(());
        };
        if event.status != EventStatus::Active || event.is_disabled {
            return Ok(());
        }

        let device = self
            .devices
            .find_by_id_in(event.device_id, &mut tx)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        self.events
            .mark_completed(event_id, now, Some(now + DELETE_GRACE), &mut tx)
            .await?;
        self.devices
            .update_power(device.id, false, now, &mut tx)
            .await?;
        if let Some(end_temperature) = event.end_temperature {
            self.devices
                .update_temperature(device.id, end_temperature, now, &mut tx)
                .await?;
        }
        tx.commit().await?;

        if let Err(e) = self.bridge.power(&device.serial_number, false).await {
            tracing::warn!(serial = %device.serial_number, "failed to power off device: {}", e);
        }
        if let Some(end_temperature) = event.end_temperature {
            if let Err(e) = self
                .bridge
                .set_temperature(&device.serial_number, end_temperature)
                .await
            {
                tracing::debug!(serial = %device.serial_number, "failed to apply end temperature: {}", e);
            }
        }
        if let Err(e) = self
            .bridge
            .send_event_status(&device.serial_number, "Event completed")
            .await
        {
            tracing::debug!(serial = %device.serial_number, "failed to annotate device: {}", e);
        }

        self.bridge.broadcast(ObserverEvent::EventCompleted {
            event_id,
            device_id: device.id,
            timestamp: now,
        });
        self.log_activity(
            Self::owner_of(&event),
            "complete",
            json!({ "event_id": event_id }),
        )
        .await;

        Ok(())
    }

    /// A disabled event whose pre-extension deadline passed is completed and
    /// removed at once; it cannot be resurrected past its original window.
    pub async fn force_complete_disabled(&self, event_id: i32) -> Result<(), ApiError> {
        let now = self.calendar.now_utc();
        let mut tx = self.storage.get_pool().begin().await?;

        let Some(event) = self.events.find_by_id_in(event_id, &mut tx).await? else {
            return Ok(());
        };
        if !event.is_disabled || now < event.effective_deadline() {
            return Ok(());
        }

        self.events
            .mark_completed(event_id, now, None, &mut tx)
            .await?;
        self.events.delete(event_id, &mut tx).await?;
        tx.commit().await?;

        self.bridge.broadcast(ObserverEvent::EventCompleted {
            event_id,
            device_id: event.device_id,
            timestamp: now,
        });
        self.bridge.broadcast(ObserverEvent::EventDeleted {
            event_id,
            device_id: event.device_id,
            timestamp: now,
        });
        self.log_activity(
            Self::owner_of(&event),
            "complete",
            json!({ "event_id": event_id, "forced": true }),
        )
        .await;

        Ok(())
    }

    /// Turn the device on and push the event's settings. Never fails: a
    /// hardware communication problem must not unwind the committed state.
    async fn apply_settings(&self, device: &Device, event: &Event) {
        if let Err(e) = self
            .bridge
            .start_temperature_sync(&device.serial_number, event.temperature)
            .await
        {
            tracing::warn!(serial = %device.serial_number, "temperature sync failed: {}", e);
        }

        if event.power_on {
            if let Err(e) = self.bridge.power(&device.serial_number, true).await {
                tracing::warn!(serial = %device.serial_number, "power on failed: {}", e);
            }
        }

        let annotation = format!(
            "Event '{}' running until {}",
            event.name,
            self.calendar.format_local(event.end_time)
        );
        if let Err(e) = self
            .bridge
            .send_event_status(&device.serial_number, &annotation)
            .await
        {
            tracing::debug!(serial = %device.serial_number, "failed to annotate device: {}", e);
        }
    }

    fn prepare_draft(
        &self,
        actor: Actor,
        draft: &EventDraft,
        now: OffsetDateTime,
    ) -> Result<PreparedEvent, EventError> {
        let (event, immediate_start) = if let Some(recurrence) = &draft.recurrence {
            if recurrence.days_of_week.is_empty()
                || recurrence.days_of_week.iter().any(|day| *day > 6)
            {
                return Err(EventError::InvalidRecurrence);
            }
            if recurrence.end_date < recurrence.start_date {
                return Err(EventError::InvalidRecurrence);
            }

            let time_start = CalendarService::parse_time_of_day(&recurrence.time_start)?;
            let time_end = CalendarService::parse_time_of_day(&recurrence.time_end)?;
            if time_end <= time_start {
                return Err(EventError::InvalidInterval);
            }

            let first = CalendarService::first_occurrence(
                recurrence.start_date,
                &recurrence.days_of_week,
                recurrence.end_date,
            )
            .ok_or(EventError::NoValidOccurrence)?;

            let event = Event {
                start_time: self.calendar.local_date_time_to_utc(first, time_start),
                end_time: self.calendar.local_date_time_to_utc(first, time_end),
                status: EventStatus::Scheduled,
                is_recurring: true,
                recurring_type: Some("weekly".to_string()),
                days_of_week: Some(json!(recurrence.days_of_week)),
                recurring_start_date: Some(recurrence.start_date),
                recurring_end_date: Some(recurrence.end_date),
                time_start: Some(time_start),
                time_end: Some(time_end),
                started_at: None,
                ..Self::base_event(actor, draft, now)
            };

            // Templates are materialized by the instantiator, never run.
            (event, false)
        } else {
            let start_time = draft
                .start_time
                .ok_or(EventError::MissingField("start_time"))?
                .to_offset(UtcOffset::UTC);
            let end_time = draft
                .end_time
                .ok_or(EventError::MissingField("end_time"))?
                .to_offset(UtcOffset::UTC);
            if end_time <= start_time {
                return Err(EventError::InvalidInterval);
            }

            // One-off events go active at creation; the device comes on now.
            let event = Event {
                start_time,
                end_time,
                status: EventStatus::Active,
                started_at: Some(now),
                ..Self::base_event(actor, draft, now)
            };

            (event, true)
        };

        Ok(PreparedEvent {
            event,
            immediate_start,
        })
    }

    fn base_event(actor: Actor, draft: &EventDraft, now: OffsetDateTime) -> Event {
        Event {
            id: 0,
            name: draft.name.clone(),
            event_type: "device".to_string(),
            created_by_role: actor.role(),
            tenant_id: actor.tenant_id(),
            sub_tenant_id: actor.sub_tenant_id(),
            device_id: draft.device_id,
            start_time: now,
            end_time: now,
            original_end_time: None,
            temperature: draft.temperature,
            end_temperature: draft.end_temperature,
            power_on: draft.power_on,
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
            updated_at: now,
        }
    }

    fn check_temperature(temperature: i32) -> Result<(), EventError> {
        if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            Ok(())
        } else {
            Err(EventError::TemperatureOutOfRange)
        }
    }

    /// Cross-tenancy access is indistinguishable from a missing event.
    fn check_scope(actor: Actor, event: &Event) -> Result<(), EventError> {
        let owned = match actor {
            Actor::Tenant { id } => event.tenant_id == id,
            Actor::SubTenant { id, tenant_id } => {
                event.tenant_id == tenant_id && event.sub_tenant_id == Some(id)
            }
        };

        if owned { Ok(()) } else { Err(EventError::NotFound) }
    }

    fn owns_device(actor: Actor, device: &Device) -> bool {
        match actor {
            Actor::Tenant { id } => device.tenant_id == id,
            Actor::SubTenant { id, tenant_id } => {
                device.tenant_id == tenant_id && device.sub_tenant_id == Some(id)
            }
        }
    }

    async fn log_activity(&self, actor: Actor, action: &str, detail: serde_json::Value) {
        if let Err(e) = self
            .activity
            .append(actor.role(), actor.actor_id(), action, detail)
            .await
        {
            tracing::warn!(action, "failed to append activity log: {}", e);
        }
    }
}
