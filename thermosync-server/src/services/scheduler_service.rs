use std::sync::Arc;
use std::time::Duration;

use thermosync_api::ObserverEvent;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::errors::ApiError;
use crate::repositories::EventRepository;
use crate::services::bridge_service::DeviceBridge;
use crate::services::calendar_service::CalendarService;
use crate::services::event_service::EventService;
use crate::services::recurring_service::RecurringService;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Trailing tolerance so small scheduler jitter never fires an event early.
const START_WINDOW: time::Duration = time::Duration::seconds(5);

/// How long a terminal row may outlive its last modification before the
/// safety-net sweep removes it.
const CLEANUP_GRACE: time::Duration = time::Duration::seconds(5);

/// Single-flight periodic driver for the event lifecycle. A tick that finds
/// the previous one still running skips entirely rather than queueing.
pub struct SchedulerService {
    events: EventRepository,
    service: Arc<EventService>,
    recurring: RecurringService,
    bridge: Arc<DeviceBridge>,
    calendar: CalendarService,
    tick_guard: Arc<Semaphore>,
}

impl SchedulerService {
    pub fn new(
        events: EventRepository,
        service: Arc<EventService>,
        recurring: RecurringService,
        bridge: Arc<DeviceBridge>,
        calendar: CalendarService,
    ) -> Self {
        Self {
            events,
            service,
            recurring,
            bridge,
            calendar,
            tick_guard: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!("scheduler loop started");

            loop {
                interval.tick().await;

                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler.try_tick().await;
                });
            }
        })
    }

    /// Run one tick unless the previous one is still in flight. The permit
    /// is released on every exit path, including panics in a phase.
    pub async fn try_tick(&self) -> bool {
        let Ok(_permit) = self.tick_guard.try_acquire() else {
            tracing::debug!("previous tick still running, skipping");
            return false;
        };

        if let Err(e) = self.tick().await {
            tracing::error!("scheduler tick failed: {}", e);
        }

        true
    }

    async fn tick(&self) -> Result<(), ApiError> {
        let now = self.calendar.now_utc();

        self.run_start_phase(now).await?;
        self.run_end_phase(now).await?;
        self.run_cleanup_phase(now).await?;

        if self.calendar.local_now().second() == 0 {
            self.run_minute_phase(now).await;
        }

        Ok(())
    }

    /// Start every scheduled event whose start time fell inside the trailing
    /// window. The store is re-queried; nothing is cached across phases.
    pub async fn run_start_phase(&self, now: OffsetDateTime) -> Result<(), ApiError> {
        let due = self.events.find_due_to_start(now - START_WINDOW, now).await?;

        for event in due {
            let actor = EventService::owner_of(&event);
            if let Err(e) = self.service.start_event(actor, event.id).await {
                tracing::warn!(event_id = event.id, "loop failed to start event: {}", e);
            }
        }

        Ok(())
    }

    /// Complete active events past their end, then force out disabled events
    /// whose pre-extension deadline has passed.
    pub async fn run_end_phase(&self, now: OffsetDateTime) -> Result<(), ApiError> {
        let ended = self.events.find_due_to_end(now).await?;
        for event in ended {
            if let Err(e) = self.service.complete_event(event.id).await {
                tracing::warn!(event_id = event.id, "loop failed to complete event: {}", e);
            }
        }

        let expired = self.events.find_disabled_expired(now).await?;
        for event in expired {
            if let Err(e) = self.service.force_complete_disabled(event.id).await {
                tracing::warn!(
                    event_id = event.id,
                    "loop failed to expire disabled event: {}",
                    e
                );
            }
        }

        Ok(())
    }

    /// Sweep rows whose durable deletion deadline passed, plus the safety
    /// net for rows orphaned by a restart that lost nothing but time.
    pub async fn run_cleanup_phase(&self, now: OffsetDateTime) -> Result<(), ApiError> {
        let deletable = self.events.find_deletable(now).await?;
        self.delete_swept(deletable, now).await?;

        let stale = self.events.find_stale(now, now - CLEANUP_GRACE).await?;
        self.delete_swept(stale, now).await?;

        Ok(())
    }

    /// Once a minute: materialize recurring instances for today and clear
    /// any stray completed rows.
    pub async fn run_minute_phase(&self, now: OffsetDateTime) {
        if let Err(e) = self.recurring.materialize_today().await {
            tracing::error!("recurring materialization failed: {}", e);
        }

        match self.events.find_stray_completed().await {
            Ok(stray) => {
                if let Err(e) = self.delete_swept(stray, now).await {
                    tracing::error!("completed-event sweep failed: {}", e);
                }
            }
            Err(e) => tracing::error!("completed-event sweep query failed: {}", e),
        }
    }

    async fn delete_swept(
        &self,
        events: Vec<crate::models::Event>,
        now: OffsetDateTime,
    ) -> Result<(), ApiError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.events.get_pool().begin().await?;
        for event in &events {
            self.events.delete(event.id, &mut tx).await?;
        }
        tx.commit().await?;

        for event in &events {
            self.bridge.broadcast(ObserverEvent::EventDeleted {
                event_id: event.id,
                device_id: event.device_id,
                timestamp: now,
            });
        }

        tracing::debug!(count = events.len(), "swept terminal events");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::models::EventStatus;
    use crate::test_support::*;

    use super::*;

    async fn scheduler_fixture(serial: &str) -> (Arc<SchedulerService>, EventRepository, i32) {
        let storage = setup_test_db().await;
        let device_id = seed_device(&storage, serial).await;

        let calendar = test_calendar();
        let bridge = Arc::new(DeviceBridge::new(storage.clone()));
        let service = Arc::new(EventService::new(
            storage.clone(),
            bridge.clone(),
            calendar,
        ));
        let events = EventRepository::new(storage.clone());
        let recurring = RecurringService::new(storage.clone(), calendar);
        let scheduler = Arc::new(SchedulerService::new(
            events.clone(),
            service,
            recurring,
            bridge,
            calendar,
        ));

        (scheduler, events, device_id)
    }

    #[tokio::test]
    async fn tick_is_skipped_while_previous_tick_holds_the_guard() {
        let (scheduler, events, device_id) = scheduler_fixture("AC-300").await;

        let now = now_utc();
        let due = test_event(device_id, now - Duration::seconds(1), now + Duration::hours(1));
        let mut tx = events.get_pool().begin().await.unwrap();
        let id = events.create(&due, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        // Simulate an in-flight tick by holding the single permit.
        let permit = scheduler.tick_guard.clone().try_acquire_owned().unwrap();

        assert!(!scheduler.try_tick().await);

        // The due event was not touched.
        let untouched = events.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(untouched.status, EventStatus::Scheduled);

        drop(permit);

        assert!(scheduler.try_tick().await);
        let started = events.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(started.status, EventStatus::Active);
    }

    #[tokio::test]
    async fn guard_is_released_between_ticks() {
        let (scheduler, _events, _device_id) = scheduler_fixture("AC-301").await;

        assert!(scheduler.try_tick().await);
        // The permit must be available again for the next tick.
        assert!(scheduler.try_tick().await);
    }
}
