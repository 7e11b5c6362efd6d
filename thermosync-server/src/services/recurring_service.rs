use std::sync::Arc;

use time::Date;

use crate::configs::Storage;
use crate::errors::ApiError;
use crate::models::{Event, EventStatus};
use crate::repositories::EventRepository;
use crate::services::calendar_service::CalendarService;

/// Materializes concrete per-day instances from weekly recurring templates.
pub struct RecurringService {
    storage: Arc<Storage>,
    events: EventRepository,
    calendar: CalendarService,
}

impl RecurringService {
    pub fn new(storage: Arc<Storage>, calendar: CalendarService) -> Self {
        Self {
            events: EventRepository::new(storage.clone()),
            storage,
            calendar,
        }
    }

    /// Create today's instance for every eligible template. Per-template
    /// failures are logged and never abort the batch.
    pub async fn materialize_today(&self) -> Result<u32, ApiError> {
        let templates = self.events.find_templates().await?;
        let today = self.calendar.local_now().date();

        let mut created = 0;
        for template in &templates {
            match self.materialize_template(template, today).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        template_id = template.id,
                        "failed to materialize recurring instance: {}",
                        e
                    );
                }
            }
        }

        if created > 0 {
            tracing::info!(created, "materialized recurring instances");
        }

        Ok(created)
    }

    async fn materialize_template(&self, template: &Event, today: Date) -> Result<bool, ApiError> {
        let (Some(range_start), Some(range_end)) =
            (template.recurring_start_date, template.recurring_end_date)
        else {
            tracing::warn!(template_id = template.id, "template is missing its date range");
            return Ok(false);
        };
        if today < range_start || today > range_end {
            return Ok(false);
        }

        if !template
            .days_of_week()
            .contains(&CalendarService::weekday_index(today))
        {
            return Ok(false);
        }

        let (day_start, day_end) = self.calendar.local_day_bounds(today);
        if self
            .events
            .find_instance_in_window(template.id, day_start, day_end)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let (Some(time_start), Some(time_end)) = (template.time_start, template.time_end) else {
            tracing::warn!(template_id = template.id, "template is missing its time window");
            return Ok(false);
        };

        let now = self.calendar.now_utc();
        let instance = Event {
            id: 0,
            start_time: self.calendar.local_date_time_to_utc(today, time_start),
            end_time: self.calendar.local_date_time_to_utc(today, time_end),
            status: EventStatus::Scheduled,
            is_recurring: false,
            recurring_type: None,
            days_of_week: None,
            recurring_start_date: None,
            recurring_end_date: None,
            time_start: None,
            time_end: None,
            parent_recurring_event_id: Some(template.id),
            original_end_time: None,
            is_disabled: false,
            disabled_at: None,
            total_disabled_duration: 0,
            started_at: None,
            stopped_at: None,
            completed_at: None,
            delete_after: None,
            updated_at: now,
            ..template.clone()
        };

        let mut tx = self.storage.get_pool().begin().await?;
        let id = self.events.create(&instance, &mut tx).await?;
        tx.commit().await?;

        tracing::debug!(template_id = template.id, instance_id = id, "materialized instance");

        Ok(true)
    }
}
