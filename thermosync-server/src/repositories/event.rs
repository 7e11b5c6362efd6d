use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Event;

#[derive(Clone)]
pub struct EventRepository {
    storage: Arc<Storage>,
}

impl EventRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl EventRepository {
    pub async fn create(
        &self,
        item: &Event,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO events (
                name, event_type, created_by_role, tenant_id, sub_tenant_id, device_id,
                start_time, end_time, original_end_time, temperature, end_temperature,
                power_on, status, is_disabled, disabled_at, total_disabled_duration,
                is_recurring, recurring_type, days_of_week, recurring_start_date,
                recurring_end_date, time_start, time_end, parent_recurring_event_id,
                started_at, stopped_at, completed_at, delete_after, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            "#,
        )
        .bind(&item.name)
        .bind(&item.event_type)
        .bind(item.created_by_role)
        .bind(item.tenant_id)
        .bind(item.sub_tenant_id)
        .bind(item.device_id)
        .bind(item.start_time)
        .bind(item.end_time)
        .bind(item.original_end_time)
        .bind(item.temperature)
        .bind(item.end_temperature)
        .bind(item.power_on)
        .bind(item.status)
        .bind(item.is_disabled)
        .bind(item.disabled_at)
        .bind(item.total_disabled_duration)
        .bind(item.is_recurring)
        .bind(&item.recurring_type)
        .bind(&item.days_of_week)
        .bind(item.recurring_start_date)
        .bind(item.recurring_end_date)
        .bind(item.time_start)
        .bind(item.time_end)
        .bind(item.parent_recurring_event_id)
        .bind(item.started_at)
        .bind(item.stopped_at)
        .bind(item.completed_at)
        .bind(item.delete_after)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Event>, Error> {
        let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(event)
    }

    /// Same lookup inside an open transaction, for read-then-write flows.
    pub async fn find_by_id_in(
        &self,
        id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Option<Event>, Error> {
        let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_all(&mut **transaction)
            .await?
            .into_iter()
            .next();

        Ok(event)
    }

    pub async fn find_by_device(&self, device_id: i32) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> =
            sqlx::query_as("SELECT * FROM events WHERE device_id = $1 ORDER BY start_time")
                .bind(device_id)
                .fetch_all(self.storage.get_pool())
                .await?;

        Ok(events)
    }

    /// Non-disabled scheduled/active events on a device whose half-open
    /// window intersects `[start, end)`.
    pub async fn find_overlapping(
        &self,
        device_id: i32,
        start: OffsetDateTime,
        end: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE device_id = $1
              AND is_disabled = FALSE
              AND status IN ('scheduled', 'active')
              AND start_time < $2
              AND end_time > $3
            "#,
        )
        .bind(device_id)
        .bind(end)
        .bind(start)
        .fetch_all(&mut **transaction)
        .await?;

        Ok(events)
    }

    /// Scheduled, non-disabled, non-template events whose start time falls in
    /// the trailing window `(window_start, now]`.
    pub async fn find_due_to_start(
        &self,
        window_start: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE status = 'scheduled'
              AND is_disabled = FALSE
              AND NOT (is_recurring = TRUE AND parent_recurring_event_id IS NULL)
              AND start_time > $1
              AND start_time <= $2
            "#,
        )
        .bind(window_start)
        .bind(now)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    pub async fn find_due_to_end(&self, now: OffsetDateTime) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE status = 'active'
              AND is_disabled = FALSE
              AND end_time <= $1
            "#,
        )
        .bind(now)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    /// Disabled events whose pre-extension deadline has passed. Templates are
    /// excluded; they are never run or force-completed by the loop.
    pub async fn find_disabled_expired(&self, now: OffsetDateTime) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE is_disabled = TRUE
              AND NOT (is_recurring = TRUE AND parent_recurring_event_id IS NULL)
              AND COALESCE(original_end_time, end_time) <= $1
            "#,
        )
        .bind(now)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    /// Events whose durable deferred-deletion deadline has passed.
    pub async fn find_deletable(&self, now: OffsetDateTime) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            "SELECT * FROM events WHERE delete_after IS NOT NULL AND delete_after <= $1",
        )
        .bind(now)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    /// Safety-net sweep candidates: rows stuck in scheduled/active past their
    /// end, or completed rows that never got a deletion deadline. Templates
    /// excluded.
    pub async fn find_stale(
        &self,
        now: OffsetDateTime,
        modified_before: OffsetDateTime,
    ) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE NOT (is_recurring = TRUE AND parent_recurring_event_id IS NULL)
              AND updated_at < $1
              AND (
                  (status IN ('scheduled', 'active') AND end_time <= $2)
                  OR status = 'completed'
              )
            "#,
        )
        .bind(modified_before)
        .bind(now)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    /// Completed rows, regardless of deadline. Used by the once-per-minute
    /// sweep for instances orphaned by a crash between transition and delete.
    pub async fn find_stray_completed(&self) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as("SELECT * FROM events WHERE status = 'completed'")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(events)
    }

    /// Enabled recurring templates eligible for materialization.
    pub async fn find_templates(&self) -> Result<Vec<Event>, Error> {
        let events: Vec<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE is_recurring = TRUE
              AND parent_recurring_event_id IS NULL
              AND is_disabled = FALSE
              AND status IN ('scheduled', 'active')
            "#,
        )
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(events)
    }

    pub async fn find_instance_in_window(
        &self,
        template_id: i32,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Option<Event>, Error> {
        let event: Option<Event> = sqlx::query_as(
            r#"
            SELECT * FROM events
            WHERE parent_recurring_event_id = $1
              AND start_time >= $2
              AND start_time < $3
            "#,
        )
        .bind(template_id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(event)
    }

    pub async fn update(
        &self,
        id: i32,
        item: &Event,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET name = $1, start_time = $2, end_time = $3, temperature = $4,
                end_temperature = $5, power_on = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(&item.name)
        .bind(item.start_time)
        .bind(item.end_time)
        .bind(item.temperature)
        .bind(item.end_temperature)
        .bind(item.power_on)
        .bind(item.updated_at)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn mark_active(
        &self,
        id: i32,
        started_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET status = 'active', started_at = $1, updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(started_at)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn mark_stopped(
        &self,
        id: i32,
        stopped_at: OffsetDateTime,
        delete_after: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET status = 'stopped', stopped_at = $1, delete_after = $2, updated_at = $1
            WHERE id = $3
            "#,
        )
        .bind(stopped_at)
        .bind(delete_after)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn mark_completed(
        &self,
        id: i32,
        completed_at: OffsetDateTime,
        delete_after: Option<OffsetDateTime>,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET status = 'completed', completed_at = $1, delete_after = $2, updated_at = $1
            WHERE id = $3
            "#,
        )
        .bind(completed_at)
        .bind(delete_after)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn set_disabled(
        &self,
        id: i32,
        disabled_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET is_disabled = TRUE,
                disabled_at = $1,
                original_end_time = COALESCE(original_end_time, end_time),
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(disabled_at)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn clear_disabled(
        &self,
        id: i32,
        new_end_time: OffsetDateTime,
        total_disabled_duration: i64,
        enabled_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET is_disabled = FALSE,
                disabled_at = NULL,
                end_time = $1,
                total_disabled_duration = $2,
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(new_end_time)
        .bind(total_disabled_duration)
        .bind(enabled_at)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn delete(
        &self,
        id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::test_support::*;

    use super::*;

    #[tokio::test]
    async fn overlap_query_uses_half_open_interval() {
        let storage = setup_test_db().await;
        let device_id = seed_device(&storage, "AC-100").await;
        let repo = EventRepository::new(storage.clone());

        let start = now_utc();
        let end = start + Duration::hours(1);

        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.create(&test_event(device_id, start, end), &mut tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Touching windows do not overlap.
        let mut tx = storage.get_pool().begin().await.unwrap();
        let found = repo
            .find_overlapping(device_id, end, end + Duration::hours(1), &mut tx)
            .await
            .unwrap();
        assert!(found.is_empty());

        // Intersecting windows do.
        let found = repo
            .find_overlapping(
                device_id,
                end - Duration::minutes(1),
                end + Duration::hours(1),
                &mut tx,
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn due_to_start_honors_trailing_window_and_skips_templates() {
        let storage = setup_test_db().await;
        let device_id = seed_device(&storage, "AC-101").await;
        let repo = EventRepository::new(storage.clone());

        let now = now_utc();

        let due = test_event(device_id, now - Duration::seconds(2), now + Duration::hours(1));
        let early = test_event(device_id, now + Duration::seconds(30), now + Duration::hours(1));
        let mut template = test_event(device_id, now - Duration::seconds(2), now + Duration::hours(1));
        template.is_recurring = true;

        let mut tx = storage.get_pool().begin().await.unwrap();
        let due_id = repo.create(&due, &mut tx).await.unwrap();
        repo.create(&early, &mut tx).await.unwrap();
        repo.create(&template, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let found = repo
            .find_due_to_start(now - Duration::seconds(5), now)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due_id);
    }

    #[tokio::test]
    async fn disabled_expired_uses_original_end_time() {
        let storage = setup_test_db().await;
        let device_id = seed_device(&storage, "AC-102").await;
        let repo = EventRepository::new(storage.clone());

        let now = now_utc();
        // Extended past now, but the pre-extension deadline already passed.
        let mut event = test_event(device_id, now - Duration::hours(2), now + Duration::hours(1));
        event.is_disabled = true;
        event.disabled_at = Some(now - Duration::hours(1));
        event.original_end_time = Some(now - Duration::minutes(5));

        let mut tx = storage.get_pool().begin().await.unwrap();
        let id = repo.create(&event, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let found = repo.find_disabled_expired(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }
}
