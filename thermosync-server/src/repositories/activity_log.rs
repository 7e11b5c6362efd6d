use std::sync::Arc;

use serde_json::Value;
use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::ActorRole;

/// Append-only sink for lifecycle actions. Callers treat writes as
/// best-effort and must not fail their own operation on an error here.
#[derive(Clone)]
pub struct ActivityLogRepository {
    storage: Arc<Storage>,
}

impl ActivityLogRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn append(
        &self,
        actor_role: ActorRole,
        actor_id: i32,
        action: &str,
        detail: Value,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (actor_role, actor_id, action, detail, time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_role)
        .bind(actor_id)
        .bind(action)
        .bind(detail)
        .bind(OffsetDateTime::now_utc())
        .execute(self.storage.get_pool())
        .await?;

        Ok(())
    }
}
