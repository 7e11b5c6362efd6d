use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::{ActorRole, Table};

/// Append-only record of a lifecycle action, written best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: i32,
    pub actor_role: ActorRole,
    pub actor_id: i32,
    pub action: String,
    pub detail: Value,
    pub time: OffsetDateTime,
}

#[derive(Clone)]
pub struct ActivityLogTable;

impl Table for ActivityLogTable {
    fn name(&self) -> &'static str {
        "activity_logs"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS activity_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor_role VARCHAR(32) NOT NULL,
                actor_id INTEGER NOT NULL,
                action VARCHAR(64) NOT NULL,
                detail JSON NOT NULL DEFAULT '{}',
                time TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS activity_logs;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
