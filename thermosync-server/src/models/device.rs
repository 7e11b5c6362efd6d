use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// Persisted device record. The store is the source of truth for power and
/// temperature; hardware state is reconciled towards it on every connect.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: i32,
    pub serial_number: String,
    pub name: String,
    pub tenant_id: i32,
    pub sub_tenant_id: Option<i32>,
    pub is_on: bool,
    pub temperature: i32,
    pub is_locked: bool,
    pub room_temperature: Option<i32>,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct DeviceTable;

impl Table for DeviceTable {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                serial_number VARCHAR(64) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                tenant_id INTEGER NOT NULL,
                sub_tenant_id INTEGER,
                is_on BOOLEAN NOT NULL DEFAULT FALSE,
                temperature INTEGER NOT NULL DEFAULT 22,
                is_locked BOOLEAN NOT NULL DEFAULT FALSE,
                room_temperature INTEGER,
                updated_at TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS devices;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
