use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Device;

#[derive(Clone)]
pub struct DeviceRepository {
    storage: Arc<Storage>,
}

impl DeviceRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl DeviceRepository {
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(device)
    }

    pub async fn find_by_id_in(
        &self,
        id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_all(&mut **transaction)
            .await?
            .into_iter()
            .next();

        Ok(device)
    }

    pub async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Device>, Error> {
        let device: Option<Device> =
            sqlx::query_as("SELECT * FROM devices WHERE serial_number = $1")
                .bind(serial_number)
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(device)
    }

    pub async fn find_all(&self) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = sqlx::query_as("SELECT * FROM devices ORDER BY name")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(devices)
    }

    pub async fn update_power(
        &self,
        id: i32,
        is_on: bool,
        updated_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET is_on = $1, updated_at = $2 WHERE id = $3")
            .bind(is_on)
            .bind(updated_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    pub async fn update_temperature(
        &self,
        id: i32,
        temperature: i32,
        updated_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET temperature = $1, updated_at = $2 WHERE id = $3")
            .bind(temperature)
            .bind(updated_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    /// Telemetry persistence paths: single-row writes straight on the pool.
    pub async fn persist_power(&self, serial_number: &str, is_on: bool) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET is_on = $1, updated_at = $2 WHERE serial_number = $3")
            .bind(is_on)
            .bind(OffsetDateTime::now_utc())
            .bind(serial_number)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn persist_temperature(
        &self,
        serial_number: &str,
        temperature: i32,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET temperature = $1, updated_at = $2 WHERE serial_number = $3")
            .bind(temperature)
            .bind(OffsetDateTime::now_utc())
            .bind(serial_number)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn persist_lock(&self, serial_number: &str, is_locked: bool) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET is_locked = $1, updated_at = $2 WHERE serial_number = $3")
            .bind(is_locked)
            .bind(OffsetDateTime::now_utc())
            .bind(serial_number)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn persist_room_temperature(
        &self,
        serial_number: &str,
        room_temperature: i32,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE devices SET room_temperature = $1, updated_at = $2 WHERE serial_number = $3",
        )
        .bind(room_temperature)
        .bind(OffsetDateTime::now_utc())
        .bind(serial_number)
        .execute(self.storage.get_pool())
        .await?;

        Ok(())
    }
}
