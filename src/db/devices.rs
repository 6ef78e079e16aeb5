use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::device::{EcgDevice, RegisterDeviceRequest};

/// The subset of device state the validator needs: internal id and the
/// patient the device was bound to at provisioning time.
#[derive(Debug, FromRow)]
pub struct DeviceBinding {
    pub id: Uuid,
    pub patient_id: String,
}

/// Resolve an external device id to its binding. Inactive and unknown
/// devices both resolve to `None`.
pub async fn find_active_device(
    pool: &PgPool,
    device_id: &str,
) -> Result<Option<DeviceBinding>, sqlx::Error> {
    sqlx::query_as::<_, DeviceBinding>(
        "SELECT id, patient_id FROM ecg_devices WHERE device_id = $1 AND is_active = TRUE",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await
}

/// Update last-sync and battery telemetry after a successful ingestion.
/// Best-effort at the call site: a failure here never fails the request.
pub async fn touch_device(
    pool: &PgPool,
    id: Uuid,
    sync_time: DateTime<Utc>,
    battery_level: Option<i32>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE ecg_devices SET last_sync = $2, battery_level = COALESCE($3, battery_level) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(sync_time)
    .bind(battery_level)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_device(
    pool: &PgPool,
    request: &RegisterDeviceRequest,
) -> Result<EcgDevice, sqlx::Error> {
    sqlx::query_as::<_, EcgDevice>(
        "INSERT INTO ecg_devices (device_id, device_name, patient_id) \
         VALUES ($1, $2, $3) \
         RETURNING id, device_id, device_name, patient_id, is_active, last_sync, \
                   battery_level, created_at",
    )
    .bind(&request.device_id)
    .bind(&request.device_name)
    .bind(&request.patient_id)
    .fetch_one(pool)
    .await
}

/// Returns false if no such device exists. Already-inactive devices are a
/// no-op success.
pub async fn deactivate_device(pool: &PgPool, device_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE ecg_devices SET is_active = FALSE WHERE device_id = $1")
        .bind(device_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_devices_for_patient(
    pool: &PgPool,
    patient_id: &str,
) -> Result<Vec<EcgDevice>, sqlx::Error> {
    sqlx::query_as::<_, EcgDevice>(
        "SELECT id, device_id, device_name, patient_id, is_active, last_sync, \
                battery_level, created_at \
         FROM ecg_devices WHERE patient_id = $1 ORDER BY created_at",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await
}

pub async fn patient_has_active_device(
    pool: &PgPool,
    patient_id: &str,
) -> Result<bool, sqlx::Error> {
    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM ecg_devices WHERE patient_id = $1 AND is_active = TRUE)",
    )
    .bind(patient_id)
    .fetch_one(pool)
    .await?;
    Ok(exists.0)
}
