use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::devices::find_active_device;
use crate::errors::IngestError;
use crate::models::reading::EcgSampleRequest;

/// A sample that passed field and device-binding checks.
///
/// Carries the *device's* bound patient id, not the caller-supplied one, so
/// nothing downstream can be confused about stream ownership.
#[derive(Debug)]
pub struct ValidSample {
    pub device_uuid: Uuid,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: i32,
    pub ecg_data: serde_json::Value,
    pub signal_quality: i32,
    pub battery_level: Option<i32>,
    pub temperature: Option<f32>,
    pub activity_level: Option<serde_json::Value>,
}

/// The four fields every sample must carry, extracted or rejected by name.
struct RequiredFields {
    device_id: String,
    patient_id: String,
    heart_rate: i32,
    ecg_data: serde_json::Value,
}

fn require_fields(raw: &EcgSampleRequest) -> Result<RequiredFields, IngestError> {
    let device_id = raw
        .device_id
        .clone()
        .ok_or(IngestError::MissingField("device_id"))?;
    let patient_id = raw
        .patient_id
        .clone()
        .ok_or(IngestError::MissingField("patient_id"))?;
    let heart_rate = raw.heart_rate.ok_or(IngestError::MissingField("heart_rate"))?;
    // ecg_data may be an empty structure for low-fidelity devices, but the
    // field itself has to be present in the payload.
    let ecg_data = raw
        .ecg_data
        .clone()
        .ok_or(IngestError::MissingField("ecg_data"))?;
    Ok(RequiredFields {
        device_id,
        patient_id,
        heart_rate,
        ecg_data,
    })
}

/// Validate an inbound sample: required fields, device resolution, and the
/// device/patient binding check.
///
/// An unknown and an inactive device are indistinguishable to the caller so
/// probing cannot reveal whether a device id exists. The binding check is a
/// security boundary: a misconfigured or compromised device must not be able
/// to write into another patient's stream.
pub async fn validate(
    pool: &PgPool,
    raw: &EcgSampleRequest,
    received_at: DateTime<Utc>,
) -> Result<ValidSample, IngestError> {
    let fields = require_fields(raw)?;

    let device = find_active_device(pool, &fields.device_id)
        .await?
        .ok_or(IngestError::DeviceNotFound)?;

    if device.patient_id != fields.patient_id {
        return Err(IngestError::PatientMismatch);
    }

    Ok(ValidSample {
        device_uuid: device.id,
        patient_id: device.patient_id,
        timestamp: raw.timestamp.unwrap_or(received_at),
        heart_rate: fields.heart_rate,
        ecg_data: fields.ecg_data,
        signal_quality: raw.signal_quality.unwrap_or(100),
        battery_level: raw.battery_level,
        temperature: raw.temperature,
        activity_level: raw.activity_level.clone(),
    })
}
