use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted vital-sign sample. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcgReading {
    pub id: Uuid,
    pub device_id: Uuid,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: i32,
    pub ecg_data: Json<serde_json::Value>,
    pub signal_quality: i32,
    pub battery_level: Option<i32>,
    pub temperature: Option<f32>,
    pub activity_level: Option<Json<serde_json::Value>>,
    pub anomaly_detected: bool,
    pub anomaly_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Wire payload for `POST /ecg-data`. All required fields are optional here
/// so the validator can report exactly which one is missing instead of
/// surfacing an opaque deserialization error.
#[derive(Debug, Deserialize)]
pub struct EcgSampleRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
    #[serde(default)]
    pub ecg_data: Option<serde_json::Value>,
    // Capture time; authoritative for ordering. Defaults to receipt time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signal_quality: Option<i32>,
    #[serde(default)]
    pub battery_level: Option<i32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub activity_level: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub anomaly_detected: bool,
    pub anomaly_type: Option<String>,
}
