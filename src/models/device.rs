use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered field device, bound to exactly one patient at provisioning
/// time. Devices are never hard-deleted; they are deactivated instead.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcgDevice {
    pub id: Uuid,
    pub device_id: String,
    pub device_name: Option<String>,
    pub patient_id: String,
    pub is_active: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub battery_level: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    pub patient_id: String,
}
