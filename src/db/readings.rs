use sqlx::PgPool;

use crate::ingest::classifier::Anomaly;
use crate::ingest::validator::ValidSample;
use crate::models::reading::EcgReading;

const READING_COLUMNS: &str = "id, device_id, patient_id, timestamp, heart_rate, ecg_data, \
     signal_quality, battery_level, temperature, activity_level, anomaly_detected, \
     anomaly_type, created_at";

/// Append a reading. The database assigns the identifier and the insertion
/// order (`created_at`), which breaks ties between equal capture timestamps.
pub async fn insert_reading(
    pool: &PgPool,
    sample: &ValidSample,
    anomaly: Option<Anomaly>,
) -> Result<EcgReading, sqlx::Error> {
    let query = format!(
        "INSERT INTO ecg_readings \
            (device_id, patient_id, timestamp, heart_rate, ecg_data, signal_quality, \
             battery_level, temperature, activity_level, anomaly_detected, anomaly_type) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {}",
        READING_COLUMNS
    );
    sqlx::query_as::<_, EcgReading>(&query)
        .bind(sample.device_uuid)
        .bind(&sample.patient_id)
        .bind(sample.timestamp)
        .bind(sample.heart_rate)
        .bind(sqlx::types::Json(&sample.ecg_data))
        .bind(sample.signal_quality)
        .bind(sample.battery_level)
        .bind(sample.temperature)
        .bind(sample.activity_level.as_ref().map(sqlx::types::Json))
        .bind(anomaly.is_some())
        .bind(anomaly.map(|a| a.label()))
        .fetch_one(pool)
        .await
}

/// Most recent `limit` readings for a patient, newest first by capture
/// timestamp, insertion order as tiebreak. Empty history is an empty vec,
/// never an error.
pub async fn latest_readings(
    pool: &PgPool,
    patient_id: &str,
    limit: i64,
) -> Result<Vec<EcgReading>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM ecg_readings WHERE patient_id = $1 \
         ORDER BY timestamp DESC, created_at DESC LIMIT $2",
        READING_COLUMNS
    );
    sqlx::query_as::<_, EcgReading>(&query)
        .bind(patient_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}
