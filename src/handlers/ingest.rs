use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::settings::IngestSettings;
use crate::db::devices::touch_device;
use crate::db::readings::insert_reading;
use crate::errors::IngestError;
use crate::ingest::classifier::classify;
use crate::ingest::validator::validate;
use crate::live::{LiveFeed, ReadingEvent};
use crate::models::reading::{EcgSampleRequest, IngestResponse};

/// `POST /ecg-data`: authenticate, validate, classify, persist, fan out.
///
/// The body is taken as raw bytes so the API-key check runs before any
/// parsing. Persistence and fan-out run on a spawned task: a client that
/// disconnects mid-request cannot abort a write that has already started.
#[tracing::instrument(
    name = "Ingest ECG sample",
    skip(req, body, pool, feed, redis, ingest_settings)
)]
pub async fn ingest_ecg_sample(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<PgPool>,
    feed: web::Data<LiveFeed>,
    redis: Option<web::Data<Arc<redis::Client>>>,
    ingest_settings: web::Data<IngestSettings>,
) -> Result<HttpResponse, IngestError> {
    verify_api_key(&req, &ingest_settings)?;

    let raw: EcgSampleRequest =
        serde_json::from_slice(&body).map_err(|_| IngestError::InvalidBody)?;

    let sample = validate(&pool, &raw, Utc::now()).await?;
    let anomaly = classify(sample.heart_rate);
    tracing::info!(
        patient_id = %sample.patient_id,
        heart_rate = sample.heart_rate,
        anomaly = ?anomaly.map(|a| a.label()),
        "Validated ECG sample"
    );

    let pool = pool.into_inner();
    let feed = feed.into_inner();
    let redis = redis.map(|client| client.get_ref().clone());
    let stored = tokio::spawn(async move {
        let reading = insert_reading(&pool, &sample, anomaly).await?;

        // Notify subscribers synchronously with persistence. Publish order
        // is per-process arrival order: concurrent requests for the same
        // patient may commit to the database in a different interleaving,
        // but every subscriber sees the same single sequence.
        let event = ReadingEvent::live(reading.clone());
        feed.publish(event.clone());
        publish_to_redis(redis, &event).await;

        // Telemetry is best-effort: the reading is already durable.
        if let Err(e) = touch_device(&pool, sample.device_uuid, Utc::now(), sample.battery_level).await
        {
            tracing::warn!("Failed to update device telemetry: {}", e);
        }
        Ok::<_, IngestError>(reading)
    })
    .await
    .map_err(|_| IngestError::Internal)??;

    Ok(HttpResponse::Ok().json(IngestResponse {
        success: true,
        anomaly_detected: stored.anomaly_detected,
        anomaly_type: stored.anomaly_type,
    }))
}

/// 405 for anything but POST on the ingestion resource.
pub async fn method_not_allowed() -> Result<HttpResponse, IngestError> {
    Err(IngestError::MethodNotAllowed)
}

/// Compare the presented key against the configured one via SHA-256 digests,
/// so comparison time does not depend on where the first differing byte is.
fn verify_api_key(req: &HttpRequest, settings: &IngestSettings) -> Result<(), IngestError> {
    let presented = req
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .ok_or(IngestError::InvalidApiKey)?;

    let presented_digest = Sha256::digest(presented.as_bytes());
    let expected_digest = Sha256::digest(settings.api_key.expose_secret().as_bytes());
    if presented_digest == expected_digest {
        Ok(())
    } else {
        Err(IngestError::InvalidApiKey)
    }
}

/// Mirror the event to Redis for external consumers (alerting, other
/// instances). Never fatal; the in-process feed already delivered it.
async fn publish_to_redis(redis: Option<Arc<redis::Client>>, event: &ReadingEvent) {
    let Some(client) = redis else {
        return;
    };
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize reading event: {}", e);
            return;
        }
    };
    let channel = format!("pulselink:events:patient:{}", event.patient_id);
    match client.get_async_connection().await {
        Ok(mut conn) => {
            if let Err(e) =
                redis::AsyncCommands::publish::<_, _, i32>(&mut conn, &channel, payload).await
            {
                tracing::warn!("Failed to publish reading event to Redis: {}", e);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis for event publish: {}", e);
        }
    }
}
