use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::db::readings::latest_readings;
use crate::middleware::auth::Claims;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Most-recent-N readings for a patient, newest first. Historical backfill
/// for dashboards goes through here, not the live channel.
#[tracing::instrument(
    name = "Fetch latest readings",
    skip(pool, claims),
    fields(username = %claims.username, patient_id = %path)
)]
pub async fn get_latest_readings(
    path: web::Path<String>,
    query: web::Query<LatestQuery>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let patient_id = path.into_inner();
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match latest_readings(&pool, &patient_id, limit).await {
        Ok(readings) => HttpResponse::Ok().json(readings),
        Err(e) => {
            tracing::error!("Failed to fetch readings for {}: {}", patient_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch readings"
            }))
        }
    }
}
