use actix_web::{get, web, HttpResponse};
use sqlx::PgPool;

use crate::handlers::readings::{get_latest_readings, LatestQuery};
use crate::middleware::auth::Claims;

#[get("/{patient_id}")]
async fn latest_readings(
    path: web::Path<String>,
    query: web::Query<LatestQuery>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_latest_readings(path, query, pool, claims).await
}
