use actix_web::{get, post, web, HttpResponse};
use sqlx::PgPool;

use crate::handlers::devices;
use crate::middleware::auth::Claims;
use crate::models::device::RegisterDeviceRequest;

#[post("/register")]
async fn register_device(
    request: web::Json<RegisterDeviceRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    devices::register_device(request, pool, claims).await
}

#[post("/{device_id}/deactivate")]
async fn deactivate_device(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    devices::deactivate(path, pool, claims).await
}

#[get("/{patient_id}")]
async fn patient_devices(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    devices::patient_devices(path, pool, claims).await
}
