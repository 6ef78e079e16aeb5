use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::db::devices::{deactivate_device, insert_device, list_devices_for_patient};
use crate::middleware::auth::Claims;
use crate::models::device::RegisterDeviceRequest;

/// Provision a device bound to a patient. The binding is fixed for the
/// lifetime of the device.
#[tracing::instrument(
    name = "Register ECG device",
    skip(request, pool, claims),
    fields(username = %claims.username, device_id = %request.device_id)
)]
pub async fn register_device(
    request: web::Json<RegisterDeviceRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    match insert_device(&pool, &request).await {
        Ok(device) => HttpResponse::Ok().json(device),
        Err(e) => {
            if e.as_database_error()
                .map_or(false, |db_err| db_err.is_unique_violation())
            {
                return HttpResponse::Conflict().json(json!({
                    "error": "Device already registered"
                }));
            }
            tracing::error!("Failed to register device {}: {}", request.device_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register device"
            }))
        }
    }
}

/// Devices are never hard-deleted; deactivation removes them from the
/// validator's view while keeping their reading history intact.
#[tracing::instrument(
    name = "Deactivate ECG device",
    skip(pool, claims),
    fields(username = %claims.username, device_id = %path)
)]
pub async fn deactivate(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let device_id = path.into_inner();
    match deactivate_device(&pool, &device_id).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "success": true })),
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "Device not found" })),
        Err(e) => {
            tracing::error!("Failed to deactivate device {}: {}", device_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to deactivate device"
            }))
        }
    }
}

#[tracing::instrument(
    name = "List patient devices",
    skip(pool, claims),
    fields(username = %claims.username, patient_id = %path)
)]
pub async fn patient_devices(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let patient_id = path.into_inner();
    match list_devices_for_patient(&pool, &patient_id).await {
        Ok(devices) => HttpResponse::Ok().json(devices),
        Err(e) => {
            tracing::error!("Failed to list devices for {}: {}", patient_id, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to list devices"
            }))
        }
    }
}
