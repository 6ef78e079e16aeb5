use actix_web::web;

pub mod backend_health;
pub mod devices;
pub mod readings;
pub mod websocket;

use crate::handlers::ingest::{ingest_ecg_sample, method_not_allowed};
use crate::middleware::auth::AuthMiddleware;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    // Device ingestion; API-key auth happens inside the handler so the 401
    // is produced before the body is parsed.
    cfg.service(
        web::resource("/ecg-data")
            .route(web::post().to(ingest_ecg_sample))
            .route(web::route().to(method_not_allowed)),
    );

    // Dashboard query surface (requires a bearer token)
    cfg.service(
        web::scope("/readings")
            .wrap(AuthMiddleware)
            .service(readings::latest_readings),
    );
    cfg.service(
        web::scope("/devices")
            .wrap(AuthMiddleware)
            .service(devices::register_device)
            .service(devices::deactivate_device)
            .service(devices::patient_devices),
    );

    // WebSocket live feed (token auth handled in the route)
    cfg.service(web::resource("/ecg-ws").route(web::get().to(websocket::ecg_ws_route)));
}
