mod auth;
mod connection;
mod messages;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use sqlx::PgPool;

use crate::config::jwt::JwtSettings;
use crate::config::settings::DemoSettings;
use crate::live::{DemoFeed, LiveFeed};

pub use auth::decode_token;
pub use connection::EcgLiveSession;
pub use messages::WsQuery;

/// Live ECG WebSocket route: `GET /ecg-ws?patient_id=...&token=...`.
///
/// Token auth happens here (query parameter, since browsers cannot set
/// headers on WebSocket upgrades); the session actor then subscribes to the
/// live feed for the requested patient.
pub async fn ecg_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    jwt_settings: web::Data<JwtSettings>,
    pool: web::Data<PgPool>,
    feed: web::Data<LiveFeed>,
    demo: web::Data<DemoFeed>,
    demo_settings: web::Data<DemoSettings>,
) -> Result<HttpResponse, Error> {
    let claims = match decode_token(&query.token, &jwt_settings) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Rejected WebSocket connection, invalid token: {}", e);
            return Err(actix_web::error::ErrorUnauthorized("Invalid token"));
        }
    };
    tracing::info!(
        "Live ECG WebSocket requested by {} for patient {}",
        claims.username,
        query.patient_id
    );

    let session = EcgLiveSession::new(
        query.patient_id.clone(),
        claims.username,
        feed.into_inner(),
        demo.into_inner(),
        pool.get_ref().clone(),
        demo_settings.get_ref().clone(),
    );
    ws::start(session, &req, stream)
}
