use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{http, web, App, HttpServer};
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

pub mod config;
pub mod db;
pub mod errors;
mod handlers;
pub mod ingest;
pub mod live;
mod middleware;
pub mod models;
mod routes;
pub mod telemetry;

use crate::config::jwt::JwtSettings;
use crate::config::settings::{DemoSettings, IngestSettings};
use crate::live::{DemoFeed, LiveFeed};
use crate::routes::init_routes;

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    jwt_settings: JwtSettings,
    ingest_settings: IngestSettings,
    demo_settings: DemoSettings,
    redis_client: Option<Arc<redis::Client>>,
) -> Result<Server, std::io::Error> {
    // One feed and one generator pool per process, shared across workers
    let feed = Arc::new(LiveFeed::new());
    let demo = Arc::new(DemoFeed::new(feed.clone(), demo_settings.clone()));

    let db_pool_data = web::Data::new(db_pool);
    let jwt_settings = web::Data::new(jwt_settings);
    let ingest_settings = web::Data::new(ingest_settings);
    let demo_settings = web::Data::new(demo_settings);
    let feed_data: web::Data<LiveFeed> = web::Data::from(feed);
    let demo_data: web::Data<DemoFeed> = web::Data::from(demo);
    let redis_client_data = redis_client.map(web::Data::new);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("https://pulselink.fly.dev")
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .allowed_header("x-api-key")
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(db_pool_data.clone())
            .app_data(jwt_settings.clone())
            .app_data(ingest_settings.clone())
            .app_data(demo_settings.clone())
            .app_data(feed_data.clone())
            .app_data(demo_data.clone());
        if let Some(redis) = &redis_client_data {
            app = app.app_data(redis.clone());
        }

        app.configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
