use chrono::Utc;
use once_cell::sync::Lazy;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use uuid::Uuid;

use pulselink_backend::config::settings::{
    get_config, get_jwt_settings, DatabaseSettings, DemoSettings, IngestSettings,
};
use pulselink_backend::run;
use pulselink_backend::telemetry::{get_subscriber, init_subscriber};

/// Shared device secret configured into every test app.
pub const TEST_API_KEY: &str = "test-esp32-api-key";

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    pub jwt_secret: String,
}

impl TestApp {
    pub fn ws_url(&self, patient_id: &str, token: &str) -> String {
        format!(
            "ws://127.0.0.1:{}/ecg-ws?patient_id={}&token={}",
            self.port, patient_id, token
        )
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_config().expect("Failed to read configuration.");
    configuration.database.db_name = Uuid::new_v4().to_string();
    let connection_pool = configure_db(&configuration.database).await;
    let jwt_secret = configuration.jwt.secret.expose_secret().to_string();
    let jwt_settings = get_jwt_settings(&configuration);

    let ingest_settings = IngestSettings {
        api_key: SecretString::new(TEST_API_KEY.to_string().into_boxed_str()),
    };
    // Short intervals so the demo fallback is observable in tests
    let demo_settings = DemoSettings {
        enabled: true,
        interval_secs: 1,
        fallback_delay_secs: 1,
    };

    let server = run(
        listener,
        connection_pool.clone(),
        jwt_settings,
        ingest_settings,
        demo_settings,
        None,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        port,
        db_pool: connection_pool,
        jwt_secret,
    }
}

pub async fn configure_db(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    connection_pool
}

/// Mint a token the way the external identity provider would.
pub fn mint_token(app: &TestApp, username: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims<'a> {
        sub: String,
        username: &'a str,
        exp: usize,
    }
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        username,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(app.jwt_secret.as_bytes()),
    )
    .expect("Failed to mint test token")
}

/// Provision an active device directly, the way the out-of-band
/// provisioning flow would.
pub async fn create_device(pool: &PgPool, device_id: &str, patient_id: &str) -> Uuid {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO ecg_devices (device_id, device_name, patient_id) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(device_id)
    .bind("Test ECG Monitor")
    .bind(patient_id)
    .fetch_one(pool)
    .await
    .expect("Failed to create test device.");
    row.0
}

pub fn sample_payload(device_id: &str, patient_id: &str, heart_rate: i32) -> serde_json::Value {
    json!({
        "device_id": device_id,
        "patient_id": patient_id,
        "heart_rate": heart_rate,
        "ecg_data": {
            "heart_rate": heart_rate,
            "rr_interval": if heart_rate > 0 { 60000 / heart_rate } else { 0 },
            "qrs_duration": 95,
            "heart_rate_variability": 40,
            "st_segment": 0.1,
            "raw_value": heart_rate
        },
        "signal_quality": 97,
        "battery_level": 88,
        "temperature": 98.4
    })
}

pub async fn post_sample(
    client: &Client,
    app: &TestApp,
    payload: &serde_json::Value,
    api_key: Option<&str>,
) -> reqwest::Response {
    let mut request = client
        .post(format!("{}/ecg-data", app.address))
        .json(payload);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    request.send().await.expect("Failed to execute request.")
}

pub async fn reading_count(pool: &PgPool, patient_id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ecg_readings WHERE patient_id = $1")
        .bind(patient_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count readings.");
    row.0
}
