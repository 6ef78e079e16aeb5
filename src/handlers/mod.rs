pub mod backend_health;
pub mod devices;
pub mod ingest;
pub mod readings;
