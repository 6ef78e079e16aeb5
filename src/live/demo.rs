use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use sqlx::types::Json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::settings::DemoSettings;
use crate::live::feed::{LiveFeed, ReadingEvent};
use crate::models::reading::EcgReading;

struct GeneratorSlot {
    refs: usize,
    task: JoinHandle<()>,
}

/// Refcounted synthetic reading generator, one background task per patient.
///
/// When a dashboard watches a patient who has no active device, the session
/// acquires a generator; plausible readings then flow through the same
/// `LiveFeed` publish path as real ones, flagged `source: "demo"`. The task
/// starts on the first acquire and is aborted on the last release, and its
/// output is never persisted.
pub struct DemoFeed {
    feed: Arc<LiveFeed>,
    settings: DemoSettings,
    generators: Mutex<HashMap<String, GeneratorSlot>>,
}

impl DemoFeed {
    pub fn new(feed: Arc<LiveFeed>, settings: DemoSettings) -> Self {
        Self {
            feed,
            settings,
            generators: Mutex::new(HashMap::new()),
        }
    }

    pub fn acquire(&self, patient_id: &str) {
        if !self.settings.enabled {
            return;
        }
        let mut generators = self.generators.lock().expect("demo feed lock poisoned");
        if let Some(slot) = generators.get_mut(patient_id) {
            slot.refs += 1;
            return;
        }
        tracing::info!("Starting demo ECG generator for patient {}", patient_id);
        let task = tokio::spawn(run_generator(
            self.feed.clone(),
            patient_id.to_string(),
            Duration::from_secs(self.settings.interval_secs),
        ));
        generators.insert(patient_id.to_string(), GeneratorSlot { refs: 1, task });
    }

    pub fn release(&self, patient_id: &str) {
        let mut generators = self.generators.lock().expect("demo feed lock poisoned");
        let Some(slot) = generators.get_mut(patient_id) else {
            return;
        };
        slot.refs -= 1;
        if slot.refs == 0 {
            tracing::info!("Stopping demo ECG generator for patient {}", patient_id);
            slot.task.abort();
            generators.remove(patient_id);
        }
    }

    pub fn is_running(&self, patient_id: &str) -> bool {
        self.generators
            .lock()
            .expect("demo feed lock poisoned")
            .contains_key(patient_id)
    }
}

async fn run_generator(feed: Arc<LiveFeed>, patient_id: String, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        feed.publish(ReadingEvent::demo(synthetic_reading(&patient_id)));
    }
}

/// Generate one plausible reading for demonstration mode.
///
/// The anomaly cutoffs here (55/110 plus the ST-elevation rule) are a
/// synthetic-data policy for making demo streams visually interesting. They
/// are intentionally different from the authoritative clinical table in
/// `ingest::classifier` and must not be copied there.
fn synthetic_reading(patient_id: &str) -> EcgReading {
    let mut rng = rand::thread_rng();

    let base_hr = 70.0f64;
    let variation = rng.gen_range(-10.0..10.0);
    // Occasional spike so the demo stream shows anomalies now and then.
    let spike = if rng.gen_bool(0.05) {
        if rng.gen_bool(0.5) {
            -15.0
        } else {
            25.0
        }
    } else {
        0.0
    };
    let heart_rate = ((base_hr + variation + spike).round() as i32).clamp(45, 120);

    let rr_interval = 60_000 / heart_rate;
    let qrs_duration = rng.gen_range(80..=120);
    let heart_rate_variability = rng.gen_range(25..=70);
    let st_segment = (rng.gen_range(0.0..0.3f64) * 100.0).round() / 100.0;
    let temperature = 98.0 + rng.gen_range(0.0..1.5f32);
    let signal_quality = rng.gen_range(85..=100);
    let battery_level = 92 - rng.gen_range(0..=7);

    let (anomaly_detected, anomaly_type) = if heart_rate < 55 {
        (true, Some("Bradycardia".to_string()))
    } else if heart_rate > 110 {
        (true, Some("Tachycardia".to_string()))
    } else if st_segment > 0.15 {
        (true, Some("ST Segment Elevation".to_string()))
    } else {
        (false, None)
    };

    let now = Utc::now();
    EcgReading {
        id: Uuid::new_v4(),
        // Synthetic readings have no registered device behind them.
        device_id: Uuid::nil(),
        patient_id: patient_id.to_string(),
        timestamp: now,
        heart_rate,
        ecg_data: Json(serde_json::json!({
            "heart_rate": heart_rate,
            "rr_interval": rr_interval,
            "qrs_duration": qrs_duration,
            "heart_rate_variability": heart_rate_variability,
            "st_segment": st_segment,
            "raw_value": heart_rate,
        })),
        signal_quality,
        battery_level: Some(battery_level),
        temperature: Some(temperature),
        activity_level: None,
        anomaly_detected,
        anomaly_type,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_settings(interval_secs: u64) -> DemoSettings {
        DemoSettings {
            enabled: true,
            interval_secs,
            fallback_delay_secs: 0,
        }
    }

    #[tokio::test]
    async fn generator_starts_on_first_acquire_and_stops_on_last_release() {
        let feed = Arc::new(LiveFeed::new());
        let demo = DemoFeed::new(feed.clone(), demo_settings(3600));

        demo.acquire("P1");
        demo.acquire("P1");
        assert!(demo.is_running("P1"));

        demo.release("P1");
        assert!(demo.is_running("P1"));

        demo.release("P1");
        assert!(!demo.is_running("P1"));
    }

    #[tokio::test]
    async fn release_without_acquire_is_a_no_op() {
        let feed = Arc::new(LiveFeed::new());
        let demo = DemoFeed::new(feed, demo_settings(3600));
        demo.release("P1");
        assert!(!demo.is_running("P1"));
    }

    #[tokio::test]
    async fn disabled_demo_never_starts_a_generator() {
        let feed = Arc::new(LiveFeed::new());
        let demo = DemoFeed::new(
            feed,
            DemoSettings {
                enabled: false,
                interval_secs: 1,
                fallback_delay_secs: 0,
            },
        );
        demo.acquire("P1");
        assert!(!demo.is_running("P1"));
    }

    #[tokio::test(start_paused = true)]
    async fn generated_events_flow_through_the_feed_flagged_as_demo() {
        let feed = Arc::new(LiveFeed::new());
        let demo = DemoFeed::new(feed.clone(), demo_settings(1));
        let (_sub, mut rx) = feed.subscribe("P1");

        demo.acquire("P1");
        tokio::time::advance(Duration::from_secs(2)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, crate::live::feed::FeedSource::Demo);
        assert_eq!(event.patient_id, "P1");
        assert!(event.reading.heart_rate >= 45 && event.reading.heart_rate <= 120);

        demo.release("P1");
    }

    #[test]
    fn synthetic_readings_stay_in_plausible_ranges() {
        for _ in 0..200 {
            let reading = synthetic_reading("P1");
            assert!((45..=120).contains(&reading.heart_rate));
            assert!((85..=100).contains(&reading.signal_quality));
            let battery = reading.battery_level.unwrap();
            assert!((85..=92).contains(&battery));
            let temp = reading.temperature.unwrap();
            assert!((98.0..=99.5).contains(&temp));
            if reading.anomaly_detected {
                assert!(reading.anomaly_type.is_some());
            }
        }
    }
}
