use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::reading::EcgReading;

/// Whether an event came from a stored reading or the synthetic generator.
/// Demo events are transport-fallback only and are never persisted; the
/// flag is the only way a consumer can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Live,
    Demo,
}

/// One reading pushed to live subscribers, as serialized onto the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingEvent {
    pub event_type: &'static str,
    pub source: FeedSource,
    pub patient_id: String,
    pub reading: EcgReading,
}

impl ReadingEvent {
    pub fn live(reading: EcgReading) -> Self {
        Self {
            event_type: "ecg_reading",
            source: FeedSource::Live,
            patient_id: reading.patient_id.clone(),
            reading,
        }
    }

    pub fn demo(reading: EcgReading) -> Self {
        Self {
            event_type: "ecg_reading",
            source: FeedSource::Demo,
            patient_id: reading.patient_id.clone(),
            reading,
        }
    }
}

/// Handle returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Debug)]
pub struct FeedSubscription {
    id: u64,
    pub patient_id: String,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ReadingEvent>,
}

#[derive(Default)]
struct FeedInner {
    next_id: u64,
    topics: HashMap<String, Vec<Subscriber>>,
}

/// In-process fan-out hub for newly stored readings.
///
/// The ingestion handler publishes synchronously after the INSERT commits,
/// so subscribers see readings with no polling delay, in persistence order,
/// at most once per subscription. Subscribers that detached mid-publish are
/// pruned instead of failing the publisher.
#[derive(Default)]
pub struct LiveFeed {
    inner: Mutex<FeedInner>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        patient_id: &str,
    ) -> (FeedSubscription, mpsc::UnboundedReceiver<ReadingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("live feed lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .topics
            .entry(patient_id.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        (
            FeedSubscription {
                id,
                patient_id: patient_id.to_string(),
            },
            rx,
        )
    }

    pub fn unsubscribe(&self, subscription: &FeedSubscription) {
        let mut inner = self.inner.lock().expect("live feed lock poisoned");
        if let Some(subscribers) = inner.topics.get_mut(&subscription.patient_id) {
            subscribers.retain(|s| s.id != subscription.id);
            if subscribers.is_empty() {
                inner.topics.remove(&subscription.patient_id);
            }
        }
    }

    /// Deliver an event to every current subscriber for its patient.
    pub fn publish(&self, event: ReadingEvent) {
        let mut inner = self.inner.lock().expect("live feed lock poisoned");
        let Some(subscribers) = inner.topics.get_mut(&event.patient_id) else {
            return;
        };
        // A failed send means the receiver is gone; drop the subscriber.
        subscribers.retain(|s| s.tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            inner.topics.remove(&event.patient_id);
        }
    }

    pub fn subscriber_count(&self, patient_id: &str) -> usize {
        let inner = self.inner.lock().expect("live feed lock poisoned");
        inner.topics.get(patient_id).map_or(0, |s| s.len())
    }
}
