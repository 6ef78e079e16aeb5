use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use sqlx::PgPool;

use crate::config::settings::DemoSettings;
use crate::db::devices::patient_has_active_device;
use crate::live::{DemoFeed, FeedSource, FeedSubscription, LiveFeed};
use crate::routes::websocket::messages::FeedMessage;

// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// One dashboard consumer watching one patient's live reading stream.
///
/// Subscribes to the in-process feed on start and unsubscribes on stop, so
/// the subscription lifetime is exactly the connection lifetime. If the
/// patient has no active device after a bounded wait, the session acquires
/// the synthetic generator and releases it again on disconnect.
pub struct EcgLiveSession {
    heartbeat: Instant,
    patient_id: String,
    username: String,
    feed: Arc<LiveFeed>,
    demo: Arc<DemoFeed>,
    pool: PgPool,
    demo_settings: DemoSettings,
    subscription: Option<FeedSubscription>,
    demo_held: Arc<AtomicBool>,
}

impl EcgLiveSession {
    pub fn new(
        patient_id: String,
        username: String,
        feed: Arc<LiveFeed>,
        demo: Arc<DemoFeed>,
        pool: PgPool,
        demo_settings: DemoSettings,
    ) -> Self {
        Self {
            heartbeat: Instant::now(),
            patient_id,
            username,
            feed,
            demo,
            pool,
            demo_settings,
            subscription: None,
            demo_held: Arc::new(AtomicBool::new(false)),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                tracing::warn!(
                    "Live feed client heartbeat missed, disconnecting {} (patient {})",
                    act.username,
                    act.patient_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"ping");
        });
    }

    /// Subscribe to the feed and forward every event as a text frame.
    fn start_feed_forwarding(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let (subscription, mut rx) = self.feed.subscribe(&self.patient_id);
        self.subscription = Some(subscription);

        let addr = ctx.address();
        let demo = self.demo.clone();
        let demo_held = self.demo_held.clone();
        let patient_id = self.patient_id.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Real data showing up ends demo mode for this session.
                if event.source == FeedSource::Live && demo_held.swap(false, Ordering::SeqCst) {
                    demo.release(&patient_id);
                }
                match serde_json::to_string(&event) {
                    Ok(payload) => addr.do_send(FeedMessage(payload)),
                    Err(e) => {
                        tracing::error!("Failed to serialize reading event: {}", e);
                    }
                }
            }
            // Receiver closed: the session unsubscribed or the feed pruned us.
        });
    }

    /// After a bounded wait, fall back to the synthetic generator when the
    /// patient has no active device streaming real samples.
    fn schedule_demo_fallback(&self, ctx: &mut ws::WebsocketContext<Self>) {
        if !self.demo_settings.enabled {
            return;
        }
        let addr = ctx.address();
        let pool = self.pool.clone();
        let demo = self.demo.clone();
        let demo_held = self.demo_held.clone();
        let patient_id = self.patient_id.clone();
        let delay = Duration::from_secs(self.demo_settings.fallback_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match patient_has_active_device(&pool, &patient_id).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Device check failed for patient {}: {}", patient_id, e);
                    return;
                }
            }
            demo.acquire(&patient_id);
            demo_held.store(true, Ordering::SeqCst);
            // The session may have stopped while we were waiting.
            if !addr.connected() && demo_held.swap(false, Ordering::SeqCst) {
                demo.release(&patient_id);
            }
        });
    }
}

impl Actor for EcgLiveSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Live ECG session started for {} (patient {})",
            self.username,
            self.patient_id
        );
        self.heartbeat(ctx);
        self.start_feed_forwarding(ctx);
        self.schedule_demo_fallback(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(subscription) = self.subscription.take() {
            self.feed.unsubscribe(&subscription);
        }
        if self.demo_held.swap(false, Ordering::SeqCst) {
            self.demo.release(&self.patient_id);
        }
        tracing::info!(
            "Live ECG session stopped for {} (patient {})",
            self.username,
            self.patient_id
        );
    }
}

impl Handler<FeedMessage> for EcgLiveSession {
    type Result = ();

    fn handle(&mut self, msg: FeedMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for EcgLiveSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(_)) => {
                // The live feed is one-way; inbound text only refreshes the
                // heartbeat.
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(
                    "Unexpected binary frame from {} (patient {})",
                    self.username,
                    self.patient_id
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}
