//! Central event dispatcher: fans events out to every registered sink,
//! and brokers the blocking guidance request/response handshake between
//! the agent controller and whichever human-facing consumer is attached
//! (WebSocket client, CLI prompt, or the auto-skip default).

use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::event::{Event, EventType};
use crate::guidance::GuidanceCommand;
use crate::sink::EventSink;

/// Cached state for a WebSocket client that connects mid-investigation —
/// it needs the latest screenshot/state/url immediately, not just events
/// emitted after it joins.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub screenshot_b64: String,
    pub state: String,
    pub url: String,
    pub uptime_sec: f64,
}

struct SnapshotState {
    screenshot_b64: String,
    state: String,
    url: String,
    started_at: Instant,
}

pub struct EventBus {
    investigation_id: String,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    guidance_tx: mpsc::UnboundedSender<GuidanceCommand>,
    guidance_rx: AsyncMutex<mpsc::UnboundedReceiver<GuidanceCommand>>,
    interject_tx: mpsc::UnboundedSender<GuidanceCommand>,
    interject_rx: AsyncMutex<mpsc::UnboundedReceiver<GuidanceCommand>>,
    snapshot: Mutex<SnapshotState>,
}

impl EventBus {
    pub fn new(investigation_id: impl Into<String>) -> Self {
        let (guidance_tx, guidance_rx) = mpsc::unbounded_channel();
        let (interject_tx, interject_rx) = mpsc::unbounded_channel();
        EventBus {
            investigation_id: investigation_id.into(),
            sinks: RwLock::new(Vec::new()),
            guidance_tx,
            guidance_rx: AsyncMutex::new(guidance_rx),
            interject_tx,
            interject_rx: AsyncMutex::new(interject_rx),
            snapshot: Mutex::new(SnapshotState {
                screenshot_b64: String::new(),
                state: String::new(),
                url: String::new(),
                started_at: Instant::now(),
            }),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().unwrap().push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().unwrap().len()
    }

    /// Emits an event to every registered sink. A sink error is logged and
    /// does not stop delivery to the remaining sinks.
    pub async fn emit(&self, event_type: EventType, data: serde_json::Value) {
        self.update_snapshot(event_type, &data);
        let event = Event::new(event_type, self.investigation_id.clone(), data);

        let sinks = self.sinks.read().unwrap().clone();
        for sink in sinks {
            sink.handle_event(&event).await;
        }
    }

    fn update_snapshot(&self, event_type: EventType, data: &serde_json::Value) {
        let mut snapshot = self.snapshot.lock().unwrap();
        match event_type {
            EventType::ScreenshotUpdate => {
                if let Some(b64) = data.get("screenshot_b64").and_then(|v| v.as_str()) {
                    snapshot.screenshot_b64 = b64.to_string();
                }
            }
            EventType::StateChanged => {
                if let Some(state) = data.get("new_state").and_then(|v| v.as_str()) {
                    snapshot.state = state.to_string();
                }
            }
            EventType::SiteStarted => {
                if let Some(url) = data.get("url").and_then(|v| v.as_str()) {
                    snapshot.url = url.to_string();
                }
                snapshot.state = "LOAD_SITE".to_string();
                snapshot.started_at = Instant::now();
            }
            _ => {}
        }
    }

    /// Emits `GUIDANCE_NEEDED` and blocks until a response arrives on the
    /// guidance channel. Stale guidance left over from a previous request is
    /// drained first so a late response can't be misattributed.
    #[allow(clippy::too_many_arguments)]
    pub async fn request_guidance(
        &self,
        site_url: &str,
        state: &str,
        actions_taken: u32,
        threshold: u32,
        screenshot_b64: &str,
        page_text_snippet: &str,
        suggested_actions: serde_json::Value,
        current_url: &str,
    ) -> GuidanceCommand {
        {
            let mut rx = self.guidance_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }

        let snippet: String = page_text_snippet.chars().take(500).collect();
        self.emit(
            EventType::GuidanceNeeded,
            serde_json::json!({
                "site_url": site_url,
                "state": state,
                "actions_taken": actions_taken,
                "threshold": threshold,
                "screenshot_b64": screenshot_b64,
                "page_text_snippet": snippet,
                "suggested_actions": suggested_actions,
                "current_url": current_url,
            }),
        )
        .await;

        tracing::info!(site_url, state, "awaiting guidance");
        let mut rx = self.guidance_rx.lock().await;
        let guidance = rx.recv().await.unwrap_or(GuidanceCommand {
            action: crate::guidance::GuidanceAction::Skip,
            value: String::new(),
            reason: "guidance channel closed".to_string(),
        });
        drop(rx);
        tracing::info!(action = ?guidance.action, "received guidance");

        self.emit(
            EventType::GuidanceReceived,
            serde_json::json!({"action": guidance.action, "value": guidance.value, "reason": guidance.reason}),
        )
        .await;

        guidance
    }

    /// Submits a guidance response — called by a WebSocket handler or CLI
    /// prompt once the operator has decided.
    pub fn provide_guidance(&self, guidance: GuidanceCommand) {
        let _ = self.guidance_tx.send(guidance);
    }

    /// Injects guidance mid-step, outside the normal stuck/guidance
    /// handshake — used when an operator wants to redirect the agent
    /// without waiting for it to get stuck first.
    pub fn request_interject(&self, guidance: GuidanceCommand) {
        tracing::info!(action = ?guidance.action, "interject requested");
        let _ = self.interject_tx.send(guidance);
    }

    /// Non-blocking check for a pending interjection. Drains the queue and
    /// returns only the most recent one, since an older interject is stale
    /// by the time a newer one has arrived.
    pub fn check_interject(&self) -> Option<GuidanceCommand> {
        let Ok(mut rx) = self.interject_rx.try_lock() else {
            return None;
        };
        let mut latest = None;
        while let Ok(cmd) = rx.try_recv() {
            latest = Some(cmd);
        }
        latest
    }

    pub fn get_snapshot(&self) -> Snapshot {
        let snapshot = self.snapshot.lock().unwrap();
        Snapshot {
            screenshot_b64: snapshot.screenshot_b64.clone(),
            state: snapshot.state.clone(),
            url: snapshot.url.clone(),
            uptime_sec: (Instant::now() - snapshot.started_at).as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::GuidanceAction;
    use crate::sink::InMemorySink;

    #[tokio::test]
    async fn emit_reaches_all_registered_sinks() {
        let bus = EventBus::new("inv-1");
        let sink = Arc::new(InMemorySink::new());
        bus.add_sink(sink.clone());
        bus.emit(EventType::Log, serde_json::json!({"msg": "hello"})).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn request_guidance_blocks_until_provided() {
        let bus = Arc::new(EventBus::new("inv-1"));
        let bus2 = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            bus2.provide_guidance(GuidanceCommand { action: GuidanceAction::Skip, value: String::new(), reason: "done".into() });
        });

        let response = bus.request_guidance("https://x", "FIND_REGISTER", 3, 15, "", "", serde_json::json!([]), "https://x").await;
        assert_eq!(response.action, GuidanceAction::Skip);
        assert_eq!(response.reason, "done");
    }

    #[test]
    fn check_interject_returns_only_the_latest() {
        let bus = EventBus::new("inv-1");
        bus.request_interject(GuidanceCommand { action: GuidanceAction::Continue, value: "first".into(), reason: String::new() });
        bus.request_interject(GuidanceCommand { action: GuidanceAction::Skip, value: "second".into(), reason: String::new() });
        let latest = bus.check_interject().unwrap();
        assert_eq!(latest.value, "second");
        assert!(bus.check_interject().is_none());
    }

    #[tokio::test]
    async fn snapshot_tracks_site_started_and_screenshot_update() {
        let bus = EventBus::new("inv-1");
        bus.emit(EventType::SiteStarted, serde_json::json!({"url": "https://scam.example"})).await;
        bus.emit(EventType::ScreenshotUpdate, serde_json::json!({"screenshot_b64": "abc123"})).await;
        let snapshot = bus.get_snapshot();
        assert_eq!(snapshot.url, "https://scam.example");
        assert_eq!(snapshot.state, "LOAD_SITE");
        assert_eq!(snapshot.screenshot_b64, "abc123");
    }
}
