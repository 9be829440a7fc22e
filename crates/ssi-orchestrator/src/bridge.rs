//! Bridges between the event bus (C11) and the agent controller's
//! `AgentEventSink`/`GuidanceHandler` seams (C10). `ssi-agent` doesn't
//! depend on `ssi-events` directly so that it can be driven headless in
//! tests; these adapters are the only place the two crates meet.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ssi_agent::{AgentEventSink, GuidanceHandler, GuidanceRequest, GuidanceResponse, HumanAction};
use ssi_events::{EventBus, EventType, GuidanceAction, GuidanceCommand};

/// Forwards `AgentController` telemetry into an [`EventBus`].
pub struct EventBusSink {
    bus: Arc<EventBus>,
}

impl EventBusSink {
    pub fn new(bus: Arc<EventBus>) -> Self {
        EventBusSink { bus }
    }
}

#[async_trait]
impl AgentEventSink for EventBusSink {
    async fn on_event(&self, event_type: &str, data: Value) {
        self.bus.emit(EventType::parse_or_log(event_type), data).await;
    }
}

/// Routes `AgentController` guidance requests through the bus's blocking
/// `request_guidance`/`provide_guidance` handshake.
pub struct EventBusGuidance {
    bus: Arc<EventBus>,
}

impl EventBusGuidance {
    pub fn new(bus: Arc<EventBus>) -> Self {
        EventBusGuidance { bus }
    }
}

#[async_trait]
impl GuidanceHandler for EventBusGuidance {
    async fn request_guidance(&self, request: GuidanceRequest) -> GuidanceResponse {
        let suggested = serde_json::to_value(
            request
                .suggested_actions
                .iter()
                .map(|s| serde_json::json!({"label": s.label, "action": format!("{:?}", s.action).to_lowercase(), "value": s.value, "description": s.description}))
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| serde_json::json!([]));

        let command = self
            .bus
            .request_guidance(
                &request.site_url,
                &request.state,
                request.actions_taken,
                request.threshold,
                &request.screenshot_b64,
                &request.page_text_snippet,
                suggested,
                &request.current_url,
            )
            .await;

        GuidanceResponse {
            action: from_guidance_action(command.action),
            value: command.value,
            reason: command.reason,
        }
    }
}

fn from_guidance_action(action: GuidanceAction) -> HumanAction {
    match action {
        GuidanceAction::Click => HumanAction::Click,
        GuidanceAction::Type => HumanAction::Type,
        GuidanceAction::Goto => HumanAction::Goto,
        GuidanceAction::Skip => HumanAction::Skip,
        GuidanceAction::Continue => HumanAction::Continue,
    }
}

/// Publishes operator guidance submitted out-of-band (e.g. over a
/// WebSocket) back onto the bus the controller is blocked on.
pub fn provide_guidance(bus: &EventBus, action: GuidanceAction, value: String, reason: String) {
    bus.provide_guidance(GuidanceCommand { action, value, reason });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_forwards_named_events_onto_the_bus() {
        let bus = Arc::new(EventBus::new("inv-1"));
        let sink = EventBusSink::new(bus.clone());
        sink.on_event("wallet_found", serde_json::json!({"symbol": "USDT"})).await;
        let snapshot = bus.get_snapshot();
        // wallet_found doesn't update the snapshot directly, but emit()
        // should not have panicked and sink_count stays at zero (no sinks
        // registered) — this just exercises the forwarding path.
        assert_eq!(snapshot.uptime_sec >= 0.0, true);
    }

    #[test]
    fn guidance_action_mapping_round_trips() {
        assert_eq!(from_guidance_action(GuidanceAction::Skip), HumanAction::Skip);
        assert_eq!(from_guidance_action(GuidanceAction::Continue), HumanAction::Continue);
    }
}
