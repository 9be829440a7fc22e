//! The event types and payload emitted during an investigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every event type the bus can carry, covering lifecycle, state-machine,
/// browser/agent, playbook, and human-interaction notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SiteStarted,
    SiteCompleted,

    StateChanged,

    ScreenshotUpdate,
    ActionExecuted,
    WalletFound,

    PlaybookMatched,
    PlaybookCompleted,

    GuidanceNeeded,
    GuidanceReceived,

    Log,
    Progress,
    Error,
}

impl EventType {
    /// Parses the wire string a raw event name would carry, falling back to
    /// [`EventType::Log`] for anything unrecognized rather than rejecting it —
    /// callers emit best-effort telemetry and shouldn't be blocked by a typo
    /// in an event name.
    pub fn parse_or_log(raw: &str) -> Self {
        match raw {
            "site_started" => EventType::SiteStarted,
            "site_completed" => EventType::SiteCompleted,
            "state_changed" => EventType::StateChanged,
            "screenshot_update" => EventType::ScreenshotUpdate,
            "action_executed" => EventType::ActionExecuted,
            "wallet_found" => EventType::WalletFound,
            "playbook_matched" => EventType::PlaybookMatched,
            "playbook_completed" => EventType::PlaybookCompleted,
            "guidance_needed" => EventType::GuidanceNeeded,
            "guidance_received" => EventType::GuidanceReceived,
            "progress" => EventType::Progress,
            "error" => EventType::Error,
            _ => EventType::Log,
        }
    }
}

/// A structured event emitted by the [`crate::bus::EventBus`] to every
/// registered sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub investigation_id: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType, investigation_id: impl Into<String>, data: serde_json::Value) -> Self {
        Event {
            event_type,
            timestamp: Utc::now(),
            investigation_id: investigation_id.into(),
            data,
        }
    }

    /// Serializes to a single JSON line, with no trailing newline.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_log_falls_back_on_unknown_names() {
        assert_eq!(EventType::parse_or_log("wallet_found"), EventType::WalletFound);
        assert_eq!(EventType::parse_or_log("totally_unknown"), EventType::Log);
    }

    #[test]
    fn to_jsonl_has_no_trailing_newline() {
        let event = Event::new(EventType::Log, "inv-1", serde_json::json!({"msg": "hi"}));
        let line = event.to_jsonl();
        assert!(!line.ends_with('\n'));
        assert!(line.contains("\"msg\":\"hi\""));
    }
}
