//! Event consumers: write to a JSONL file, the tracing log, or an
//! in-memory buffer for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;

use crate::event::Event;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle_event(&self, event: &Event);
}

/// Emits events to `tracing` at debug level — always on, cheap, and useful
/// even when no other sink is registered.
#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl EventSink for LoggingSink {
    async fn handle_event(&self, event: &Event) {
        let preview: String = event.data.to_string().chars().take(200).collect();
        tracing::debug!(
            investigation_id = %event.investigation_id,
            event_type = ?event.event_type,
            data = %preview,
            "event"
        );
    }
}

/// Collects events in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventSink for InMemorySink {
    async fn handle_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl InMemorySink {
    pub fn new() -> Self {
        InMemorySink::default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Writes events as newline-delimited JSON to any async writer — an open
/// file, a WebSocket frame sink, or stdout.
pub struct JsonlSink<W> {
    writer: AsyncMutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        JsonlSink { writer: AsyncMutex::new(writer) }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for JsonlSink<W> {
    async fn handle_event(&self, event: &Event) {
        let line = format!("{}\n", event.to_jsonl());
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write event to JSONL sink");
            return;
        }
        let _ = writer.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[tokio::test]
    async fn in_memory_sink_collects_events() {
        let sink = InMemorySink::new();
        sink.handle_event(&Event::new(EventType::Log, "inv-1", serde_json::json!({}))).await;
        sink.handle_event(&Event::new(EventType::Error, "inv-1", serde_json::json!({}))).await;
        assert_eq!(sink.count(), 2);
        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn jsonl_sink_writes_one_line_per_event() {
        use tokio::io::AsyncReadExt;

        let (writer, mut reader) = tokio::io::duplex(4096);
        let sink = JsonlSink::new(writer);
        sink.handle_event(&Event::new(EventType::Log, "inv-1", serde_json::json!({"a": 1}))).await;
        drop(sink);

        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.contains("\"a\":1"));
    }
}
