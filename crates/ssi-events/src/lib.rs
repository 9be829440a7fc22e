//! Event bus (C11): decouples the agent controller from whatever is
//! watching an investigation — a CLI progress bar, a WebSocket broadcaster,
//! or a JSONL audit log. A single [`bus::EventBus`] fans events out to every
//! registered [`sink::EventSink`] and brokers the blocking human-guidance
//! handshake the agent controller uses when it gets stuck.

pub mod bus;
pub mod event;
pub mod guidance;
pub mod sink;

pub use bus::{EventBus, Snapshot};
pub use event::{Event, EventType};
pub use guidance::{GuidanceAction, GuidanceCommand};
pub use sink::{EventSink, InMemorySink, JsonlSink, LoggingSink};
