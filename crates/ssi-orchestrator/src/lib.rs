//! Investigation orchestrator (C14): sequences passive recon, active
//! browser-driven interaction, fraud classification, and evidence
//! packaging into one per-URL pipeline, and persists the result.
//!
//! Grounded on `crates/api/src/main.rs`'s request-handler orchestration
//! idiom (build inputs, call into subsystem crates, fold the results into
//! one response), generalised from a single-shot log-analysis call into a
//! multi-phase, soft-failing investigation pipeline.

pub mod bridge;
pub mod classification;
pub mod pipeline;
pub mod snapshot;

pub use bridge::{EventBusGuidance, EventBusSink};
pub use classification::classify;
pub use pipeline::{run_investigation, PipelineDeps};
