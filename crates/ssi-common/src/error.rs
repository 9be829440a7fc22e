//! Shared error taxonomy.
//!
//! Each subsystem crate defines its own `thiserror`-derived error enum at its
//! seam; `SsiError` is the umbrella type used where code crosses subsystem
//! boundaries (the orchestrator, the API/CLI edges).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SsiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("OSINT adapter error: {0}")]
    Osint(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("evidence pipeline error: {0}")]
    Evidence(String),

    #[error("scan store error: {0}")]
    Store(String),

    #[error("investigation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}
