//! Multi-provider LLM client (C8): a unified text+vision chat interface over
//! hosted and local providers, selected by role and wrapped in a retry
//! decorator. Generalizes the teacher's `analyzer-llm` crate (single
//! provider, text-only, log-analysis-specific) to the capability-based
//! polymorphism the page analyzer requires.

pub mod factory;
pub mod hosted;
pub mod local;
pub mod message;
pub mod openai_compat;
pub mod provider;
pub mod retry;

pub use factory::{build_provider, LlmRole};
pub use hosted::{HostedKind, HostedProvider};
pub use local::LocalProvider;
pub use message::{ChatMessage, ChatOptions, ChatResponse, ContentPart, MessageContent, Role};
pub use provider::LlmProvider;
pub use retry::RetryingProvider;
