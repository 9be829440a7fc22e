//! Page analyzer (C9): prompt assembly, conversation management, and LLM
//! response parsing for the browser-driving agent. Generalizes the
//! teacher's `analyzer-llm` prompt/response idiom to a multimodal,
//! multi-turn, batch-capable analyzer.

pub mod analyzer;
pub mod prompts;

pub use analyzer::{PageAnalyzer, TokenUsage};
