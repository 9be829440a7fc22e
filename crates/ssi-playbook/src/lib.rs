//! Playbook executor: deterministic scripted action sequences for known
//! site patterns, with retry, a wall-clock time budget, and fallback to the
//! LLM cascade on step failure. Grounded on
//! `examples/original_source/src/ssi/playbook/executor.py`.

pub mod executor;
pub mod models;
pub mod registry;
pub mod template;

pub use executor::PlaybookExecutor;
pub use models::{ExtractedWallet, Playbook, PlaybookResult, PlaybookStep, PlaybookStepResult, PlaybookStepType};
pub use registry::{builtin_playbooks, match_playbook};
pub use template::resolve_template;
