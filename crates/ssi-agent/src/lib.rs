//! Agent controller (C10): drives a single scam site through the
//! registration/deposit/wallet-extraction funnel, composing the decision
//! cascade, DOM inspector, and page analyzer crates into one state machine.

pub mod controller;
pub mod guidance;
pub mod identity;
pub mod metrics;
pub mod result;
pub mod screenshots;
pub mod state;

pub use controller::AgentController;
pub use guidance::{AgentEventSink, AutoSkipGuidance, GuidanceHandler, GuidanceRequest, GuidanceResponse, HumanAction, NullEventSink, SuggestedAction};
pub use identity::{IdentityProfile, IdentityVault, PasswordVariants};
pub use metrics::MetricsCollector;
pub use result::{SiteResult, SiteStatus};
pub use screenshots::ScreenshotStore;
pub use state::{AgentState, MILESTONE_SCREENSHOT_STATES};
