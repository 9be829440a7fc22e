//! State machine states for a single site investigation. Generalizes the
//! controller's implicit state table into an explicit enum + match idiom.

/// One state in the registration/deposit/wallet-extraction funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    Init,
    LoadSite,
    FindRegister,
    FillRegister,
    SubmitRegister,
    CheckEmailVerification,
    NavigateDeposit,
    ExtractWallets,
    Complete,
    Skipped,
    Error,
    NeedsManualReview,
}

impl AgentState {
    /// The upper-snake-case name used throughout the cascade, scan, and
    /// prompt-assembly layers, which key off plain strings rather than the
    /// enum itself.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentState::Init => "INIT",
            AgentState::LoadSite => "LOAD_SITE",
            AgentState::FindRegister => "FIND_REGISTER",
            AgentState::FillRegister => "FILL_REGISTER",
            AgentState::SubmitRegister => "SUBMIT_REGISTER",
            AgentState::CheckEmailVerification => "CHECK_EMAIL_VERIFICATION",
            AgentState::NavigateDeposit => "NAVIGATE_DEPOSIT",
            AgentState::ExtractWallets => "EXTRACT_WALLETS",
            AgentState::Complete => "COMPLETE",
            AgentState::Skipped => "SKIPPED",
            AgentState::Error => "ERROR",
            AgentState::NeedsManualReview => "NEEDS_MANUAL_REVIEW",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AgentState::Complete | AgentState::Skipped | AgentState::Error | AgentState::NeedsManualReview
        )
    }

    /// Successor state once the current state's `done` action fires. Only
    /// meaningful for the "happy path" states — `EXTRACT_WALLETS` is handled
    /// separately since `done` there means wallet data was parsed, not a
    /// plain advance.
    pub fn next_on_done(self) -> AgentState {
        match self {
            AgentState::FindRegister => AgentState::FillRegister,
            AgentState::FillRegister => AgentState::SubmitRegister,
            AgentState::SubmitRegister => AgentState::CheckEmailVerification,
            AgentState::CheckEmailVerification => AgentState::NavigateDeposit,
            AgentState::NavigateDeposit => AgentState::ExtractWallets,
            AgentState::ExtractWallets => AgentState::Complete,
            _ => AgentState::Complete,
        }
    }
}

/// States where a full-resolution milestone screenshot is captured on first
/// entry, for human review.
pub const MILESTONE_SCREENSHOT_STATES: &[AgentState] = &[
    AgentState::FindRegister,
    AgentState::FillRegister,
    AgentState::SubmitRegister,
    AgentState::NavigateDeposit,
    AgentState::ExtractWallets,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_round_trips_through_cascade_state_names() {
        assert_eq!(AgentState::FindRegister.as_str(), "FIND_REGISTER");
        assert_eq!(AgentState::CheckEmailVerification.as_str(), "CHECK_EMAIL_VERIFICATION");
    }

    #[test]
    fn terminal_states_are_exactly_four() {
        let terminal: Vec<_> = [
            AgentState::Init,
            AgentState::LoadSite,
            AgentState::FindRegister,
            AgentState::FillRegister,
            AgentState::SubmitRegister,
            AgentState::CheckEmailVerification,
            AgentState::NavigateDeposit,
            AgentState::ExtractWallets,
            AgentState::Complete,
            AgentState::Skipped,
            AgentState::Error,
            AgentState::NeedsManualReview,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();
        assert_eq!(terminal.len(), 4);
    }

    #[test]
    fn happy_path_chains_to_extract_wallets() {
        let mut state = AgentState::FindRegister;
        for _ in 0..6 {
            state = state.next_on_done();
        }
        assert_eq!(state, AgentState::Complete);
    }
}
