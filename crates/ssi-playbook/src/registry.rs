//! A small set of built-in playbooks for the registration-page patterns
//! seen repeatedly across scam-site templates, matched by state and a
//! substring of the target URL. Unlike the LLM-driven tiers, a playbook
//! only fires when a site is already known to use one of these templates;
//! anything else falls through to the normal cascade.

use crate::models::{Playbook, PlaybookStep, PlaybookStepType};

/// Returns the built-in playbook catalog. Empty for now beyond the one
/// reference template below — new entries are added as known site
/// templates are catalogued, the same way `ssi-patterns` grows its regex
/// sets from observed samples rather than up front.
pub fn builtin_playbooks() -> Vec<Playbook> {
    vec![Playbook {
        playbook_id: "generic-register-form-v1".to_string(),
        site_pattern: String::new(),
        state: "FILL_REGISTER".to_string(),
        max_duration_sec: 30,
        fallback_to_llm: true,
        steps: vec![
            PlaybookStep {
                action: PlaybookStepType::Type,
                selector: "input[name='email'], input[type='email']".to_string(),
                value: "{identity.email}".to_string(),
                retry_on_failure: 1,
                fallback_to_llm: true,
            },
            PlaybookStep {
                action: PlaybookStepType::Type,
                selector: "input[name='password'], input[type='password']".to_string(),
                value: "{password_variants.default}".to_string(),
                retry_on_failure: 1,
                fallback_to_llm: true,
            },
        ],
    }]
}

/// Finds the first built-in playbook whose `state` matches `state` and
/// whose `site_pattern` is empty or a substring of `url`.
pub fn match_playbook<'a>(playbooks: &'a [Playbook], state: &str, url: &str) -> Option<&'a Playbook> {
    playbooks.iter().find(|p| p.state == state && (p.site_pattern.is_empty() || url.contains(&p.site_pattern)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_state_with_empty_site_pattern() {
        let playbooks = builtin_playbooks();
        let found = match_playbook(&playbooks, "FILL_REGISTER", "https://anything.example");
        assert!(found.is_some());
    }

    #[test]
    fn no_match_for_unrelated_state() {
        let playbooks = builtin_playbooks();
        let found = match_playbook(&playbooks, "EXTRACT_WALLETS", "https://anything.example");
        assert!(found.is_none());
    }
}
