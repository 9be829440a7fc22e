//! Static regex pattern sets, grounded on
//! `original_source/browser/har_analyzer.py`'s module-level pattern tables,
//! reworked in the teacher's `is_sql_injection`/`is_xss`-style boolean
//! helper idiom (`crates/common/src/parsers/apache.rs`).

use regex::Regex;
use std::sync::OnceLock;

const PHISHING_KIT_PATTERNS: &[&str] = &[
    r"/wp-admin/",
    r"/wp-content/plugins/.*\.php",
    r"/\.well-known/",
    r"/cgi-bin/",
    r"/webmail/",
    r"panel\.php",
    r"gate\.php",
    r"post\.php",
    r"antibot",
    r"bot_check",
    r"blocker\.php",
];

const EXFIL_PATTERNS: &[&str] = &[
    r"password|passwd|pwd",
    r"credit.?card|cc.?num",
    r"ssn|social.?security",
    r"account.?num",
    r"routing.?num",
    r"bank.?account",
];

pub const SUSPICIOUS_CONTENT_TYPES: &[&str] = &[
    "application/x-msdownload",
    "application/x-msdos-program",
    "application/x-executable",
    "application/x-dosexec",
    "application/vnd.microsoft.portable-executable",
    "application/java-archive",
    "application/x-shockwave-flash",
    "application/hta",
    "application/x-ms-shortcut",
];

fn compiled(patterns: &'static [&'static str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern must compile"))
        .collect()
}

fn phishing_kit_regexes() -> &'static Vec<Regex> {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| compiled(PHISHING_KIT_PATTERNS))
}

fn exfil_regexes() -> &'static Vec<Regex> {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| compiled(EXFIL_PATTERNS))
}

/// Returns the first matching phishing-kit pattern against `url`, if any —
/// "one match per URL is enough" (original HAR analyzer semantics).
pub fn phishing_kit_hits(url: &str) -> Option<&'static str> {
    phishing_kit_regexes()
        .iter()
        .zip(PHISHING_KIT_PATTERNS)
        .find(|(re, _)| re.is_match(url))
        .map(|(_, pattern)| *pattern)
}

/// Returns the first matching exfiltration-keyword pattern against a POST
/// body, if any.
pub fn exfiltration_hits(post_body: &str) -> Option<&'static str> {
    exfil_regexes()
        .iter()
        .zip(EXFIL_PATTERNS)
        .find(|(re, _)| re.is_match(post_body))
        .map(|(_, pattern)| *pattern)
}

pub fn is_suspicious_content_type(content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or("").trim();
    SUSPICIOUS_CONTENT_TYPES.contains(&ct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_phishing_kit_path() {
        assert_eq!(phishing_kit_hits("https://evil.test/panel.php?id=1"), Some(r"panel\.php"));
        assert!(phishing_kit_hits("https://evil.test/home").is_none());
    }

    #[test]
    fn detects_exfiltration_keyword() {
        assert!(exfiltration_hits("password=hunter2&user=bob").is_some());
        assert!(exfiltration_hits("foo=bar").is_none());
    }

    #[test]
    fn flags_suspicious_content_type() {
        assert!(is_suspicious_content_type("application/x-msdownload"));
        assert!(is_suspicious_content_type("application/x-msdownload; charset=binary"));
        assert!(!is_suspicious_content_type("image/png"));
    }
}
