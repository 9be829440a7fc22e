//! HAR (HTTP Archive) analyzer (C3): a pure function over HAR JSON +
//! target domain, producing a findings record. Grounded on
//! `original_source/browser/har_analyzer.py::analyze_har`.

use crate::text::{exfiltration_hits, is_suspicious_content_type, phishing_kit_hits};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssi_wallet::scan_text;
use std::collections::BTreeSet;

const MAX_RESPONSE_BYTES_SCANNED: usize = 50 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousContentType {
    pub url: String,
    pub content_type: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternHit {
    pub url: String,
    pub pattern: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoHit {
    pub symbol: String,
    pub address: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarAnalysis {
    pub total_requests: usize,
    pub third_party_domains: BTreeSet<String>,
    pub suspicious_content_types: Vec<SuspiciousContentType>,
    pub phishing_kit_indicators: Vec<PatternHit>,
    pub exfil_indicators: Vec<PatternHit>,
    pub crypto_addresses: Vec<CryptoHit>,
}

impl HarAnalysis {
    pub fn has_findings(&self) -> bool {
        !self.suspicious_content_types.is_empty()
            || !self.phishing_kit_indicators.is_empty()
            || !self.exfil_indicators.is_empty()
            || !self.crypto_addresses.is_empty()
    }
}

/// A single HAR entry's fields relevant to analysis, lifted out of the raw
/// `serde_json::Value` tree so callers that already have parsed structures
/// (e.g. from a browser driver) can call [`analyze_entries`] directly.
#[derive(Debug, Clone, Default)]
pub struct HarEntry {
    pub url: String,
    pub method: String,
    pub post_data_text: Option<String>,
    pub response_mime_type: String,
    pub response_text: Option<String>,
}

fn hostname(url: &str) -> String {
    // Minimal hostname extraction without pulling in a URL-parsing crate
    // dependency beyond what the workspace already carries.
    let without_scheme = url.splitn(2, "://").nth(1).unwrap_or(url);
    let host_and_rest = without_scheme.splitn(2, '/').next().unwrap_or("");
    host_and_rest.splitn(2, '@').last().unwrap_or("").split(':').next().unwrap_or("").to_string()
}

fn is_third_party(domain: &str, target: &str) -> bool {
    !target.is_empty() && !domain.is_empty() && domain != target && !domain.ends_with(&format!(".{target}"))
}

/// Parse a raw HAR document (`{"log": {"entries": [...]}}`) into
/// [`HarEntry`] records, tolerating missing/malformed fields.
pub fn parse_har_entries(har_json: &str) -> Vec<HarEntry> {
    let Ok(root) = serde_json::from_str::<Value>(har_json) else {
        return Vec::new();
    };
    let entries = root
        .get("log")
        .and_then(|l| l.get("entries"))
        .and_then(|e| e.as_array())
        .cloned()
        .unwrap_or_default();

    entries
        .into_iter()
        .map(|entry| {
            let request = entry.get("request").cloned().unwrap_or(Value::Null);
            let response = entry.get("response").cloned().unwrap_or(Value::Null);
            let url = request.get("url").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let method = request
                .get("method")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase();
            let post_data_text = request
                .get("postData")
                .and_then(|p| p.get("text"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let content = response.get("content").cloned().unwrap_or(Value::Null);
            let response_mime_type = content
                .get("mimeType")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let response_text = content.get("text").and_then(|v| v.as_str()).map(|s| s.to_string());
            HarEntry {
                url,
                method,
                post_data_text,
                response_mime_type,
                response_text,
            }
        })
        .collect()
}

fn is_text_like(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
        || mime_type.contains("json")
        || mime_type.contains("javascript")
        || mime_type.contains("xml")
        || mime_type.contains("html")
}

/// Analyze already-parsed HAR entries (pure, no I/O).
pub fn analyze_entries(entries: &[HarEntry], target_domain: &str) -> HarAnalysis {
    let mut analysis = HarAnalysis {
        total_requests: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        let domain = hostname(&entry.url);

        if is_third_party(&domain, target_domain) {
            analysis.third_party_domains.insert(domain.clone());
        }

        if is_suspicious_content_type(&entry.response_mime_type) {
            analysis.suspicious_content_types.push(SuspiciousContentType {
                url: entry.url.clone(),
                content_type: entry.response_mime_type.clone(),
                domain: domain.clone(),
            });
        }

        if let Some(pattern) = phishing_kit_hits(&entry.url) {
            analysis.phishing_kit_indicators.push(PatternHit {
                url: entry.url.clone(),
                pattern: pattern.to_string(),
                domain: domain.clone(),
            });
        }

        if entry.method == "POST" {
            if let Some(body) = &entry.post_data_text {
                if let Some(pattern) = exfiltration_hits(body) {
                    analysis.exfil_indicators.push(PatternHit {
                        url: entry.url.clone(),
                        pattern: pattern.to_string(),
                        domain: domain.clone(),
                    });
                }
            }
        }

        // Response bodies are only scanned for text-like MIME types,
        // capped at 50 KB per entry.
        if is_text_like(&entry.response_mime_type) {
            if let Some(text) = &entry.response_text {
                let capped = if text.len() > MAX_RESPONSE_BYTES_SCANNED {
                    &text[..MAX_RESPONSE_BYTES_SCANNED]
                } else {
                    text.as_str()
                };
                for hit in scan_text(capped).into_iter().take(3) {
                    analysis.crypto_addresses.push(CryptoHit {
                        symbol: hit.symbol.to_string(),
                        address: hit.address,
                        source_url: entry.url.clone(),
                    });
                }
            }
        }
    }

    analysis
}

/// Parse + analyze a raw HAR document in one call.
pub fn analyze_har(har_json: &str, target_domain: &str) -> HarAnalysis {
    analyze_entries(&parse_har_entries(har_json), target_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_third_party_and_phishing_and_crypto() {
        let har = r#"{
            "log": {
                "entries": [
                    {
                        "request": {"method": "GET", "url": "https://evil.test/panel.php"},
                        "response": {"content": {"mimeType": "text/html", "text": "send to 0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe"}}
                    },
                    {
                        "request": {"method": "GET", "url": "https://cdn.tracker.test/pixel.gif"},
                        "response": {"content": {"mimeType": "image/gif"}}
                    }
                ]
            }
        }"#;

        let analysis = analyze_har(har, "target.test");
        assert_eq!(analysis.total_requests, 2);
        assert!(analysis.third_party_domains.contains("evil.test"));
        assert_eq!(analysis.phishing_kit_indicators.len(), 1);
        assert_eq!(analysis.crypto_addresses.len(), 1);
        assert_eq!(analysis.crypto_addresses[0].symbol, "ETH");
    }

    #[test]
    fn malformed_har_returns_empty_analysis() {
        let analysis = analyze_har("not json", "target.test");
        assert_eq!(analysis.total_requests, 0);
        assert!(!analysis.has_findings());
    }
}
