//! STIX 2.1 bundle export for completed investigations, for TAXII sharing
//! or import into a threat-intel platform.

use serde_json::{json, Value};
use ssi_common::{ChainOfCustody, DownloadArtifact, IndicatorType, Investigation, ThreatIndicator, WalletEntry};
use uuid::Uuid;

// Python's `uuid.NAMESPACE_URL`.
const STIX_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0xa7, 0xb8, 0x11, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
]);

fn stix_id(stix_type: &str, seed: &str) -> String {
    let uuid = Uuid::new_v5(&STIX_NAMESPACE, format!("{stix_type}--{seed}").as_bytes());
    format!("{stix_type}--{uuid}")
}

fn now_stix() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn indicator_pattern(indicator_type: IndicatorType, value: &str) -> String {
    match indicator_type {
        IndicatorType::Ip | IndicatorType::Ipv4 => format!("[ipv4-addr:value = '{value}']"),
        IndicatorType::Ipv6 => format!("[ipv6-addr:value = '{value}']"),
        IndicatorType::Domain => format!("[domain-name:value = '{value}']"),
        IndicatorType::Email => format!("[email-addr:value = '{value}']"),
        IndicatorType::Url => format!("[url:value = '{value}']"),
        IndicatorType::CryptoWallet => format!("[cryptocurrency-wallet:address = '{value}']"),
        IndicatorType::Sha256 => format!("[file:hashes.'SHA-256' = '{value}']"),
        IndicatorType::Md5 => format!("[file:hashes.MD5 = '{value}']"),
        IndicatorType::Phone => format!("[artifact:payload_bin = '{value}']"),
    }
}

fn indicator_type_key(t: IndicatorType) -> &'static str {
    match t {
        IndicatorType::Ip => "ip",
        IndicatorType::Ipv4 => "ipv4",
        IndicatorType::Ipv6 => "ipv6",
        IndicatorType::Domain => "domain",
        IndicatorType::Email => "email",
        IndicatorType::Url => "url",
        IndicatorType::CryptoWallet => "crypto_wallet",
        IndicatorType::Sha256 => "sha256",
        IndicatorType::Md5 => "md5",
        IndicatorType::Phone => "phone",
    }
}

fn indicator_sdo(indicator: &ThreatIndicator, investigation_url: &str) -> Value {
    let now = now_stix();
    let pattern = indicator_pattern(indicator.indicator_type, &indicator.value);
    let type_key = indicator_type_key(indicator.indicator_type);
    let id = stix_id("indicator", &format!("{type_key}:{}", indicator.value));

    let description = if indicator.context.is_empty() {
        format!("IOC from SSI investigation of {investigation_url}")
    } else {
        indicator.context.clone()
    };

    json!({
        "type": "indicator",
        "spec_version": "2.1",
        "id": id,
        "created": now,
        "modified": now,
        "name": format!("{type_key}: {}", indicator.value),
        "description": description,
        "indicator_types": ["malicious-activity"],
        "pattern": pattern,
        "pattern_type": "stix",
        "valid_from": now,
        "labels": ["scam-infrastructure"],
        "external_references": [{
            "source_name": "SSI Investigation",
            "description": format!("Source: {}", indicator.source),
            "url": investigation_url,
        }],
    })
}

fn wallet_indicator_sdo(wallet: &WalletEntry, investigation_url: &str) -> Value {
    let now = now_stix();
    let pattern = format!("[cryptocurrency-wallet:address = '{}']", wallet.wallet_address);
    let id = stix_id("indicator", &format!("crypto_wallet:{}", wallet.wallet_address));
    let preview: String = wallet.wallet_address.chars().take(16).collect();

    let source = match wallet.source {
        ssi_common::WalletSource::Js => "js",
        ssi_common::WalletSource::Llm => "llm",
        ssi_common::WalletSource::Regex => "regex",
        ssi_common::WalletSource::Opportunistic => "opportunistic",
    };

    json!({
        "type": "indicator",
        "spec_version": "2.1",
        "id": id,
        "created": now,
        "modified": now,
        "name": format!("Crypto wallet: {}/{} — {}…", wallet.token_symbol, wallet.network_short, preview),
        "description": format!(
            "{} wallet on {} network extracted from {investigation_url}. Source: {source}, confidence: {:.0}%.",
            wallet.token_symbol, wallet.network_short, wallet.confidence * 100.0
        ),
        "indicator_types": ["malicious-activity"],
        "pattern": pattern,
        "pattern_type": "stix",
        "valid_from": now,
        "labels": ["scam-infrastructure", "cryptocurrency", wallet.network_short.clone()],
        "external_references": [{
            "source_name": "SSI Investigation",
            "description": format!("Extracted via {source} from scam site"),
            "url": investigation_url,
        }],
    })
}

fn infrastructure_sdo(investigation: &Investigation) -> Option<Value> {
    if investigation.url.is_empty() {
        return None;
    }
    let now = now_stix();
    let id = stix_id("infrastructure", &investigation.url);

    let mut parts = vec![format!("Scam site at {}.", investigation.url)];
    if let Some(whois) = &investigation.whois {
        if let Some(registrar) = &whois.registrar {
            parts.push(format!("Registrar: {registrar}."));
        }
    }
    if let Some(geoip) = &investigation.geoip {
        if let Some(org) = &geoip.org {
            let country = geoip.country.clone().unwrap_or_default();
            parts.push(format!("Hosted by: {org} ({country})."));
        }
    }
    if let Some(tls) = &investigation.tls {
        if !tls.issuer.is_empty() {
            parts.push(format!("SSL issuer: {}.", tls.issuer));
        }
    }
    if !investigation.wallets.is_empty() {
        parts.push(format!("Extracted {} cryptocurrency wallet address(es).", investigation.wallets.len()));
    }

    Some(json!({
        "type": "infrastructure",
        "spec_version": "2.1",
        "id": id,
        "created": now,
        "modified": now,
        "name": investigation.url,
        "description": parts.join(" "),
        "infrastructure_types": ["phishing"],
    }))
}

fn relationship_sdo(source_id: &str, target_id: &str) -> Value {
    let now = now_stix();
    let id = stix_id("relationship", &format!("{source_id}--indicates--{target_id}"));
    json!({
        "type": "relationship",
        "spec_version": "2.1",
        "id": id,
        "created": now,
        "modified": now,
        "relationship_type": "indicates",
        "source_ref": source_id,
        "target_ref": target_id,
    })
}

fn malware_sdo(download: &DownloadArtifact) -> Value {
    let now = now_stix();
    let id = stix_id("malware", &download.sha256);
    let mut hashes = serde_json::Map::new();
    hashes.insert("SHA-256".to_string(), json!(download.sha256));
    if !download.md5.is_empty() {
        hashes.insert("MD5".to_string(), json!(download.md5));
    }

    let name = if download.filename.is_empty() { "Unknown malware".to_string() } else { download.filename.clone() };

    json!({
        "type": "malware",
        "spec_version": "2.1",
        "id": id,
        "created": now,
        "modified": now,
        "name": name,
        "description": format!(
            "Malicious file downloaded from {}. VT detections: {}/{}.",
            download.origin_url, download.vt_detections, download.vt_total_engines
        ),
        "malware_types": ["trojan"],
        "is_family": false,
        "hashes": Value::Object(hashes),
    })
}

/// Converts a completed investigation into a STIX 2.1 bundle. Wallet
/// indicators are skipped when a `threat_indicators` entry already claimed
/// the same `crypto_wallet:<address>` key, so the same address is never
/// emitted twice.
pub fn investigation_to_stix_bundle(investigation: &Investigation) -> Value {
    let mut objects = Vec::new();
    let now = now_stix();

    let identity_id = stix_id("identity", "ssi-scam-site-investigator");
    objects.push(json!({
        "type": "identity",
        "spec_version": "2.1",
        "id": identity_id,
        "created": now,
        "modified": now,
        "name": "SSI (Scam Site Investigator)",
        "description": "Automated scam site investigation tool.",
        "identity_class": "organization",
    }));

    let infra = infrastructure_sdo(investigation);
    if let Some(infra) = &infra {
        objects.push(infra.clone());
    }

    let mut seen_values = std::collections::HashSet::new();
    for indicator in &investigation.threat_indicators {
        let key = format!("{}:{}", indicator_type_key(indicator.indicator_type), indicator.value);
        if !seen_values.insert(key) {
            continue;
        }
        let sdo = indicator_sdo(indicator, &investigation.url);
        let sdo_id = sdo["id"].as_str().unwrap_or_default().to_string();
        objects.push(sdo);
        if let Some(infra) = &infra {
            objects.push(relationship_sdo(&sdo_id, infra["id"].as_str().unwrap_or_default()));
        }
    }

    for download in &investigation.downloads {
        if download.is_malicious && !download.sha256.is_empty() {
            objects.push(malware_sdo(download));
        }
    }

    let mut seen_wallet_addrs = std::collections::HashSet::new();
    for wallet in &investigation.wallets {
        if !seen_wallet_addrs.insert(wallet.wallet_address.clone()) {
            continue;
        }
        let ti_key = format!("crypto_wallet:{}", wallet.wallet_address);
        if !seen_values.insert(ti_key) {
            continue;
        }
        let sdo = wallet_indicator_sdo(wallet, &investigation.url);
        let sdo_id = sdo["id"].as_str().unwrap_or_default().to_string();
        objects.push(sdo);
        if let Some(infra) = &infra {
            objects.push(relationship_sdo(&sdo_id, infra["id"].as_str().unwrap_or_default()));
        }
    }

    let bundle_id = format!("bundle--{}", Uuid::new_v5(&STIX_NAMESPACE, investigation.id.to_string().as_bytes()));
    tracing::info!(investigation_id = %investigation.id, objects = objects.len(), "built STIX bundle");

    json!({
        "type": "bundle",
        "id": bundle_id,
        "objects": objects,
    })
}

/// Summarises a `ChainOfCustody` record as a human-readable document, bundled
/// alongside the STIX export so a non-technical recipient can read it
/// without a TIP.
pub fn custody_to_text(custody: &ChainOfCustody) -> String {
    let mut doc = String::new();
    doc.push_str("CHAIN OF CUSTODY RECORD\n");
    doc.push_str("========================\n\n");
    doc.push_str(&format!("Investigation ID: {}\n", custody.investigation_id));
    doc.push_str(&format!("Target URL: {}\n", custody.target_url));
    doc.push_str(&format!("Collected At: {}\n", custody.collected_at.to_rfc3339()));
    doc.push_str(&format!("Collector: {}\n", custody.collector));
    doc.push_str(&format!("Method: {}\n", custody.method));
    doc.push_str(&format!("Hash Algorithm: {}\n\n", custody.hash_algorithm));

    doc.push_str("Artifacts:\n");
    for artifact in &custody.artifacts {
        doc.push_str(&format!(
            "  - {} ({} bytes, {}): {}\n",
            artifact.file_name, artifact.size_bytes, artifact.sha256, artifact.description
        ));
    }

    doc.push_str(&format!("\nTotal Artifacts: {}\n", custody.artifact_count));
    doc.push_str(&format!("Total Bytes: {}\n", custody.total_bytes));
    if let Some(package_hash) = &custody.package_sha256 {
        doc.push_str(&format!("Package SHA-256: {package_hash}\n"));
    }

    doc.push_str(&format!("\n{}\n", custody.legal_notice));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::{InvestigationStatus, ScanMode, WalletSource};

    fn sample_investigation() -> Investigation {
        let mut inv = Investigation::new("https://scam.example", ScanMode::Full);
        inv.finalize(InvestigationStatus::Completed);
        inv.threat_indicators.push(ThreatIndicator {
            indicator_type: IndicatorType::Domain,
            value: "scam.example".to_string(),
            context: String::new(),
            source: "osint".to_string(),
        });
        inv.wallets.push(
            WalletEntry::new("https://scam.example", "Tether", "usdt", "Tron", "trx", "TXabc123", WalletSource::Regex, 0.9).unwrap(),
        );
        inv
    }

    #[test]
    fn bundle_includes_identity_infrastructure_and_indicator() {
        let bundle = investigation_to_stix_bundle(&sample_investigation());
        let objects = bundle["objects"].as_array().unwrap();
        assert!(objects.iter().any(|o| o["type"] == "identity"));
        assert!(objects.iter().any(|o| o["type"] == "infrastructure"));
        assert!(objects.iter().any(|o| o["type"] == "indicator" && o["pattern"] == "[domain-name:value = 'scam.example']"));
    }

    #[test]
    fn wallet_indicator_deduped_against_threat_indicator_same_key() {
        let mut inv = sample_investigation();
        inv.threat_indicators.push(ThreatIndicator {
            indicator_type: IndicatorType::CryptoWallet,
            value: "TXabc123".to_string(),
            context: String::new(),
            source: "wallet-scan".to_string(),
        });
        let bundle = investigation_to_stix_bundle(&inv);
        let objects = bundle["objects"].as_array().unwrap();
        let wallet_pattern = "[cryptocurrency-wallet:address = 'TXabc123']";
        let count = objects.iter().filter(|o| o["pattern"] == wallet_pattern).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn stix_ids_are_deterministic() {
        let id1 = stix_id("indicator", "domain:scam.example");
        let id2 = stix_id("indicator", "domain:scam.example");
        assert_eq!(id1, id2);
    }

    #[test]
    fn custody_text_lists_artifacts() {
        let mut custody = ChainOfCustody::new(uuid::Uuid::new_v4(), "https://scam.example");
        custody.artifacts.push(ssi_common::CustodyArtifact {
            file_name: "evidence.json".to_string(),
            size_bytes: 128,
            sha256: "deadbeef".to_string(),
            description: "Investigation record".to_string(),
        });
        custody.artifact_count = 1;
        custody.total_bytes = 128;
        let text = custody_to_text(&custody);
        assert!(text.contains("evidence.json"));
        assert!(text.contains("deadbeef"));
    }
}
