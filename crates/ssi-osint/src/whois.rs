//! WHOIS/RDAP adapter. RDAP (RFC 7482) is plain JSON over HTTPS, so it
//! reuses the same `reqwest::Client` idiom as the rest of the adapter set
//! instead of a raw WHOIS (port 43) text client.

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use ssi_common::{SsiError, WhoisResult};
use std::time::Duration;

const RDAP_BOOTSTRAP: &str = "https://rdap.org/domain";

pub struct WhoisAdapter {
    client: Client,
}

impl WhoisAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    event_action: String,
    #[serde(rename = "eventDate")]
    event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    roles: Option<Vec<String>>,
    #[serde(rename = "vcardArray")]
    vcard_array: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RdapResponse {
    #[serde(default)]
    events: Vec<RdapEvent>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
    #[serde(default)]
    nameservers: Vec<RdapNameserver>,
}

#[derive(Debug, Deserialize)]
struct RdapNameserver {
    #[serde(rename = "ldhName")]
    ldh_name: Option<String>,
}

fn vcard_fn_value(vcard: &serde_json::Value) -> Option<String> {
    // vcardArray looks like ["vcard", [["version", {}, "text", "4.0"], ["fn", {}, "text", "Example Org"], ...]]
    let entries = vcard.get(1)?.as_array()?;
    entries.iter().find_map(|entry| {
        let entry = entry.as_array()?;
        if entry.first()?.as_str()? == "fn" {
            entry.get(3)?.as_str().map(|s| s.to_string())
        } else {
            None
        }
    })
}

fn entity_org(entities: &[RdapEntity], role: &str) -> Option<String> {
    entities
        .iter()
        .find(|e| e.roles.as_deref().unwrap_or_default().iter().any(|r| r == role))
        .and_then(|e| e.vcard_array.as_ref())
        .and_then(vcard_fn_value)
}

impl RdapResponse {
    fn into_whois_result(self, raw: String) -> WhoisResult {
        let created_at = self
            .events
            .iter()
            .find(|e| e.event_action == "registration")
            .and_then(|e| e.event_date);
        let expires_at = self
            .events
            .iter()
            .find(|e| e.event_action == "expiration")
            .and_then(|e| e.event_date);

        WhoisResult {
            registrar: entity_org(&self.entities, "registrar"),
            created_at,
            expires_at,
            registrant_org: entity_org(&self.entities, "registrant"),
            name_servers: self.nameservers.into_iter().filter_map(|ns| ns.ldh_name).collect(),
            raw: Some(raw),
        }
    }
}

#[async_trait]
impl OsintAdapter for WhoisAdapter {
    type Output = WhoisResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<WhoisResult, SsiError> {
        let domain = super::geoip::strip_to_host(domain_or_url);
        let client = self.client.clone();
        let url = format!("{RDAP_BOOTSTRAP}/{domain}");

        with_deadline(deadline, async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| SsiError::Osint(format!("rdap request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(SsiError::Osint(format!("rdap returned {}", response.status())));
            }

            let raw = response
                .text()
                .await
                .map_err(|e| SsiError::Osint(format!("rdap body read failed: {e}")))?;

            let parsed: RdapResponse =
                serde_json::from_str(&raw).map_err(|e| SsiError::Osint(format!("rdap parse failed: {e}")))?;

            Ok(parsed.into_whois_result(raw))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcard_fn_extraction() {
        let vcard = serde_json::json!(["vcard", [["version", {}, "text", "4.0"], ["fn", {}, "text", "Example Registrar"]]]);
        assert_eq!(vcard_fn_value(&vcard), Some("Example Registrar".to_string()));
    }

    #[test]
    fn rdap_response_maps_events_and_entities() {
        let body = serde_json::json!({
            "events": [
                {"eventAction": "registration", "eventDate": "2020-01-01T00:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2030-01-01T00:00:00Z"}
            ],
            "entities": [
                {"roles": ["registrar"], "vcardArray": ["vcard", [["fn", {}, "text", "NameCheap"]]]}
            ],
            "nameservers": [{"ldhName": "ns1.example.test"}]
        });
        let parsed: RdapResponse = serde_json::from_value(body).unwrap();
        let result = parsed.into_whois_result("{}".into());
        assert_eq!(result.registrar, Some("NameCheap".to_string()));
        assert_eq!(result.name_servers, vec!["ns1.example.test".to_string()]);
        assert!(result.created_at.is_some());
        assert!(result.expires_at.is_some());
    }
}
