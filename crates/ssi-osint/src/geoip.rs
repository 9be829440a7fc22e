//! GeoIP/ASN adapter: resolves the target's IP and looks it up against an
//! on-disk MaxMind GeoLite2 database.

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use maxminddb::{geoip2, Reader};
use serde::Deserialize;
use ssi_common::{GeoIpResult, SsiError};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Strips a scheme/path/port from a URL-or-bare-domain string, returning a
/// bare hostname suitable for DNS/RDAP/GeoIP lookups.
pub(crate) fn strip_to_host(domain_or_url: &str) -> String {
    let without_scheme = domain_or_url.splitn(2, "://").nth(1).unwrap_or(domain_or_url);
    let host = without_scheme.splitn(2, '/').next().unwrap_or(without_scheme);
    host.split(':').next().unwrap_or(host).to_string()
}

#[derive(Debug, Deserialize)]
struct AsnRecord {
    autonomous_system_number: Option<u32>,
    autonomous_system_organization: Option<String>,
}

pub struct GeoIpAdapter {
    city_db_path: PathBuf,
    asn_db_path: Option<PathBuf>,
}

impl GeoIpAdapter {
    pub fn new(city_db_path: PathBuf, asn_db_path: Option<PathBuf>) -> Self {
        Self { city_db_path, asn_db_path }
    }

    async fn resolve_ip(&self, host: &str) -> Result<IpAddr, SsiError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let mut addrs = tokio::net::lookup_host((host, 443))
            .await
            .map_err(|e| SsiError::Osint(format!("dns resolution for geoip failed: {e}")))?;
        addrs
            .next()
            .map(|sa| sa.ip())
            .ok_or_else(|| SsiError::Osint("no addresses resolved for geoip lookup".into()))
    }
}

#[async_trait]
impl OsintAdapter for GeoIpAdapter {
    type Output = GeoIpResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<GeoIpResult, SsiError> {
        let host = strip_to_host(domain_or_url);

        with_deadline(deadline, async move {
            let ip = self.resolve_ip(&host).await?;

            let city_reader = Reader::open_readfile(&self.city_db_path)
                .map_err(|e| SsiError::Osint(format!("geoip city db open failed: {e}")))?;
            let city: geoip2::City = city_reader
                .lookup(ip)
                .map_err(|e| SsiError::Osint(format!("geoip city lookup failed: {e}")))?;

            let country = city
                .country
                .as_ref()
                .and_then(|c| c.names.as_ref())
                .and_then(|n| n.get("en"))
                .map(|s| s.to_string());
            let city_name = city
                .city
                .as_ref()
                .and_then(|c| c.names.as_ref())
                .and_then(|n| n.get("en"))
                .map(|s| s.to_string());

            let mut asn = None;
            let mut org = None;
            if let Some(asn_path) = &self.asn_db_path {
                if let Ok(asn_reader) = Reader::open_readfile(asn_path) {
                    if let Ok(record) = asn_reader.lookup::<AsnRecord>(ip) {
                        asn = record.autonomous_system_number;
                        org = record.autonomous_system_organization;
                    }
                }
            }

            Ok(GeoIpResult {
                ip: ip.to_string(),
                country,
                city: city_name,
                asn,
                org,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_path_and_port() {
        assert_eq!(strip_to_host("https://evil.test:8443/login"), "evil.test");
        assert_eq!(strip_to_host("evil.test"), "evil.test");
        assert_eq!(strip_to_host("http://evil.test/"), "evil.test");
    }
}
