//! TLS certificate adapter: connects on port 443, fetches the leaf
//! certificate via `native-tls`, and parses subject/issuer/validity/SAN via
//! `x509-parser` (native-tls exposes only the DER bytes).

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ssi_common::{SsiError, TlsResult};
use std::time::Duration;
use x509_parser::prelude::*;

pub struct TlsAdapter;

impl Default for TlsAdapter {
    fn default() -> Self {
        Self
    }
}

fn fetch_der(host: &str) -> Result<Vec<u8>, SsiError> {
    let connector = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| SsiError::Osint(format!("tls connector build failed: {e}")))?;

    let stream = std::net::TcpStream::connect((host, 443))
        .map_err(|e| SsiError::Osint(format!("tcp connect for tls inspection failed: {e}")))?;

    let tls_stream = connector
        .connect(host, stream)
        .map_err(|e| SsiError::Osint(format!("tls handshake failed: {e}")))?;

    let cert = tls_stream
        .peer_certificate()
        .map_err(|e| SsiError::Osint(format!("peer certificate read failed: {e}")))?
        .ok_or_else(|| SsiError::Osint("server presented no certificate".into()))?;

    cert.to_der()
        .map_err(|e| SsiError::Osint(format!("certificate der encode failed: {e}")))
}

fn parse_der(der: &[u8]) -> Result<TlsResult, SsiError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| SsiError::Osint(format!("x509 parse failed: {e}")))?;

    let subject = cert.subject().to_string();
    let issuer = cert.issuer().to_string();
    let self_signed = subject == issuer;

    let valid_from = asn1_time_to_chrono(cert.validity().not_before);
    let valid_to = asn1_time_to_chrono(cert.validity().not_after);

    let san = cert
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(TlsResult {
        subject,
        issuer,
        valid_from,
        valid_to,
        san,
        self_signed,
    })
}

fn asn1_time_to_chrono(t: x509_parser::time::ASN1Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.timestamp(), 0)
}

#[async_trait]
impl OsintAdapter for TlsAdapter {
    type Output = TlsResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<TlsResult, SsiError> {
        let host = super::geoip::strip_to_host(domain_or_url);

        with_deadline(deadline, async move {
            let der = tokio::task::spawn_blocking(move || fetch_der(&host))
                .await
                .map_err(|e| SsiError::Osint(format!("tls inspection task panicked: {e}")))??;
            parse_der(&der)
        })
        .await
    }
}
