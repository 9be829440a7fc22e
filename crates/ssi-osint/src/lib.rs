//! OSINT adapters (C4): a uniform `lookup(domain_or_url, deadline)` surface
//! over WHOIS/RDAP, DNS, TLS certificates, GeoIP/ASN, VirusTotal, and
//! urlscan. Every adapter is independently cancellable; failures are soft —
//! callers turn an `Err` into an investigation warning and carry on
//! so adapters themselves never retry or escalate.
//!
//! Grounded on `crates/analyzer-groq/src/lib.rs`'s `reqwest::Client`-based
//! external-call idiom, generalized to a shared trait and a per-call
//! deadline instead of a single hardcoded endpoint.

pub mod dns;
pub mod geoip;
pub mod tls;
pub mod urlscan;
pub mod virustotal;
pub mod whois;

use async_trait::async_trait;
use ssi_common::SsiError;
use std::time::Duration;

pub use dns::DnsAdapter;
pub use geoip::GeoIpAdapter;
pub use tls::TlsAdapter;
pub use urlscan::UrlscanAdapter;
pub use virustotal::VirusTotalAdapter;
pub use whois::WhoisAdapter;

/// Common shape for every OSINT signal: independently cancellable,
/// deadline-bound, soft-failing.
#[async_trait]
pub trait OsintAdapter: Send + Sync {
    type Output;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<Self::Output, SsiError>;
}

pub(crate) async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, SsiError>
where
    F: std::future::Future<Output = Result<T, SsiError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(SsiError::Osint("adapter call exceeded its deadline".into())),
    }
}
