//! DNS adapter: resolves A, AAAA, MX, TXT, NS, and CNAME records for the
//! target domain.

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use ssi_common::{DnsResult, SsiError};
use std::time::Duration;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

pub struct DnsAdapter {
    resolver: TokioAsyncResolver,
}

impl DnsAdapter {
    pub fn new() -> Result<Self, SsiError> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self { resolver })
    }
}

#[async_trait]
impl OsintAdapter for DnsAdapter {
    type Output = DnsResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<DnsResult, SsiError> {
        let host = super::geoip::strip_to_host(domain_or_url);

        with_deadline(deadline, async move {
            let mut result = DnsResult::default();

            if let Ok(lookup) = self.resolver.ipv4_lookup(host.as_str()).await {
                result.a = lookup.iter().map(|r| r.to_string()).collect();
            }
            if let Ok(lookup) = self.resolver.ipv6_lookup(host.as_str()).await {
                result.aaaa = lookup.iter().map(|r| r.to_string()).collect();
            }
            if let Ok(lookup) = self.resolver.mx_lookup(host.as_str()).await {
                result.mx = lookup.iter().map(|r| r.exchange().to_string()).collect();
            }
            if let Ok(lookup) = self.resolver.txt_lookup(host.as_str()).await {
                result.txt = lookup
                    .iter()
                    .map(|r| r.iter().map(|b| String::from_utf8_lossy(b).to_string()).collect::<Vec<_>>().join(""))
                    .collect();
            }
            if let Ok(lookup) = self.resolver.ns_lookup(host.as_str()).await {
                result.ns = lookup.iter().map(|r| r.to_string()).collect();
            }
            if let Ok(lookup) = self.resolver.lookup(host.as_str(), trust_dns_resolver::proto::rr::RecordType::CNAME).await {
                result.cname = lookup.iter().filter_map(|r| r.as_cname().map(|n| n.to_string())).collect();
            }

            if result.a.is_empty()
                && result.aaaa.is_empty()
                && result.mx.is_empty()
                && result.txt.is_empty()
                && result.ns.is_empty()
                && result.cname.is_empty()
            {
                return Err(SsiError::Osint(format!("no dns records resolved for {host}")));
            }

            Ok(result)
        })
        .await
    }
}
