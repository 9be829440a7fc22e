//! The per-URL investigation pipeline (C14): pre-flight, passive recon,
//! active interaction, classification, evidence, persistence, and
//! finalisation. Grounded on `crates/api/src/main.rs`'s handler — build
//! every input up front, call into each subsystem in turn, and fold
//! failures into the response rather than aborting — generalised from one
//! HTTP request into a multi-phase investigation with its own cost and
//! cancellation budget.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ssi_agent::{AgentController, GuidanceHandler};
use ssi_browser::stealth::{build_browser_profile, ProfileOptions};
use ssi_browser::BrowserSession;
use ssi_common::config::Settings;
use ssi_common::{Investigation, InvestigationStatus, ScanMode, SsiError, WalletEntry, WalletSource};
use ssi_events::EventBus;
use ssi_llm::factory::{build_provider, LlmRole};
use ssi_osint::{
    DnsAdapter, GeoIpAdapter, OsintAdapter, TlsAdapter, UrlscanAdapter, VirusTotalAdapter, WhoisAdapter,
};
use ssi_store::ScanStore;
use ssi_wallet::{AllowlistFilter, WalletHarvest};

use crate::bridge::{EventBusGuidance, EventBusSink};
use crate::{classification, snapshot};

const OSINT_DEADLINE: Duration = Duration::from_secs(20);

/// The subsystem handles an investigation run needs, bundled so
/// [`run_investigation`] doesn't take a dozen positional arguments.
/// Constructed once per process and shared across every URL investigated.
pub struct PipelineDeps {
    pub settings: Arc<Settings>,
    pub store: Option<Arc<ScanStore>>,
    pub webdriver_url: String,
    pub http_client: reqwest::Client,
    pub case_id: Option<String>,
}

/// Drives one URL through the full investigation pipeline and returns the
/// finished [`Investigation`]. Soft-failing throughout: a single adapter,
/// the agent, or classification failing appends a warning and the
/// pipeline continues with whatever evidence it already has. Only a
/// cancellation or a hard I/O error on the output directory itself aborts
/// early.
pub async fn run_investigation(
    deps: &PipelineDeps,
    url: &str,
    mode: ScanMode,
    cancel: CancellationToken,
) -> Result<Investigation, SsiError> {
    let mut investigation = Investigation::new(url, mode);
    let domain = strip_to_host(url);
    let slug = slugify(&domain);
    let short_id = investigation.id.to_string().chars().take(8).collect::<String>();
    let output_dir = PathBuf::from(&deps.settings.evidence.output_dir).join(format!("{slug}-{short_id}"));
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| SsiError::Evidence(format!("failed to create output directory: {e}")))?;
    investigation.output_dir = Some(output_dir.display().to_string());

    let scan_id = match &deps.store {
        Some(store) => match store
            .create_scan(url, Some(scan_type_str(mode)), Some(&domain), deps.case_id.as_deref(), None)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                investigation.warn(format!("failed to register scan record: {e}"));
                None
            }
        },
        None => None,
    };

    let bus = Arc::new(EventBus::new(investigation.id.to_string()));

    if cancel.is_cancelled() {
        investigation.finalize(InvestigationStatus::Cancelled);
        return Ok(investigation);
    }

    // Phase 1: pre-flight DNS gate. An NXDOMAIN (empty resolution) means
    // there's nothing further to inspect; record it and skip straight to
    // classification with whatever is already known.
    let dns_adapter = DnsAdapter::new()?;
    let dns_resolves = match dns_adapter.lookup(&domain, OSINT_DEADLINE).await {
        Ok(dns) => {
            investigation.dns = Some(dns);
            true
        }
        Err(e) => {
            investigation.warn(format!("DNS resolution failed, site may be unreachable: {e}"));
            false
        }
    };

    // Phase 2: passive recon, always attempted while DNS resolved.
    if dns_resolves && !cancel.is_cancelled() {
        run_passive_recon(deps, &mut investigation, url, &domain, &output_dir).await;
    }

    // Phase 3: active interaction, in active/full mode only.
    if dns_resolves && matches!(mode, ScanMode::Active | ScanMode::Full) && !cancel.is_cancelled() {
        run_active_interaction(deps, &mut investigation, url, &bus).await;
    }

    // Phase 4: classification.
    if !cancel.is_cancelled() {
        let llm = build_provider(&deps.settings.llm, LlmRole::Primary);
        let taxonomy = classification::classify_or_fallback(llm, &mut investigation).await;
        investigation.cost_summary.record_llm_cost(0.0);
        investigation.taxonomy = Some(taxonomy);
    }

    // Phase 5: evidence packaging.
    if let Err(e) = write_wallet_manifest(&investigation, &output_dir) {
        investigation.warn(format!("wallet manifest write failed: {e}"));
    }
    match ssi_evidence::package_investigation(&mut investigation, &output_dir) {
        Ok(custody) => investigation.chain_of_custody = Some(custody),
        Err(e) => investigation.warn(format!("evidence packaging failed: {e}")),
    }

    // Phase 7 status determination happens before phase 6 persistence so
    // the stored record reflects the final status.
    let status = if cancel.is_cancelled() {
        InvestigationStatus::Cancelled
    } else if dns_resolves {
        InvestigationStatus::Completed
    } else {
        InvestigationStatus::Failed
    };
    investigation.finalize(status);

    // Phase 6: persistence.
    if let (Some(store), Some(scan_id)) = (&deps.store, &scan_id) {
        if let Err(e) = store.persist_investigation(scan_id, &investigation).await {
            investigation.warn(format!("failed to persist investigation: {e}"));
        }
    }

    bus.emit(ssi_events::EventType::SiteCompleted, serde_json::json!({"status": format!("{:?}", investigation.status)})).await;

    Ok(investigation)
}

async fn run_passive_recon(
    deps: &PipelineDeps,
    investigation: &mut Investigation,
    url: &str,
    domain: &str,
    output_dir: &std::path::Path,
) {
    let whois = WhoisAdapter::new(deps.http_client.clone());
    match whois.lookup(domain, OSINT_DEADLINE).await {
        Ok(result) => investigation.whois = Some(result),
        Err(e) => investigation.warn(format!("whois lookup failed: {e}")),
    }

    let tls = TlsAdapter::default();
    match tls.lookup(domain, OSINT_DEADLINE).await {
        Ok(result) => investigation.tls = Some(result),
        Err(e) => investigation.warn(format!("tls inspection failed: {e}")),
    }

    let city_db = std::env::var("SSI_OSINT__GEOIP_CITY_DB").unwrap_or_else(|_| "GeoLite2-City.mmdb".to_string());
    if std::path::Path::new(&city_db).exists() {
        let asn_db = std::env::var("SSI_OSINT__GEOIP_ASN_DB").ok().map(PathBuf::from).filter(|p| p.exists());
        let geoip = GeoIpAdapter::new(PathBuf::from(&city_db), asn_db);
        match geoip.lookup(domain, OSINT_DEADLINE).await {
            Ok(result) => investigation.geoip = Some(result),
            Err(e) => investigation.warn(format!("geoip lookup failed: {e}")),
        }
    } else {
        investigation.warn("geoip database not configured, skipping geoip lookup".to_string());
    }

    let vt_key = std::env::var("SSI_OSINT__VIRUSTOTAL_API_KEY").unwrap_or_default();
    let virustotal = VirusTotalAdapter::new(deps.http_client.clone(), vt_key);
    if virustotal.is_configured() {
        match virustotal.lookup(url, OSINT_DEADLINE).await {
            Ok(result) => investigation.virustotal = Some(result),
            Err(e) => investigation.warn(format!("virustotal lookup failed: {e}")),
        }
    }

    let urlscan_key = std::env::var("SSI_OSINT__URLSCAN_API_KEY").unwrap_or_default();
    let urlscan = UrlscanAdapter::new(deps.http_client.clone(), urlscan_key);
    if urlscan.is_configured() {
        match urlscan.lookup(url, OSINT_DEADLINE).await {
            Ok(result) => investigation.urlscan = Some(result),
            Err(e) => investigation.warn(format!("urlscan lookup failed: {e}")),
        }
    }

    let profile = build_browser_profile(ProfileOptions {
        proxy_pool: None,
        explicit_proxy: None,
        explicit_user_agent: deps.settings.browser.user_agent.as_deref(),
        randomize_fingerprint: deps.settings.browser.randomise_fingerprint,
    });

    match BrowserSession::launch(&deps.webdriver_url, deps.settings.browser.headless, &profile).await {
        Ok(session) => {
            match snapshot::capture(&session, url, output_dir).await {
                Ok(page_snapshot) => {
                    let wallets = ssi_wallet::scan_text(&page_snapshot.visible_text);
                    let allowlist = AllowlistFilter::default_filter();
                    let mut harvest = WalletHarvest::new(url, investigation.id.to_string());
                    for candidate in wallets {
                        if let Some(entry) = wallet_entry_from_match(&allowlist, url, &candidate) {
                            harvest.add(entry);
                        }
                    }
                    investigation.wallets.extend(harvest.entries);
                    investigation.page_snapshot = Some(page_snapshot);
                }
                Err(e) => investigation.warn(format!("passive page capture failed: {e}")),
            }
            let _ = session.close().await;
        }
        Err(e) => investigation.warn(format!("browser session launch failed for passive capture: {e}")),
    }
}

async fn run_active_interaction(deps: &PipelineDeps, investigation: &mut Investigation, url: &str, bus: &Arc<EventBus>) {
    let profile = build_browser_profile(ProfileOptions {
        proxy_pool: None,
        explicit_proxy: deps.settings.browser.proxy_urls.first().map(|s| s.as_str()),
        explicit_user_agent: deps.settings.browser.user_agent.as_deref(),
        randomize_fingerprint: deps.settings.browser.randomise_fingerprint,
    });

    let output_dir = PathBuf::from(investigation.output_dir.clone().unwrap_or_default());
    let run_id = investigation.id.to_string();
    let site_id = run_id.chars().take(8).collect::<String>();

    let guidance: Arc<dyn GuidanceHandler> = Arc::new(EventBusGuidance::new(bus.clone()));
    let events = Arc::new(EventBusSink::new(bus.clone()));

    let controller = AgentController::new(
        run_id.clone(),
        output_dir,
        deps.webdriver_url.clone(),
        profile,
        deps.settings.clone(),
        guidance,
        events,
    );

    let vision_llm = build_provider(&deps.settings.llm, LlmRole::Vision);
    let mut analyzer = ssi_analyzer::PageAnalyzer::new(vision_llm);

    let site_result = controller.process_site(url, &site_id, &mut analyzer).await;

    let mut harvest = WalletHarvest::new(url, run_id);
    for entry in site_result.wallets {
        harvest.add(entry);
    }
    harvest.deduplicate();
    investigation.wallets.extend(harvest.entries);

    investigation.cost_summary.record_llm_cost(estimate_llm_cost(site_result.input_tokens, site_result.output_tokens));

    if let Some(path) = site_result.screenshots.into_iter().next() {
        if let Some(snapshot) = &mut investigation.page_snapshot {
            snapshot.screenshot_path = Some(path);
        }
    }

    if let Some(error) = site_result.error_message {
        investigation.warn(format!("active interaction ended with error: {error}"));
    }
    if let Some(skip_reason) = site_result.skip_reason {
        investigation.warn(format!("active interaction skipped: {skip_reason}"));
    }
}

/// Rough cost model: $3/M input tokens, $15/M output tokens — in the
/// ballpark of a mid-tier hosted vision model, used only to exercise the
/// cost-budget machinery rather than to bill precisely.
fn estimate_llm_cost(input_tokens: u64, output_tokens: u64) -> f64 {
    (input_tokens as f64 / 1_000_000.0) * 3.0 + (output_tokens as f64 / 1_000_000.0) * 15.0
}

fn wallet_entry_from_match(allowlist: &AllowlistFilter, source_url: &str, candidate: &ssi_wallet::MatchResult) -> Option<WalletEntry> {
    let networks = allowlist.networks_for_symbol(candidate.symbol);
    let (token_name, network, network_short) = match networks.first() {
        Some(tn) => (tn.token_name.clone(), tn.network.clone(), tn.network_short.clone()),
        None => (candidate.pattern_name.to_string(), candidate.pattern_name.to_string(), String::new()),
    };
    WalletEntry::new(
        source_url,
        token_name,
        candidate.symbol,
        network,
        network_short,
        &candidate.address,
        WalletSource::Regex,
        0.6,
    )
    .ok()
}

fn write_wallet_manifest(investigation: &Investigation, output_dir: &std::path::Path) -> Result<(), SsiError> {
    let unique_networks: std::collections::BTreeSet<&str> =
        investigation.wallets.iter().map(|w| w.network_short.as_str()).filter(|s| !s.is_empty()).collect();
    let unique_tokens: std::collections::BTreeSet<&str> =
        investigation.wallets.iter().map(|w| w.token_symbol.as_str()).filter(|s| !s.is_empty()).collect();

    let manifest = serde_json::json!({
        "investigation_id": investigation.id,
        "target_url": investigation.url,
        "wallet_count": investigation.wallets.len(),
        "unique_networks": unique_networks,
        "unique_tokens": unique_tokens,
        "wallets": investigation.wallets,
    });

    let path = output_dir.join("wallet_manifest.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&manifest).unwrap_or_default())
        .map_err(|e| SsiError::Evidence(format!("wallet manifest write failed: {e}")))
}

fn scan_type_str(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::Passive => "passive",
        ScanMode::Active => "active",
        ScanMode::Full => "full",
    }
}

fn strip_to_host(domain_or_url: &str) -> String {
    let without_scheme = domain_or_url.splitn(2, "://").nth(1).unwrap_or(domain_or_url);
    let host = without_scheme.splitn(2, '/').next().unwrap_or(without_scheme);
    host.split(':').next().unwrap_or(host).to_string()
}

fn slugify(host: &str) -> String {
    host.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_replaces_non_alphanumeric_characters() {
        assert_eq!(slugify("evil.test"), "evil-test");
        assert_eq!(slugify("sub.evil-site.test"), "sub-evil-site-test");
    }

    #[test]
    fn strip_to_host_handles_scheme_and_path() {
        assert_eq!(strip_to_host("https://evil.test/login?x=1"), "evil.test");
        assert_eq!(strip_to_host("evil.test"), "evil.test");
    }

    #[test]
    fn estimate_llm_cost_scales_with_token_counts() {
        let cost = estimate_llm_cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 0.001);
        assert_eq!(estimate_llm_cost(0, 0), 0.0);
    }

    #[test]
    fn scan_type_str_matches_scan_mode() {
        assert_eq!(scan_type_str(ScanMode::Passive), "passive");
        assert_eq!(scan_type_str(ScanMode::Full), "full");
    }
}
