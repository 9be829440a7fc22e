//! `investigate url|batch|list|show`.
//!
//! Grounded on `crates/api/src/main.rs`'s `process_logs` orchestration
//! shape, reused here for a CLI entry point instead of an HTTP handler.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use ssi_common::config::Settings;
use ssi_common::ScanMode;
use ssi_orchestrator::PipelineDeps;
use ssi_store::ScanStore;

use crate::cli::{BatchFormat, InvestigateCommand, ReportFormat};

async fn build_deps(settings: Arc<Settings>, case_id: Option<String>) -> Result<PipelineDeps> {
    let store = Arc::new(ScanStore::connect(&settings.store).await.context("connecting to scan store")?);
    let webdriver_url = std::env::var("SSI_WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:4444".to_string());
    Ok(PipelineDeps {
        settings,
        store: Some(store),
        webdriver_url,
        http_client: reqwest::Client::new(),
        case_id,
    })
}

fn warn_unwired_skip_flags(skip_whois: bool, skip_screenshot: bool, skip_virustotal: bool, skip_urlscan: bool) {
    if skip_whois || skip_screenshot || skip_virustotal || skip_urlscan {
        tracing::warn!(
            "per-adapter --skip-* flags are accepted for interface parity but the pipeline runs all configured OSINT adapters; disable individual adapters via their Settings fields instead"
        );
    }
}

pub async fn run(cmd: InvestigateCommand, settings: Arc<Settings>) -> Result<i32> {
    match cmd {
        InvestigateCommand::Url {
            url,
            output,
            passive,
            skip_whois,
            skip_screenshot,
            skip_virustotal,
            skip_urlscan,
            format,
            push_to_core,
            trigger_dossier,
        } => {
            warn_unwired_skip_flags(skip_whois, skip_screenshot, skip_virustotal, skip_urlscan);
            if push_to_core || trigger_dossier {
                tracing::warn!("--push-to-core/--trigger-dossier are accepted for interface parity; no downstream core/dossier integration is configured in this workspace");
            }
            if let Some(dir) = &output {
                std::env::set_var("SSI_EVIDENCE__OUTPUT_DIR", dir);
            }

            let deps = build_deps(settings, None).await?;
            let mode = if passive { ScanMode::Passive } else { ScanMode::Full };
            let investigation = ssi_orchestrator::run_investigation(&deps, &url, mode, CancellationToken::new()).await?;

            match format {
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&investigation)?),
                ReportFormat::Markdown | ReportFormat::Both => {
                    print_markdown_summary(&investigation);
                    if format == ReportFormat::Both {
                        println!("\n{}", serde_json::to_string_pretty(&investigation)?);
                    }
                }
            }

            Ok(if investigation.status == ssi_common::InvestigationStatus::Failed { 1 } else { 0 })
        }

        InvestigateCommand::Batch { file, format, concurrency, resume, events } => {
            let urls = read_batch_file(&file, &format)?;
            if urls.is_empty() {
                bail!("batch file contained no URLs");
            }

            let deps = Arc::new(build_deps(settings, None).await?);
            let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
            let mut tasks = Vec::with_capacity(urls.len());

            for url in urls {
                if resume && already_completed(&deps, &url).await {
                    if events {
                        println!("skip (resume): {url}");
                    }
                    continue;
                }
                let deps = deps.clone();
                let semaphore = semaphore.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    if events {
                        println!("start: {url}");
                    }
                    let result = ssi_orchestrator::run_investigation(&deps, &url, ScanMode::Full, CancellationToken::new()).await;
                    if events {
                        match &result {
                            Ok(inv) => println!("done: {url} -> {:?}", inv.status),
                            Err(e) => println!("error: {url} -> {e}"),
                        }
                    }
                    result
                }));
            }

            let mut any_failed = false;
            for task in tasks {
                match task.await {
                    Ok(Ok(inv)) if inv.status != ssi_common::InvestigationStatus::Failed => {}
                    _ => any_failed = true,
                }
            }

            Ok(if any_failed { 1 } else { 0 })
        }

        InvestigateCommand::List { domain, status, limit, json } => {
            let store = ScanStore::connect(&settings.store).await.context("connecting to scan store")?;
            let scans = store.list_scans(domain.as_deref(), status.as_deref(), limit, 0).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scans)?);
            } else {
                for scan in &scans {
                    println!("{:<36}  {:<40}  {:<10}", scan.scan_id, scan.url, scan.status);
                }
            }
            Ok(0)
        }

        InvestigateCommand::Show { id_prefix, wallets, json } => {
            let store = ScanStore::connect(&settings.store).await.context("connecting to scan store")?;
            let matches = store.list_scans(None, None, 1000, 0).await?;
            let Some(scan) = matches.into_iter().find(|s| s.scan_id.starts_with(&id_prefix)) else {
                bail!("no investigation found with id prefix '{id_prefix}'");
            };

            if wallets {
                let wallet_records = store.get_wallets(&scan.scan_id).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&wallet_records)?);
                } else {
                    for w in &wallet_records {
                        println!("{}  {}  {}", w.wallet_address, w.token_symbol.as_deref().unwrap_or("-"), w.confidence);
                    }
                }
            } else if json {
                println!("{}", serde_json::to_string_pretty(&scan)?);
            } else {
                println!("{scan:#?}");
            }
            Ok(0)
        }
    }
}

fn print_markdown_summary(investigation: &ssi_common::Investigation) {
    println!("# Investigation: {}", investigation.url);
    println!("- id: {}", investigation.id);
    println!("- status: {:?}", investigation.status);
    println!("- wallets found: {}", investigation.wallets.len());
    if let Some(taxonomy) = &investigation.taxonomy {
        println!("- risk score: {:.2}", taxonomy.risk_score);
    }
    for warning in &investigation.warnings {
        println!("- warning: {warning}");
    }
}

async fn already_completed(deps: &PipelineDeps, url: &str) -> bool {
    let Some(store) = &deps.store else { return false };
    match store.list_scans(None, Some("completed"), 500, 0).await {
        Ok(scans) => scans.iter().any(|s| s.url == url),
        Err(_) => false,
    }
}

fn read_batch_file(path: &PathBuf, format: &BatchFormat) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading batch file {}", path.display()))?;
    match format {
        BatchFormat::Text => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()),
        BatchFormat::Json => {
            #[derive(serde::Deserialize)]
            struct BatchEntry {
                url: String,
            }
            let entries: Vec<BatchEntry> = serde_json::from_str(&contents).context("parsing batch JSON")?;
            Ok(entries.into_iter().map(|e| e.url).collect())
        }
    }
}
