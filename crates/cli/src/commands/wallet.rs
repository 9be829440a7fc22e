//! `wallet validate|scan|allowlist|export|patterns`.
//!
//! Export's CSV column order and semantics are grounded on
//! `original_source/src/ssi/wallet/export.py`'s `WalletExporter`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use ssi_common::WalletEntry;
use ssi_wallet::{wallet_patterns, AllowlistFilter};

use crate::cli::{ExportFormat, WalletCommand};

const CSV_HEADERS: [&str; 10] = [
    "site_url",
    "token_name",
    "token_symbol",
    "network",
    "network_short",
    "wallet_address",
    "timestamp",
    "run_id",
    "source",
    "confidence",
];

pub fn run(cmd: WalletCommand) -> Result<i32> {
    match cmd {
        WalletCommand::Validate { address } => match ssi_wallet::validate(&address) {
            Some(m) => {
                println!("valid: {} ({}, {})", m.address, m.pattern_name, m.symbol);
                Ok(0)
            }
            None => {
                println!("invalid: no known chain pattern matched '{address}'");
                Ok(1)
            }
        },

        WalletCommand::Scan { file, quiet } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let matches = ssi_wallet::scan_text(&text);
            if matches.is_empty() {
                if !quiet {
                    println!("no wallet addresses found");
                }
                return Ok(0);
            }
            for m in &matches {
                if quiet {
                    println!("{}", m.address);
                } else {
                    println!("{}  {}  {}", m.address, m.symbol, m.pattern_name);
                }
            }
            Ok(0)
        }

        WalletCommand::Allowlist { file, symbol } => {
            let filter = match &file {
                Some(path) => AllowlistFilter::from_json_file(path),
                None => AllowlistFilter::default_filter(),
            };
            for (name, short) in filter.allowed_pairs() {
                if let Some(sym) = &symbol {
                    if !filter.networks_for_symbol(sym).iter().any(|n| &n.network == name && &n.network_short == short) {
                        continue;
                    }
                }
                println!("{name}  ({short})");
            }
            println!("-- {} entries", filter.count());
            Ok(0)
        }

        WalletCommand::Export { input, format, output, apply_filter } => export(&input, format, output.as_ref(), apply_filter),

        WalletCommand::Patterns => {
            for p in wallet_patterns() {
                println!("{:<22} {:<6} {}", p.name, p.symbol, p.example);
            }
            Ok(0)
        }
    }
}

fn export(input: &PathBuf, format: ExportFormat, output: Option<&PathBuf>, apply_filter: bool) -> Result<i32> {
    let contents = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let entries: Vec<WalletEntry> = serde_json::from_str(&contents).context("parsing wallet entries JSON")?;

    let (to_export, discarded) = if apply_filter {
        AllowlistFilter::default_filter().filter(entries)
    } else {
        (entries, Vec::new())
    };

    match format {
        ExportFormat::Xlsx => {
            bail!("xlsx export is not available in this build; use --format csv or --format json");
        }
        ExportFormat::Json => {
            let rendered = serde_json::to_string_pretty(&to_export)?;
            write_output(output, &rendered)?;
        }
        ExportFormat::Csv => {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
            writer.write_record(CSV_HEADERS)?;
            for entry in &to_export {
                writer.write_record([
                    entry.source_url.clone(),
                    entry.token_name.clone(),
                    entry.token_symbol.clone(),
                    entry.network.clone(),
                    entry.network_short.clone(),
                    entry.wallet_address.clone(),
                    entry.timestamp.to_rfc3339(),
                    entry.run_id.clone().unwrap_or_default(),
                    format!("{:?}", entry.source),
                    entry.confidence.to_string(),
                ])?;
            }
            let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("failed to finalize csv: {e}"))?;
            write_output(output, &String::from_utf8(bytes)?)?;
        }
    }

    eprintln!("exported {} entries ({} discarded by allowlist)", to_export.len(), discarded.len());
    Ok(0)
}

fn write_output(output: Option<&PathBuf>, rendered: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
