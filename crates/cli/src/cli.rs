use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scam Site Investigator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run or inspect investigations
    Investigate {
        #[command(subcommand)]
        cmd: InvestigateCommand,
    },
    /// Validate, scan, allowlist, and export wallet addresses
    Wallet {
        #[command(subcommand)]
        cmd: WalletCommand,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
    Both,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum BatchFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum InvestigateCommand {
    /// Investigate a single URL
    Url {
        /// Target URL
        url: String,

        /// Output directory for this investigation's evidence
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run passive recon only, skipping browser/agent phases
        #[arg(long)]
        passive: bool,

        #[arg(long)]
        skip_whois: bool,

        #[arg(long)]
        skip_screenshot: bool,

        #[arg(long)]
        skip_virustotal: bool,

        #[arg(long)]
        skip_urlscan: bool,

        #[arg(long, value_enum, default_value_t = ReportFormat::Both)]
        format: ReportFormat,

        /// Push the resulting indicators into the shared intel core
        #[arg(long)]
        push_to_core: bool,

        /// Trigger law-enforcement dossier generation on completion
        #[arg(long)]
        trigger_dossier: bool,
    },

    /// Investigate a batch of URLs read from a file
    Batch {
        /// Path to a text (one URL per line, '#' comments) or JSON file
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = BatchFormat::Text)]
        format: BatchFormat,

        /// Number of investigations to run concurrently
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Skip URLs that already have a completed scan record
        #[arg(long)]
        resume: bool,

        /// Print per-investigation progress events as they occur
        #[arg(long)]
        events: bool,
    },

    /// List past investigations
    List {
        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: i64,

        #[arg(long)]
        json: bool,
    },

    /// Show a single investigation by id prefix
    Show {
        id_prefix: String,

        #[arg(long)]
        wallets: bool,

        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Validate a single address against the known chain patterns
    Validate { address: String },

    /// Scan a text file for wallet addresses
    Scan {
        file: PathBuf,

        /// Only print addresses, one per line
        #[arg(long)]
        quiet: bool,
    },

    /// List or filter the allowlisted token/network pairs
    Allowlist {
        /// Allowlist JSON file; falls back to the compiled-in defaults
        #[arg(long)]
        file: Option<PathBuf>,

        /// Only show entries for this symbol
        #[arg(long)]
        symbol: Option<String>,
    },

    /// Export a wallet JSON file (an array of wallet entries) to CSV/JSON/XLSX
    Export {
        /// Input JSON file containing an array of wallet entries
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        #[arg(long)]
        output: Option<PathBuf>,

        /// Drop entries not present in the allowlist
        #[arg(long)]
        apply_filter: bool,
    },

    /// List the supported chain address patterns
    Patterns,
}
