//! Table definitions for the four scan-store tables, kept as plain SQL so a
//! single statement set works against both backends wired into [`AnyPool`]
//! (sqlite for local runs, a MySQL-compatible remote for `cloudsql`).
//!
//! Mirrors `site_scans` / `harvested_wallets` / `agent_sessions` /
//! `pii_exposures` one-for-one, dropping the `Numeric` precision the original
//! schema used (neither backend wired here needs it) in favour of `REAL`.

use sqlx::any::AnyPool;

use ssi_common::SsiError;

const SITE_SCANS: &str = "
CREATE TABLE IF NOT EXISTS site_scans (
    scan_id TEXT PRIMARY KEY,
    case_id TEXT,
    url TEXT NOT NULL,
    domain TEXT,
    scan_type TEXT NOT NULL DEFAULT 'passive',
    status TEXT NOT NULL DEFAULT 'pending',
    passive_result TEXT,
    active_result TEXT,
    classification_result TEXT,
    risk_score REAL,
    taxonomy_version TEXT,
    wallet_count INTEGER NOT NULL DEFAULT 0,
    total_cost_usd REAL,
    llm_input_tokens INTEGER NOT NULL DEFAULT 0,
    llm_output_tokens INTEGER NOT NULL DEFAULT 0,
    duration_seconds REAL,
    error_message TEXT,
    evidence_path TEXT,
    evidence_zip_sha256 TEXT,
    metadata TEXT,
    started_at TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const HARVESTED_WALLETS: &str = "
CREATE TABLE IF NOT EXISTS harvested_wallets (
    wallet_id TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL,
    case_id TEXT,
    token_label TEXT,
    token_symbol TEXT,
    network_label TEXT,
    network_short TEXT,
    wallet_address TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT 'js',
    confidence REAL NOT NULL DEFAULT 0,
    site_url TEXT,
    metadata TEXT,
    harvested_at TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(scan_id, token_symbol, network_short, wallet_address)
)";

const AGENT_SESSIONS: &str = "
CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL,
    state TEXT,
    action_type TEXT,
    action_detail TEXT,
    screenshot_path TEXT,
    page_url TEXT,
    dom_confidence REAL,
    llm_model TEXT,
    llm_input_tokens INTEGER,
    llm_output_tokens INTEGER,
    cost_usd REAL,
    duration_ms INTEGER,
    error TEXT,
    sequence INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    created_at TEXT NOT NULL
)";

const PII_EXPOSURES: &str = "
CREATE TABLE IF NOT EXISTS pii_exposures (
    exposure_id TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL,
    case_id TEXT,
    field_type TEXT,
    field_label TEXT,
    form_action TEXT,
    page_url TEXT,
    is_required INTEGER,
    was_submitted INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    detected_at TEXT,
    created_at TEXT NOT NULL
)";

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_site_scans_case_id ON site_scans(case_id)",
    "CREATE INDEX IF NOT EXISTS idx_site_scans_domain ON site_scans(domain)",
    "CREATE INDEX IF NOT EXISTS idx_site_scans_status ON site_scans(status)",
    "CREATE INDEX IF NOT EXISTS idx_site_scans_created_at ON site_scans(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_site_scans_risk_score ON site_scans(risk_score)",
    "CREATE INDEX IF NOT EXISTS idx_harvested_wallets_scan_id ON harvested_wallets(scan_id)",
    "CREATE INDEX IF NOT EXISTS idx_harvested_wallets_address ON harvested_wallets(wallet_address)",
    "CREATE INDEX IF NOT EXISTS idx_harvested_wallets_symbol ON harvested_wallets(token_symbol)",
    "CREATE INDEX IF NOT EXISTS idx_harvested_wallets_created_at ON harvested_wallets(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_agent_sessions_scan_sequence ON agent_sessions(scan_id, sequence)",
    "CREATE INDEX IF NOT EXISTS idx_agent_sessions_state ON agent_sessions(state)",
    "CREATE INDEX IF NOT EXISTS idx_pii_exposures_scan_id ON pii_exposures(scan_id)",
    "CREATE INDEX IF NOT EXISTS idx_pii_exposures_case_id ON pii_exposures(case_id)",
    "CREATE INDEX IF NOT EXISTS idx_pii_exposures_field_type ON pii_exposures(field_type)",
];

/// Creates all four tables and their indexes if they don't already exist,
/// matching `METADATA.create_all()`'s idempotent bootstrap.
pub async fn create_all(pool: &AnyPool) -> Result<(), SsiError> {
    for statement in [SITE_SCANS, HARVESTED_WALLETS, AGENT_SESSIONS, PII_EXPOSURES] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| SsiError::Store(format!("failed to create table: {e}")))?;
    }
    for statement in INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| SsiError::Store(format!("failed to create index: {e}")))?;
    }
    Ok(())
}
