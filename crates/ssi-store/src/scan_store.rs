//! `ScanStore`: the CRUD/query surface over `site_scans`, `harvested_wallets`,
//! `agent_sessions`, and `pii_exposures`, plus the `persist_investigation`
//! integration method that folds a finished [`Investigation`] into all four.
//!
//! Grounded on `ScanStore` in `scan_store.py`. Row-mapping uses
//! `sqlx::query(...).fetch_*` + `row.try_get(...)`, the same pattern the
//! teacher's `get_threat_statistics` already uses, rather than
//! `query_as!`/`query!`'s compile-time macros — those need a live database or
//! an offline query cache at build time, which doesn't fit a store that picks
//! its backend (sqlite vs. a remote MySQL-compatible server) at runtime.

use chrono::Utc;
use sqlx::any::{AnyPool, AnyRow};
use sqlx::error::DatabaseError;
use sqlx::Row;
use uuid::Uuid;

use ssi_common::{Investigation, PiiCategory, SsiError, WalletEntry};

use crate::engine;
use crate::pii::classify_form_field;

#[derive(Clone)]
pub struct ScanStore {
    pool: AnyPool,
}

#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub scan_id: String,
    pub case_id: Option<String>,
    pub url: String,
    pub domain: Option<String>,
    pub scan_type: String,
    pub status: String,
    pub passive_result: Option<serde_json::Value>,
    pub active_result: Option<serde_json::Value>,
    pub classification_result: Option<serde_json::Value>,
    pub risk_score: Option<f64>,
    pub taxonomy_version: Option<String>,
    pub wallet_count: i64,
    pub total_cost_usd: Option<f64>,
    pub llm_input_tokens: i64,
    pub llm_output_tokens: i64,
    pub duration_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub evidence_path: Option<String>,
    pub evidence_zip_sha256: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct WalletRecord {
    pub wallet_id: Option<String>,
    pub scan_id: Option<String>,
    pub token_label: Option<String>,
    pub token_symbol: Option<String>,
    pub network_label: Option<String>,
    pub network_short: Option<String>,
    pub wallet_address: String,
    pub source: String,
    pub confidence: f64,
    pub site_url: Option<String>,
    pub harvested_at: Option<String>,
    pub created_at: Option<String>,
    pub first_seen_at: Option<String>,
    pub last_seen_at: Option<String>,
    pub seen_count: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AgentActionRecord {
    pub session_id: String,
    pub scan_id: String,
    pub state: Option<String>,
    pub action_type: Option<String>,
    pub action_detail: Option<serde_json::Value>,
    pub page_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_input_tokens: Option<i64>,
    pub llm_output_tokens: Option<i64>,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub sequence: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PiiExposureRecord {
    pub exposure_id: String,
    pub scan_id: String,
    pub field_type: Option<String>,
    pub field_label: Option<String>,
    pub form_action: Option<String>,
    pub page_url: Option<String>,
    pub is_required: bool,
    pub was_submitted: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewWallet {
    pub token_label: Option<String>,
    pub token_symbol: String,
    pub network_label: Option<String>,
    pub network_short: String,
    pub wallet_address: String,
    pub source: Option<String>,
    pub confidence: Option<f64>,
    pub site_url: Option<String>,
    pub harvested_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAgentAction {
    pub state: Option<String>,
    pub sequence: i64,
    pub action_type: Option<String>,
    pub action_detail: Option<serde_json::Value>,
    pub page_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_input_tokens: Option<i64>,
    pub llm_output_tokens: Option<i64>,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPiiExposure {
    pub field_type: String,
    pub field_label: Option<String>,
    pub form_action: Option<String>,
    pub page_url: Option<String>,
    pub is_required: bool,
    pub was_submitted: bool,
}

/// Sparse field set for `update_scan`/`complete_scan` — only `Some` fields
/// are written, mirroring the Python `values` dict built from non-`None`
/// keyword arguments.
#[derive(Debug, Clone, Default)]
pub struct ScanUpdate {
    pub status: Option<String>,
    pub passive_result: Option<serde_json::Value>,
    pub active_result: Option<serde_json::Value>,
    pub classification_result: Option<serde_json::Value>,
    pub risk_score: Option<f64>,
    pub taxonomy_version: Option<String>,
    pub wallet_count: Option<i64>,
    pub total_cost_usd: Option<f64>,
    pub llm_input_tokens: Option<i64>,
    pub llm_output_tokens: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub evidence_path: Option<String>,
    pub evidence_zip_sha256: Option<String>,
    pub completed: bool,
}

fn row_to_scan(row: AnyRow) -> Result<ScanRecord, SsiError> {
    let get_json = |row: &AnyRow, col: &str| -> Option<serde_json::Value> {
        row.try_get::<Option<String>, _>(col).ok().flatten().and_then(|s| serde_json::from_str(&s).ok())
    };
    Ok(ScanRecord {
        scan_id: row.try_get("scan_id").map_err(db_err)?,
        case_id: row.try_get("case_id").map_err(db_err)?,
        url: row.try_get("url").map_err(db_err)?,
        domain: row.try_get("domain").map_err(db_err)?,
        scan_type: row.try_get("scan_type").map_err(db_err)?,
        status: row.try_get("status").map_err(db_err)?,
        passive_result: get_json(&row, "passive_result"),
        active_result: get_json(&row, "active_result"),
        classification_result: get_json(&row, "classification_result"),
        risk_score: row.try_get("risk_score").map_err(db_err)?,
        taxonomy_version: row.try_get("taxonomy_version").map_err(db_err)?,
        wallet_count: row.try_get("wallet_count").map_err(db_err)?,
        total_cost_usd: row.try_get("total_cost_usd").map_err(db_err)?,
        llm_input_tokens: row.try_get("llm_input_tokens").map_err(db_err)?,
        llm_output_tokens: row.try_get("llm_output_tokens").map_err(db_err)?,
        duration_seconds: row.try_get("duration_seconds").map_err(db_err)?,
        error_message: row.try_get("error_message").map_err(db_err)?,
        evidence_path: row.try_get("evidence_path").map_err(db_err)?,
        evidence_zip_sha256: row.try_get("evidence_zip_sha256").map_err(db_err)?,
        metadata: get_json(&row, "metadata"),
        started_at: row.try_get("started_at").map_err(db_err)?,
        completed_at: row.try_get("completed_at").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn row_to_wallet(row: AnyRow) -> Result<WalletRecord, SsiError> {
    let get = |col: &str| -> Option<String> { row.try_get(col).ok() };
    Ok(WalletRecord {
        wallet_id: get("wallet_id"),
        scan_id: get("scan_id"),
        token_label: get("token_label"),
        token_symbol: get("token_symbol"),
        network_label: get("network_label"),
        network_short: get("network_short"),
        wallet_address: row.try_get("wallet_address").map_err(db_err)?,
        source: row.try_get::<Option<String>, _>("source").map_err(db_err)?.unwrap_or_else(|| "js".to_string()),
        confidence: row.try_get("confidence").map_err(db_err)?,
        site_url: get("site_url"),
        harvested_at: get("harvested_at"),
        created_at: get("created_at"),
        first_seen_at: get("first_seen_at"),
        last_seen_at: get("last_seen_at"),
        seen_count: row.try_get("seen_count").ok(),
    })
}

fn row_to_agent_action(row: AnyRow) -> Result<AgentActionRecord, SsiError> {
    let detail: Option<String> = row.try_get("action_detail").map_err(db_err)?;
    Ok(AgentActionRecord {
        session_id: row.try_get("session_id").map_err(db_err)?,
        scan_id: row.try_get("scan_id").map_err(db_err)?,
        state: row.try_get("state").map_err(db_err)?,
        action_type: row.try_get("action_type").map_err(db_err)?,
        action_detail: detail.and_then(|s| serde_json::from_str(&s).ok()),
        page_url: row.try_get("page_url").map_err(db_err)?,
        llm_model: row.try_get("llm_model").map_err(db_err)?,
        llm_input_tokens: row.try_get("llm_input_tokens").map_err(db_err)?,
        llm_output_tokens: row.try_get("llm_output_tokens").map_err(db_err)?,
        cost_usd: row.try_get("cost_usd").map_err(db_err)?,
        duration_ms: row.try_get("duration_ms").map_err(db_err)?,
        error: row.try_get("error").map_err(db_err)?,
        sequence: row.try_get("sequence").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn row_to_pii(row: AnyRow) -> Result<PiiExposureRecord, SsiError> {
    Ok(PiiExposureRecord {
        exposure_id: row.try_get("exposure_id").map_err(db_err)?,
        scan_id: row.try_get("scan_id").map_err(db_err)?,
        field_type: row.try_get("field_type").map_err(db_err)?,
        field_label: row.try_get("field_label").map_err(db_err)?,
        form_action: row.try_get("form_action").map_err(db_err)?,
        page_url: row.try_get("page_url").map_err(db_err)?,
        is_required: row.try_get::<Option<i64>, _>("is_required").map_err(db_err)?.unwrap_or(0) != 0,
        was_submitted: row.try_get::<i64, _>("was_submitted").map_err(db_err)? != 0,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> SsiError {
    SsiError::Store(e.to_string())
}

impl ScanStore {
    pub fn new(pool: AnyPool) -> Self {
        ScanStore { pool }
    }

    pub async fn connect(settings: &ssi_common::config::StoreSettings) -> Result<Self, SsiError> {
        Ok(ScanStore { pool: engine::connect(settings).await? })
    }

    pub async fn create_scan(
        &self,
        url: &str,
        scan_type: Option<&str>,
        domain: Option<&str>,
        case_id: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String, SsiError> {
        let scan_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let scan_type = scan_type.unwrap_or("passive");
        let metadata_json = metadata.map(|m| m.to_string());
        sqlx::query(
            "INSERT INTO site_scans (scan_id, case_id, url, domain, scan_type, status, metadata, started_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'running', ?, ?, ?, ?)",
        )
        .bind(&scan_id)
        .bind(case_id)
        .bind(url)
        .bind(domain)
        .bind(scan_type)
        .bind(metadata_json)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(scan_id)
    }

    pub async fn update_scan(&self, scan_id: &str, update: &ScanUpdate) -> Result<(), SsiError> {
        let mut sets = Vec::new();
        let now = Utc::now().to_rfc3339();
        sets.push("updated_at = ?".to_string());
        if update.status.is_some() {
            sets.push("status = ?".to_string());
        }
        if update.passive_result.is_some() {
            sets.push("passive_result = ?".to_string());
        }
        if update.active_result.is_some() {
            sets.push("active_result = ?".to_string());
        }
        if update.classification_result.is_some() {
            sets.push("classification_result = ?".to_string());
        }
        if update.risk_score.is_some() {
            sets.push("risk_score = ?".to_string());
        }
        if update.taxonomy_version.is_some() {
            sets.push("taxonomy_version = ?".to_string());
        }
        if update.wallet_count.is_some() {
            sets.push("wallet_count = ?".to_string());
        }
        if update.total_cost_usd.is_some() {
            sets.push("total_cost_usd = ?".to_string());
        }
        if update.llm_input_tokens.is_some() {
            sets.push("llm_input_tokens = ?".to_string());
        }
        if update.llm_output_tokens.is_some() {
            sets.push("llm_output_tokens = ?".to_string());
        }
        if update.duration_seconds.is_some() {
            sets.push("duration_seconds = ?".to_string());
        }
        if update.error_message.is_some() {
            sets.push("error_message = ?".to_string());
        }
        if update.evidence_path.is_some() {
            sets.push("evidence_path = ?".to_string());
        }
        if update.evidence_zip_sha256.is_some() {
            sets.push("evidence_zip_sha256 = ?".to_string());
        }
        if update.completed {
            sets.push("completed_at = ?".to_string());
        }

        let sql = format!("UPDATE site_scans SET {} WHERE scan_id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql).bind(now.clone());
        if let Some(v) = &update.status {
            query = query.bind(v.clone());
        }
        if let Some(v) = &update.passive_result {
            query = query.bind(v.to_string());
        }
        if let Some(v) = &update.active_result {
            query = query.bind(v.to_string());
        }
        if let Some(v) = &update.classification_result {
            query = query.bind(v.to_string());
        }
        if let Some(v) = update.risk_score {
            query = query.bind(v);
        }
        if let Some(v) = &update.taxonomy_version {
            query = query.bind(v.clone());
        }
        if let Some(v) = update.wallet_count {
            query = query.bind(v);
        }
        if let Some(v) = update.total_cost_usd {
            query = query.bind(v);
        }
        if let Some(v) = update.llm_input_tokens {
            query = query.bind(v);
        }
        if let Some(v) = update.llm_output_tokens {
            query = query.bind(v);
        }
        if let Some(v) = update.duration_seconds {
            query = query.bind(v);
        }
        if let Some(v) = &update.error_message {
            query = query.bind(v.clone());
        }
        if let Some(v) = &update.evidence_path {
            query = query.bind(v.clone());
        }
        if let Some(v) = &update.evidence_zip_sha256 {
            query = query.bind(v.clone());
        }
        if update.completed {
            query = query.bind(now);
        }
        query = query.bind(scan_id.to_string());
        query.execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    pub async fn complete_scan(&self, scan_id: &str, status: &str, mut update: ScanUpdate) -> Result<(), SsiError> {
        update.status = Some(status.to_string());
        update.completed = true;
        self.update_scan(scan_id, &update).await
    }

    pub async fn get_scan(&self, scan_id: &str) -> Result<Option<ScanRecord>, SsiError> {
        let row = sqlx::query("SELECT * FROM site_scans WHERE scan_id = ?")
            .bind(scan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(row_to_scan).transpose()
    }

    pub async fn list_scans(&self, domain: Option<&str>, status: Option<&str>, limit: i64, offset: i64) -> Result<Vec<ScanRecord>, SsiError> {
        let mut sql = "SELECT * FROM site_scans WHERE 1=1".to_string();
        if domain.is_some() {
            sql.push_str(" AND domain = ?");
        }
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(d) = domain {
            query = query.bind(d);
        }
        if let Some(s) = status {
            query = query.bind(s);
        }
        query = query.bind(limit).bind(offset);

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(row_to_scan).collect()
    }

    /// Inserts a wallet, or updates confidence/source/metadata in place when
    /// `(scan_id, token_symbol, network_short, wallet_address)` already
    /// exists — the upsert `add_wallet` performs, as opposed to the plain
    /// bulk insert `add_wallets_bulk` performs.
    pub async fn add_wallet(&self, scan_id: &str, wallet: &NewWallet) -> Result<String, SsiError> {
        let wallet_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let harvested_at = wallet.harvested_at.unwrap_or(now).to_rfc3339();
        let source = wallet.source.clone().unwrap_or_else(|| "js".to_string());
        let confidence = wallet.confidence.unwrap_or(0.0);

        let insert = sqlx::query(
            "INSERT INTO harvested_wallets \
             (wallet_id, scan_id, token_label, token_symbol, network_label, network_short, wallet_address, source, confidence, site_url, harvested_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&wallet_id)
        .bind(scan_id)
        .bind(&wallet.token_label)
        .bind(&wallet.token_symbol)
        .bind(&wallet.network_label)
        .bind(&wallet.network_short)
        .bind(&wallet.wallet_address)
        .bind(&source)
        .bind(confidence)
        .bind(&wallet.site_url)
        .bind(&harvested_at)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(wallet_id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                sqlx::query(
                    "UPDATE harvested_wallets SET confidence = ?, source = ?, site_url = COALESCE(?, site_url), harvested_at = ? \
                     WHERE scan_id = ? AND token_symbol = ? AND network_short = ? AND wallet_address = ?",
                )
                .bind(confidence)
                .bind(&source)
                .bind(&wallet.site_url)
                .bind(&harvested_at)
                .bind(scan_id)
                .bind(&wallet.token_symbol)
                .bind(&wallet.network_short)
                .bind(&wallet.wallet_address)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

                let existing: Option<String> = sqlx::query(
                    "SELECT wallet_id FROM harvested_wallets WHERE scan_id = ? AND token_symbol = ? AND network_short = ? AND wallet_address = ?",
                )
                .bind(scan_id)
                .bind(&wallet.token_symbol)
                .bind(&wallet.network_short)
                .bind(&wallet.wallet_address)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?
                .map(|r: AnyRow| r.try_get::<String, _>("wallet_id").unwrap_or_default());
                Ok(existing.unwrap_or(wallet_id))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Plain bulk insert — no upsert, matching `add_wallets_bulk`.
    pub async fn add_wallets_bulk(&self, scan_id: &str, wallets: &[NewWallet]) -> Result<usize, SsiError> {
        if wallets.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        for wallet in wallets {
            let wallet_id = Uuid::new_v4().to_string();
            let harvested_at = wallet.harvested_at.unwrap_or(now).to_rfc3339();
            let source = wallet.source.clone().unwrap_or_else(|| "js".to_string());
            let confidence = wallet.confidence.unwrap_or(0.0);
            sqlx::query(
                "INSERT INTO harvested_wallets \
                 (wallet_id, scan_id, token_label, token_symbol, network_label, network_short, wallet_address, source, confidence, site_url, harvested_at, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&wallet_id)
            .bind(scan_id)
            .bind(&wallet.token_label)
            .bind(&wallet.token_symbol)
            .bind(&wallet.network_label)
            .bind(&wallet.network_short)
            .bind(&wallet.wallet_address)
            .bind(&source)
            .bind(confidence)
            .bind(&wallet.site_url)
            .bind(&harvested_at)
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        }
        Ok(wallets.len())
    }

    pub async fn get_wallets(&self, scan_id: &str) -> Result<Vec<WalletRecord>, SsiError> {
        let rows = sqlx::query("SELECT * FROM harvested_wallets WHERE scan_id = ? ORDER BY created_at DESC")
            .bind(scan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(row_to_wallet).collect()
    }

    /// `deduplicate=true` collapses repeat sightings of the same
    /// `(wallet_address, token_symbol, token_label, network_short,
    /// network_label)` via `GROUP BY` + `MAX(confidence)`, matching
    /// `search_wallets`'s default behaviour.
    pub async fn search_wallets(
        &self,
        address: Option<&str>,
        token_symbol: Option<&str>,
        limit: i64,
        deduplicate: bool,
    ) -> Result<Vec<WalletRecord>, SsiError> {
        if deduplicate {
            let mut sql = "SELECT wallet_address, token_symbol, token_label, network_short, network_label, \
                           MAX(confidence) AS confidence, MAX(source) AS source, MAX(site_url) AS site_url, \
                           MIN(harvested_at) AS first_seen_at, MAX(harvested_at) AS last_seen_at, COUNT(*) AS seen_count \
                           FROM harvested_wallets WHERE 1=1"
                .to_string();
            if address.is_some() {
                sql.push_str(" AND wallet_address = ?");
            }
            if token_symbol.is_some() {
                sql.push_str(" AND token_symbol = ?");
            }
            sql.push_str(" GROUP BY wallet_address, token_symbol, token_label, network_short, network_label ORDER BY last_seen_at DESC LIMIT ?");

            let mut query = sqlx::query(&sql);
            if let Some(a) = address {
                query = query.bind(a);
            }
            if let Some(t) = token_symbol {
                query = query.bind(t);
            }
            query = query.bind(limit);
            let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
            rows.into_iter().map(row_to_wallet).collect()
        } else {
            let mut sql = "SELECT * FROM harvested_wallets WHERE 1=1".to_string();
            if address.is_some() {
                sql.push_str(" AND wallet_address = ?");
            }
            if token_symbol.is_some() {
                sql.push_str(" AND token_symbol = ?");
            }
            sql.push_str(" ORDER BY created_at DESC LIMIT ?");

            let mut query = sqlx::query(&sql);
            if let Some(a) = address {
                query = query.bind(a);
            }
            if let Some(t) = token_symbol {
                query = query.bind(t);
            }
            query = query.bind(limit);
            let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
            rows.into_iter().map(row_to_wallet).collect()
        }
    }

    pub async fn log_agent_action(&self, scan_id: &str, action: &NewAgentAction) -> Result<String, SsiError> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let detail_json = action.action_detail.as_ref().map(|v| v.to_string());
        sqlx::query(
            "INSERT INTO agent_sessions \
             (session_id, scan_id, state, action_type, action_detail, page_url, llm_model, llm_input_tokens, llm_output_tokens, cost_usd, duration_ms, error, sequence, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session_id)
        .bind(scan_id)
        .bind(&action.state)
        .bind(&action.action_type)
        .bind(detail_json)
        .bind(&action.page_url)
        .bind(&action.llm_model)
        .bind(action.llm_input_tokens)
        .bind(action.llm_output_tokens)
        .bind(action.cost_usd)
        .bind(action.duration_ms)
        .bind(&action.error)
        .bind(action.sequence)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(session_id)
    }

    pub async fn get_agent_actions(&self, scan_id: &str) -> Result<Vec<AgentActionRecord>, SsiError> {
        let rows = sqlx::query("SELECT * FROM agent_sessions WHERE scan_id = ? ORDER BY sequence ASC")
            .bind(scan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(row_to_agent_action).collect()
    }

    pub async fn add_pii_exposure(&self, scan_id: &str, exposure: &NewPiiExposure) -> Result<String, SsiError> {
        let exposure_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO pii_exposures (exposure_id, scan_id, field_type, field_label, form_action, page_url, is_required, was_submitted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&exposure_id)
        .bind(scan_id)
        .bind(&exposure.field_type)
        .bind(&exposure.field_label)
        .bind(&exposure.form_action)
        .bind(&exposure.page_url)
        .bind(exposure.is_required as i64)
        .bind(exposure.was_submitted as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(exposure_id)
    }

    pub async fn add_pii_exposures_bulk(&self, scan_id: &str, exposures: &[NewPiiExposure]) -> Result<usize, SsiError> {
        for exposure in exposures {
            self.add_pii_exposure(scan_id, exposure).await?;
        }
        Ok(exposures.len())
    }

    pub async fn get_pii_exposures(&self, scan_id: &str) -> Result<Vec<PiiExposureRecord>, SsiError> {
        let rows = sqlx::query("SELECT * FROM pii_exposures WHERE scan_id = ? ORDER BY created_at DESC")
            .bind(scan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(row_to_pii).collect()
    }

    /// Folds a completed [`Investigation`] into `site_scans`,
    /// `harvested_wallets`, and `pii_exposures` in one call, mirroring
    /// `persist_investigation`.
    pub async fn persist_investigation(&self, scan_id: &str, investigation: &Investigation) -> Result<(), SsiError> {
        let passive_result = serde_json::json!({
            "whois": investigation.whois,
            "dns": investigation.dns,
            "tls": investigation.tls,
            "geoip": investigation.geoip,
            "virustotal": investigation.virustotal,
            "urlscan": investigation.urlscan,
        });
        let active_result = investigation
            .page_snapshot
            .as_ref()
            .map(|s| serde_json::to_value(s).unwrap_or(serde_json::Value::Null));
        let classification_result = investigation.taxonomy.as_ref().map(|t| serde_json::to_value(t).unwrap_or(serde_json::Value::Null));
        let risk_score = investigation.taxonomy.as_ref().map(|t| t.risk_score as f64);
        let total_input_tokens: u32 = investigation.agent_steps.iter().map(|s| s.input_tokens).sum();
        let total_output_tokens: u32 = investigation.agent_steps.iter().map(|s| s.output_tokens).sum();

        let update = ScanUpdate {
            passive_result: Some(passive_result),
            active_result,
            classification_result,
            risk_score,
            wallet_count: Some(investigation.wallets.len() as i64),
            total_cost_usd: Some(investigation.cost_summary.total()),
            llm_input_tokens: Some(total_input_tokens as i64),
            llm_output_tokens: Some(total_output_tokens as i64),
            duration_seconds: investigation.duration_seconds,
            evidence_path: investigation.output_dir.clone(),
            evidence_zip_sha256: investigation.chain_of_custody.as_ref().and_then(|c| c.package_sha256.clone()),
            ..Default::default()
        };
        let status = format!("{:?}", investigation.status).to_lowercase();
        self.complete_scan(scan_id, &status, update).await?;

        if !investigation.wallets.is_empty() {
            let wallets: Vec<NewWallet> = investigation.wallets.iter().map(new_wallet_from_entry).collect();
            self.add_wallets_bulk(scan_id, &wallets).await?;
        }

        if let Some(snapshot) = &investigation.page_snapshot {
            let exposures: Vec<NewPiiExposure> = snapshot
                .interactive_elements
                .iter()
                .filter(|e| e.tag.eq_ignore_ascii_case("input") || e.tag.eq_ignore_ascii_case("select") || e.tag.eq_ignore_ascii_case("textarea"))
                .map(|e| {
                    let category = classify_form_field(&e.element_type, &e.name, &e.label);
                    NewPiiExposure {
                        field_type: pii_category_str(category).to_string(),
                        field_label: Some(if !e.label.is_empty() { e.label.clone() } else { e.name.clone() }),
                        form_action: None,
                        page_url: Some(investigation.url.clone()),
                        is_required: e.required,
                        was_submitted: false,
                    }
                })
                .collect();
            if !exposures.is_empty() {
                self.add_pii_exposures_bulk(scan_id, &exposures).await?;
            }
        }

        tracing::info!(scan_id, wallets = investigation.wallets.len(), "persisted investigation");
        Ok(())
    }
}

fn new_wallet_from_entry(entry: &WalletEntry) -> NewWallet {
    NewWallet {
        token_label: Some(entry.token_name.clone()),
        token_symbol: entry.token_symbol.clone(),
        network_label: Some(entry.network.clone()),
        network_short: entry.network_short.clone(),
        wallet_address: entry.wallet_address.clone(),
        source: Some(format!("{:?}", entry.source).to_lowercase()),
        confidence: Some(entry.confidence as f64),
        site_url: Some(entry.source_url.clone()),
        harvested_at: Some(entry.timestamp),
    }
}

fn pii_category_str(category: PiiCategory) -> &'static str {
    match category {
        PiiCategory::Email => "email",
        PiiCategory::Password => "password",
        PiiCategory::Phone => "phone",
        PiiCategory::Name => "name",
        PiiCategory::Address => "address",
        PiiCategory::Ssn => "ssn",
        PiiCategory::Financial => "financial",
        PiiCategory::IdNumber => "id_number",
        PiiCategory::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::config::{StoreBackend, StoreSettings};

    async fn test_store() -> ScanStore {
        let settings = StoreSettings {
            backend: StoreBackend::Sqlite,
            sqlite_path: Some(":memory:".to_string()),
            cloudsql_instance: None,
            cloudsql_user: None,
            cloudsql_database: None,
            cloudsql_iam_auth: false,
        };
        ScanStore::connect(&settings).await.unwrap()
    }

    #[tokio::test]
    async fn create_and_get_scan_round_trips() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, Some("scam.example.com"), None, None).await.unwrap();
        assert_eq!(scan_id.len(), 36);

        let row = store.get_scan(&scan_id).await.unwrap().unwrap();
        assert_eq!(row.url, "https://scam.example.com");
        assert_eq!(row.domain.as_deref(), Some("scam.example.com"));
        assert_eq!(row.status, "running");
        assert_eq!(row.scan_type, "passive");
    }

    #[tokio::test]
    async fn get_scan_not_found_returns_none() {
        let store = test_store().await;
        assert!(store.get_scan("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_scan_sets_status_and_fields() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, None, None, None).await.unwrap();
        store
            .complete_scan(
                &scan_id,
                "completed",
                ScanUpdate { risk_score: Some(8.2), wallet_count: Some(3), duration_seconds: Some(42.5), evidence_path: Some("/tmp/evidence".to_string()), ..Default::default() },
            )
            .await
            .unwrap();
        let row = store.get_scan(&scan_id).await.unwrap().unwrap();
        assert_eq!(row.status, "completed");
        assert_eq!(row.wallet_count, 3);
        assert_eq!(row.evidence_path.as_deref(), Some("/tmp/evidence"));
        assert!(row.completed_at.is_some());
    }

    #[tokio::test]
    async fn list_scans_filters_by_domain() {
        let store = test_store().await;
        store.create_scan("https://a.com", None, Some("a.com"), None, None).await.unwrap();
        store.create_scan("https://b.com", None, Some("b.com"), None, None).await.unwrap();
        store.create_scan("https://a.com/page2", None, Some("a.com"), None, None).await.unwrap();

        assert_eq!(store.list_scans(None, None, 50, 0).await.unwrap().len(), 3);
        assert_eq!(store.list_scans(Some("a.com"), None, 50, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn add_wallet_upserts_on_conflict() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, None, None, None).await.unwrap();
        let wallet = NewWallet {
            token_symbol: "USDT".to_string(),
            network_short: "trx".to_string(),
            wallet_address: "TXyz123abc".to_string(),
            confidence: Some(0.5),
            source: Some("js".to_string()),
            ..Default::default()
        };
        store.add_wallet(&scan_id, &wallet).await.unwrap();
        let updated = NewWallet { confidence: Some(0.95), source: Some("llm".to_string()), ..wallet };
        store.add_wallet(&scan_id, &updated).await.unwrap();

        let wallets = store.get_wallets(&scan_id).await.unwrap();
        assert_eq!(wallets.len(), 1);
        assert!((wallets[0].confidence - 0.95).abs() < 0.01);
    }

    #[tokio::test]
    async fn add_wallets_bulk_inserts_without_upsert() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, None, None, None).await.unwrap();
        let wallets = vec![
            NewWallet { token_symbol: "USDT".into(), network_short: "trx".into(), wallet_address: "TAddr1".into(), ..Default::default() },
            NewWallet { token_symbol: "BTC".into(), network_short: "btc".into(), wallet_address: "bc1qAddr2".into(), ..Default::default() },
        ];
        assert_eq!(store.add_wallets_bulk(&scan_id, &wallets).await.unwrap(), 2);
        assert_eq!(store.get_wallets(&scan_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_wallets_dedup_collapses_same_address() {
        let store = test_store().await;
        let scan1 = store.create_scan("https://scam-a.example.com", None, None, None, None).await.unwrap();
        let scan2 = store.create_scan("https://scam-a.example.com", None, None, None, None).await.unwrap();
        for (sid, confidence) in [(&scan1, 0.8), (&scan2, 0.95)] {
            store
                .add_wallet(sid, &NewWallet { token_symbol: "ETH".into(), network_short: "eth".into(), wallet_address: "0xDEAD".into(), confidence: Some(confidence), ..Default::default() })
                .await
                .unwrap();
        }
        let results = store.search_wallets(None, None, 100, true).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].seen_count, Some(2));
    }

    #[tokio::test]
    async fn search_wallets_dedup_false_returns_all_rows() {
        let store = test_store().await;
        let scan1 = store.create_scan("https://scam-a.example.com", None, None, None, None).await.unwrap();
        let scan2 = store.create_scan("https://scam-a.example.com", None, None, None, None).await.unwrap();
        for sid in [&scan1, &scan2] {
            store.add_wallet(sid, &NewWallet { token_symbol: "ETH".into(), network_short: "eth".into(), wallet_address: "0xDEAD".into(), ..Default::default() }).await.unwrap();
        }
        assert_eq!(store.search_wallets(None, None, 100, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn agent_actions_ordered_by_sequence() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, None, None, None).await.unwrap();
        store.log_agent_action(&scan_id, &NewAgentAction { state: Some("FILL_REGISTER".into()), sequence: 2, action_type: Some("type".into()), ..Default::default() }).await.unwrap();
        store.log_agent_action(&scan_id, &NewAgentAction { state: Some("LOAD_SITE".into()), sequence: 0, action_type: Some("navigate".into()), ..Default::default() }).await.unwrap();
        store.log_agent_action(&scan_id, &NewAgentAction { state: Some("FIND_REGISTER".into()), sequence: 1, action_type: Some("click".into()), ..Default::default() }).await.unwrap();

        let actions = store.get_agent_actions(&scan_id).await.unwrap();
        assert_eq!(actions.iter().map(|a| a.sequence).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn pii_exposures_bulk_insert() {
        let store = test_store().await;
        let scan_id = store.create_scan("https://scam.example.com", None, None, None, None).await.unwrap();
        let exposures = vec![
            NewPiiExposure { field_type: "email".into(), field_label: Some("Email".into()), is_required: true, ..Default::default() },
            NewPiiExposure { field_type: "password".into(), field_label: Some("Password".into()), is_required: true, ..Default::default() },
        ];
        assert_eq!(store.add_pii_exposures_bulk(&scan_id, &exposures).await.unwrap(), 2);
        assert_eq!(store.get_pii_exposures(&scan_id).await.unwrap().len(), 2);
    }
}
