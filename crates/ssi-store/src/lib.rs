//! Scan store (C13): persists investigations, harvested wallets, agent
//! session steps, and PII exposures to either a local sqlite file or a
//! remote MySQL-compatible database, behind one `sqlx::any` pool.

pub mod engine;
pub mod pii;
pub mod schema;
pub mod scan_store;

pub use pii::classify_form_field;
pub use scan_store::{
    AgentActionRecord, NewAgentAction, NewPiiExposure, NewWallet, PiiExposureRecord, ScanRecord, ScanStore, ScanUpdate, WalletRecord,
};
