//! Cryptocurrency wallet extraction support: address validation (C1),
//! allowlist filtering (C2), and per-run harvest aggregation.

pub mod allowlist;
pub mod harvest;
pub mod patterns;

pub use allowlist::{AllowlistFilter, TokenNetwork};
pub use harvest::WalletHarvest;
pub use patterns::{is_valid_for_symbol, scan_text, validate, wallet_patterns, MatchResult};
