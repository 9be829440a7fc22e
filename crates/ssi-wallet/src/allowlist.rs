//! Allowlist filter (C2): accept/reject `(token, network)` pairs against a
//! curated list. Grounded on `original_source/wallet/allowlist.py` — the
//! default 26-pair table is carried verbatim.

use ssi_common::WalletEntry;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct TokenNetwork {
    pub token_name: String,
    pub token_symbol: String,
    pub network: String,
    pub network_short: String,
}

impl TokenNetwork {
    fn new(token_name: &str, token_symbol: &str, network: &str, network_short: &str) -> Self {
        TokenNetwork {
            token_name: token_name.to_string(),
            token_symbol: token_symbol.to_string(),
            network: network.to_string(),
            network_short: network_short.to_string(),
        }
    }
}

/// The compiled-in default allowlist (12 native + 8 USDT + 6 USDC = 26
/// pairs).
pub fn default_token_networks() -> Vec<TokenNetwork> {
    vec![
        // Native tokens (12)
        TokenNetwork::new("BNB", "BNB", "BNB Smart Chain BEP-20", "bsc"),
        TokenNetwork::new("Bitcoin", "BTC", "Bitcoin", "btc"),
        TokenNetwork::new("Bitcoin Cash", "BCH", "Bitcoin Cash", "bch"),
        TokenNetwork::new("Cardano", "ADA", "Cardano", "ada"),
        TokenNetwork::new("Dash", "DASH", "Dash", "dash"),
        TokenNetwork::new("Dogecoin", "DOGE", "Dogecoin", "doge"),
        TokenNetwork::new("Ethereum", "ETH", "Ethereum", "eth"),
        TokenNetwork::new("Litecoin", "LTC", "Litecoin", "ltc"),
        TokenNetwork::new("Polygon", "MATIC", "Polygon PoS", "matic"),
        TokenNetwork::new("Ripple", "XRP", "XRP Ledger", "xrp"),
        TokenNetwork::new("Solana", "SOL", "Solana", "sol"),
        TokenNetwork::new("Tron", "TRX", "Tron", "trx"),
        // USDT variants (8)
        TokenNetwork::new("Tether", "USDT", "Arbitrum One", "arb"),
        TokenNetwork::new("Tether", "USDT", "Avalanche C-Chain", "avax"),
        TokenNetwork::new("Tether", "USDT", "BNB Smart Chain BEP-20", "bsc"),
        TokenNetwork::new("Tether", "USDT", "Ethereum ERC-20", "eth"),
        TokenNetwork::new("Tether", "USDT", "Optimism", "op"),
        TokenNetwork::new("Tether", "USDT", "Polygon PoS", "matic"),
        TokenNetwork::new("Tether", "USDT", "Solana SPL", "sol"),
        TokenNetwork::new("Tether", "USDT", "Tron TRC-20", "trx"),
        // USDC variants (6)
        TokenNetwork::new("USD Coin", "USDC", "Arbitrum One", "arb"),
        TokenNetwork::new("USD Coin", "USDC", "Avalanche C-Chain", "avax"),
        TokenNetwork::new("USD Coin", "USDC", "Ethereum ERC-20", "eth"),
        TokenNetwork::new("USD Coin", "USDC", "Optimism", "op"),
        TokenNetwork::new("USD Coin", "USDC", "Polygon PoS", "matic"),
        TokenNetwork::new("USD Coin", "USDC", "Solana SPL", "sol"),
    ]
}

pub struct AllowlistFilter {
    pairs: HashSet<(String, String)>,
    by_symbol: HashMap<String, Vec<TokenNetwork>>,
    networks: Vec<TokenNetwork>,
}

impl AllowlistFilter {
    pub fn new(networks: Vec<TokenNetwork>) -> Self {
        let mut pairs = HashSet::new();
        let mut by_symbol: HashMap<String, Vec<TokenNetwork>> = HashMap::new();
        for tn in &networks {
            pairs.insert((tn.token_symbol.clone(), tn.network_short.clone()));
            by_symbol
                .entry(tn.token_symbol.clone())
                .or_default()
                .push(tn.clone());
        }
        AllowlistFilter { pairs, by_symbol, networks }
    }

    pub fn default_filter() -> Self {
        Self::new(default_token_networks())
    }

    /// Load from a JSON allowlist file; falls back to the compiled-in
    /// default silently (with a warning log) if the path is missing or
    /// malformed.
    pub fn from_json_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawAllowlist>(&contents) {
                Ok(raw) => {
                    let networks = raw
                        .token_networks
                        .into_iter()
                        .map(|e| {
                            TokenNetwork::new(&e.token_name, &e.token_symbol, &e.network, &e.network_short)
                        })
                        .collect();
                    Self::new(networks)
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "malformed allowlist file, using defaults");
                    Self::default_filter()
                }
            },
            Err(_) => {
                tracing::warn!(path = %path.display(), "allowlist file not found, using defaults");
                Self::default_filter()
            }
        }
    }

    pub fn count(&self) -> usize {
        self.pairs.len()
    }

    pub fn allowed_pairs(&self) -> &HashSet<(String, String)> {
        &self.pairs
    }

    pub fn allowed_symbols(&self) -> HashSet<String> {
        self.networks.iter().map(|tn| tn.token_symbol.clone()).collect()
    }

    pub fn is_allowed(&self, entry: &WalletEntry) -> bool {
        self.pairs.contains(&entry.allowlist_key())
    }

    pub fn is_known_symbol(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(&symbol.to_uppercase())
    }

    pub fn networks_for_symbol(&self, symbol: &str) -> Vec<TokenNetwork> {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// filter(list) → (accepted, discarded). Entries with empty symbol or
    /// network_short are always discarded (testable property 4).
    pub fn filter(&self, entries: Vec<WalletEntry>) -> (Vec<WalletEntry>, Vec<WalletEntry>) {
        let mut accepted = Vec::new();
        let mut discarded = Vec::new();
        for entry in entries {
            if entry.token_symbol.is_empty() || entry.network_short.is_empty() {
                discarded.push(entry);
            } else if self.is_allowed(&entry) {
                accepted.push(entry);
            } else {
                discarded.push(entry);
            }
        }
        tracing::info!(accepted = accepted.len(), discarded = discarded.len(), "allowlist filter applied");
        (accepted, discarded)
    }
}

#[derive(serde::Deserialize)]
struct RawAllowlist {
    token_networks: Vec<RawTokenNetwork>,
}

#[derive(serde::Deserialize)]
struct RawTokenNetwork {
    token_name: String,
    token_symbol: String,
    network: String,
    network_short: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::WalletSource;

    fn entry(symbol: &str, network_short: &str) -> WalletEntry {
        WalletEntry::new(
            "https://example.com",
            "Tether",
            symbol,
            "Tron TRC-20",
            network_short,
            "TJYqaPn323M2C7x7E5E3ypEGVgKYxxrWW1",
            WalletSource::Llm,
            0.9,
        )
        .unwrap()
    }

    #[test]
    fn default_allowlist_has_26_pairs() {
        assert_eq!(AllowlistFilter::default_filter().count(), 26);
    }

    #[test]
    fn filter_is_a_bijection() {
        let filt = AllowlistFilter::default_filter();
        let entries = vec![entry("USDT", "trx"), entry("XYZ", "nowhere"), entry("", "")];
        let total = entries.len();
        let (accepted, discarded) = filt.filter(entries);
        assert_eq!(accepted.len() + discarded.len(), total);
        assert!(accepted.iter().all(|e| filt.is_allowed(e)));
        assert!(discarded.iter().any(|e| e.token_symbol.is_empty()));
    }
}
