//! `WalletHarvest` — the per-run collection of harvested wallets, with the
//! dedup/merge semantics from `original_source/wallet/models.py`
//! merging entries from multiple capture sources.

use ssi_common::WalletEntry;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct WalletHarvest {
    pub site_url: String,
    pub run_id: String,
    pub entries: Vec<WalletEntry>,
}

impl WalletHarvest {
    pub fn new(site_url: impl Into<String>, run_id: impl Into<String>) -> Self {
        WalletHarvest {
            site_url: site_url.into(),
            run_id: run_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn unique_addresses(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.wallet_address.as_str()).collect()
    }

    pub fn symbols_found(&self) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|e| !e.token_symbol.is_empty())
            .map(|e| e.token_symbol.as_str())
            .collect()
    }

    /// Add an entry, deduplicating by `wallet_address`. Returns `true` if
    /// added.
    pub fn add(&mut self, mut entry: WalletEntry) -> bool {
        if self.entries.iter().any(|e| e.wallet_address == entry.wallet_address) {
            return false;
        }
        if !self.run_id.is_empty() && entry.run_id.is_none() {
            entry.run_id = Some(self.run_id.clone());
        }
        self.entries.push(entry);
        true
    }

    /// Merge LLM-verified entries: for addresses already present, the LLM
    /// entry replaces the existing one (richer metadata); new addresses are
    /// appended.
    pub fn merge_llm_results(&mut self, llm_entries: Vec<WalletEntry>) {
        for llm_entry in llm_entries {
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|e| e.wallet_address == llm_entry.wallet_address)
            {
                *existing = llm_entry;
            } else {
                self.entries.push(llm_entry);
            }
        }
    }

    /// Remove duplicate addresses, keeping the entry with the most metadata
    /// (non-empty `network_short` preferred). Returns the count removed.
    pub fn deduplicate(&mut self) -> usize {
        let mut kept: Vec<WalletEntry> = Vec::new();
        let mut index_of: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        let mut removed = 0usize;

        for entry in self.entries.drain(..) {
            if let Some(&idx) = index_of.get(&entry.wallet_address) {
                if !entry.network_short.is_empty() && kept[idx].network_short.is_empty() {
                    kept[idx] = entry;
                }
                removed += 1;
            } else {
                index_of.insert(entry.wallet_address.clone(), kept.len());
                kept.push(entry);
            }
        }
        self.entries = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::WalletSource;

    fn entry(addr: &str, network_short: &str) -> WalletEntry {
        WalletEntry::new("https://x.test", "Tether", "USDT", "Tron", network_short, addr, WalletSource::Js, 0.5).unwrap()
    }

    #[test]
    fn add_dedupes_by_literal_address() {
        let mut harvest = WalletHarvest::new("https://x.test", "run-1");
        assert!(harvest.add(entry("addr1", "trx")));
        assert!(!harvest.add(entry("addr1", "trx")));
        assert_eq!(harvest.count(), 1);
    }

    #[test]
    fn deduplicate_prefers_entry_with_network_short() {
        let mut harvest = WalletHarvest::new("https://x.test", "run-1");
        harvest.entries.push(entry("addr1", ""));
        harvest.entries.push(entry("addr1", "trx"));
        let removed = harvest.deduplicate();
        assert_eq!(removed, 1);
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].network_short, "trx");
    }

    #[test]
    fn merge_llm_results_replaces_matching_addresses() {
        let mut harvest = WalletHarvest::new("https://x.test", "run-1");
        harvest.add(entry("addr1", "")).then_some(()).unwrap();
        let llm_entry = entry("addr1", "trx");
        harvest.merge_llm_results(vec![llm_entry]);
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].network_short, "trx");
    }
}
