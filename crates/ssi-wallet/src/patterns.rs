//! Wallet validator (C1): regex-match and classify cryptocurrency addresses
//! across the supported chains.
//!
//! Grounded on `crates/common/src/parsers/generic.rs`'s ordered-fallback
//! regex idiom and `original_source/wallet/patterns.py`'s exact pattern
//! table (carried verbatim).

use regex::Regex;
use std::sync::OnceLock;

/// A single chain's address pattern. More-specific patterns are ordered
/// first in [`wallet_patterns`] so ambiguous strings (e.g. generic base58)
/// classify as the narrower chain when possible.
pub struct WalletPattern {
    pub name: &'static str,
    pub symbol: &'static str,
    pub regex: &'static str,
    pub min_length: usize,
    pub max_length: usize,
    pub example: &'static str,
}

/// A validated match: the extracted address, the pattern that matched, and
/// its symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub address: String,
    pub pattern_name: &'static str,
    pub symbol: &'static str,
}

const PATTERN_SPECS: &[WalletPattern] = &[
    WalletPattern {
        name: "Ethereum / ERC-20",
        symbol: "ETH",
        regex: r"\b(0x[a-fA-F0-9]{40})\b",
        min_length: 42,
        max_length: 42,
        example: "0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe",
    },
    WalletPattern {
        name: "Tron / TRC-20",
        symbol: "TRX",
        regex: r"\b(T[A-HJ-NP-Za-km-z1-9]{33})\b",
        min_length: 34,
        max_length: 34,
        example: "TJYqaPn323M2C7x7E5E3ypEGVgKYxxrWW1",
    },
    WalletPattern {
        name: "Bitcoin (bech32)",
        symbol: "BTC",
        regex: r"\b(bc1[a-z0-9]{39,59})\b",
        min_length: 42,
        max_length: 62,
        example: "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
    },
    WalletPattern {
        name: "Bitcoin (legacy)",
        symbol: "BTC",
        regex: r"\b([13][a-km-zA-HJ-NP-Z1-9]{25,34})\b",
        min_length: 26,
        max_length: 35,
        example: "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
    },
    WalletPattern {
        name: "XRP Ledger",
        symbol: "XRP",
        regex: r"\b(r[0-9a-zA-Z]{24,34})\b",
        min_length: 25,
        max_length: 35,
        example: "rN7n3473SaZBCG4dFL83w7p1W9cgZw6ihn",
    },
    WalletPattern {
        name: "Cardano",
        symbol: "ADA",
        regex: r"\b(addr1[a-z0-9]{50,120})\b",
        min_length: 55,
        max_length: 130,
        example: "addr1qxy2k5c2n5qfr9z7a3ggvpfqfkpt78eczgmd26qjqkmpv6lr2g7v5sc3wg0nfgfsdvlaq5g82dkyn5wsydmhqgemhd6kxegraeel",
    },
    WalletPattern {
        name: "Litecoin (legacy)",
        symbol: "LTC",
        regex: r"\b(L[a-km-zA-HJ-NP-Z1-9]{26,33})\b",
        min_length: 27,
        max_length: 34,
        example: "LaMT348PWRnrqeeWArpwQPbuanpXDZGEUz",
    },
    WalletPattern {
        name: "Litecoin (bech32)",
        symbol: "LTC",
        regex: r"\b(ltc1[a-z0-9]{39,59})\b",
        min_length: 43,
        max_length: 63,
        example: "ltc1qg42tkwuuxefutzentevevhfhv0tyersh5z46vu",
    },
    WalletPattern {
        name: "Dogecoin",
        symbol: "DOGE",
        regex: r"\b(D[5-9A-HJ-NP-U][1-9A-HJ-NP-Za-km-z]{32})\b",
        min_length: 34,
        max_length: 34,
        example: "DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L",
    },
    WalletPattern {
        name: "Bitcoin Cash (cashaddr)",
        symbol: "BCH",
        regex: r"\b(bitcoincash:[qp][a-z0-9]{41})\b",
        min_length: 54,
        max_length: 54,
        example: "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
    },
    WalletPattern {
        name: "Dash",
        symbol: "DASH",
        regex: r"\b(X[1-9A-HJ-NP-Za-km-z]{33})\b",
        min_length: 34,
        max_length: 34,
        example: "XyzSoLEFQxWUf3Nd83s2GFzTpPNdBi7LGG",
    },
    // Solana / generic base58 is last: least specific, would otherwise
    // shadow the narrower chains above.
    WalletPattern {
        name: "Solana / Generic Base58",
        symbol: "SOL",
        regex: r"\b([A-HJ-NP-Za-km-z1-9]{32,44})\b",
        min_length: 32,
        max_length: 44,
        example: "7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2",
    },
];

struct CompiledPattern {
    spec: &'static WalletPattern,
    re: Regex,
}

fn compiled_patterns() -> &'static Vec<CompiledPattern> {
    static CELL: OnceLock<Vec<CompiledPattern>> = OnceLock::new();
    CELL.get_or_init(|| {
        PATTERN_SPECS
            .iter()
            .map(|spec| CompiledPattern {
                spec,
                re: Regex::new(spec.regex).expect("static wallet regex must compile"),
            })
            .collect()
    })
}

/// Returns the chain pattern table, in specificity order.
pub fn wallet_patterns() -> &'static [WalletPattern] {
    PATTERN_SPECS
}

fn within_bounds(spec: &WalletPattern, addr: &str) -> bool {
    addr.len() >= spec.min_length && addr.len() <= spec.max_length
}

/// validate(string) → first matching pattern, honouring length bounds to
/// reject false-positive substrings.
pub fn validate(candidate: &str) -> Option<MatchResult> {
    let text = candidate.trim();
    for cp in compiled_patterns() {
        if let Some(caps) = cp.re.captures(text) {
            let addr = caps.get(1).map(|m| m.as_str()).unwrap_or(text);
            if within_bounds(cp.spec, addr) {
                return Some(MatchResult {
                    address: addr.to_string(),
                    pattern_name: cp.spec.name,
                    symbol: cp.spec.symbol,
                });
            }
        }
    }
    None
}

/// is-valid-for-symbol(address, expected-symbol) → bool.
pub fn is_valid_for_symbol(address: &str, expected_symbol: &str) -> bool {
    let expected = expected_symbol.to_uppercase();
    compiled_patterns().iter().any(|cp| {
        cp.spec.symbol == expected
            && cp
                .re
                .captures(address)
                .and_then(|c| c.get(1))
                .map(|m| within_bounds(cp.spec, m.as_str()))
                .unwrap_or(false)
    })
}

/// scan-text(string) → ordered, de-duplicated list of matches.
///
/// Testable property 6 (determinism) and the explicit spec requirement that
/// matches come back in *discovery order*: unlike the Python original
/// (which iterates patterns in registry order, see DESIGN.md Open Question
/// 1), every candidate match across every pattern is collected with its
/// byte offset and the final list is sorted by that offset, deduplicating
/// by literal address on first occurrence.
pub fn scan_text(text: &str) -> Vec<MatchResult> {
    let mut candidates: Vec<(usize, MatchResult)> = Vec::new();

    for cp in compiled_patterns() {
        for m in cp.re.find_iter(text) {
            // captures_at re-derives the capture group at this position so
            // we keep the exact (group 1) address rather than the whole match.
            if let Some(caps) = cp.re.captures(&text[m.start()..m.end()]) {
                let addr = caps.get(1).map(|g| g.as_str()).unwrap_or(m.as_str());
                if within_bounds(cp.spec, addr) {
                    candidates.push((
                        m.start(),
                        MatchResult {
                            address: addr.to_string(),
                            pattern_name: cp.spec.name,
                            symbol: cp.spec.symbol,
                        },
                    ));
                }
            }
        }
    }

    candidates.sort_by_key(|(offset, _)| *offset);

    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();
    for (_, m) in candidates {
        if seen.insert(m.address.clone()) {
            results.push(m);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_example_address_validates_to_its_symbol() {
        for spec in wallet_patterns() {
            let result = validate(spec.example)
                .unwrap_or_else(|| panic!("example for {} did not validate", spec.name));
            assert_eq!(result.symbol, spec.symbol, "pattern {}", spec.name);
        }
    }

    #[test]
    fn scan_text_is_deterministic_and_ordered() {
        let text = "funds go to TJYqaPn323M2C7x7E5E3ypEGVgKYxxrWW1 then 0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe";
        let first = scan_text(text);
        let second = scan_text(text);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].symbol, "TRX");
        assert_eq!(first[1].symbol, "ETH");
    }

    #[test]
    fn scan_text_dedupes_repeated_address() {
        let text = "0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe and again 0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe";
        let matches = scan_text(text);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn rejects_unknown_string() {
        assert!(validate("not-a-wallet-address").is_none());
    }

    #[test]
    fn is_valid_for_symbol_rejects_mismatched_chain() {
        let eth = "0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe";
        assert!(is_valid_for_symbol(eth, "ETH"));
        assert!(!is_valid_for_symbol(eth, "TRX"));
    }
}
