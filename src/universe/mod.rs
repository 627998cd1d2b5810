//! Scan universe resolution.
//!
//! Supplies the ordered list of symbols for a scan pass, from the best
//! available source with graceful fallback:
//!
//! 1. an operator-supplied symbols file (large curated list, ~2000 symbols)
//! 2. the bundled Nifty-derived list compiled into the binary
//! 3. a hard-coded core of 30 liquid large caps
//!
//! Ordering is stable across calls and process restarts — the persisted
//! scan offset indexes into it, so a reshuffle would corrupt the cursor.

use std::collections::HashSet;
use tracing::{info, warn};

/// Bundled mid-tier list (one symbol per line, `#` comments).
const BUNDLED_LIST: &str = include_str!("nifty_500.txt");

/// Last-resort universe: the most liquid NSE large caps.
const CORE_SYMBOLS: [&str; 30] = [
    "RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "BHARTIARTL",
    "ITC", "SBIN", "LT", "AXISBANK", "MARUTI", "TITAN", "SUNPHARMA",
    "BAJFINANCE", "KOTAKBANK", "WIPRO", "HCLTECH", "TATAMOTORS", "M&M",
    "ADANIENT", "ASIANPAINT", "BAJAJFINSV", "ULTRACEMCO", "NESTLEIND",
    "TATASTEEL", "POWERGRID", "TECHM", "JSWSTEEL", "NTPC", "ONGC",
];

/// Which source tier the universe was resolved from (logged, not exposed
/// to scanning logic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseTier {
    File,
    Bundled,
    Core,
}

/// The ordered, immutable set of symbols for one scanning cycle.
#[derive(Debug, Clone)]
pub struct Universe {
    symbols: Vec<String>,
    tier: UniverseTier,
}

impl Universe {
    /// Resolve the universe, falling back silently through the tiers.
    /// Always returns a non-empty universe.
    pub fn resolve(symbols_file: Option<&str>) -> Self {
        if let Some(path) = symbols_file {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    let symbols = parse_symbol_list(&contents);
                    if !symbols.is_empty() {
                        info!(path, count = symbols.len(), "Universe loaded from symbols file");
                        return Universe {
                            symbols,
                            tier: UniverseTier::File,
                        };
                    }
                    warn!(path, "Symbols file contained no symbols, falling back");
                }
                Err(e) => {
                    warn!(path, error = %e, "Failed to read symbols file, falling back");
                }
            }
        }

        let bundled = parse_symbol_list(BUNDLED_LIST);
        if !bundled.is_empty() {
            info!(count = bundled.len(), "Universe loaded from bundled list");
            return Universe {
                symbols: bundled,
                tier: UniverseTier::Bundled,
            };
        }

        warn!("Bundled list unavailable, using hard-coded core universe");
        Universe {
            symbols: CORE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            tier: UniverseTier::Core,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn tier(&self) -> UniverseTier {
        self.tier
    }

    /// Build a fixed universe directly (tests and on-demand checks).
    pub fn from_symbols(symbols: Vec<String>) -> Self {
        Universe {
            symbols,
            tier: UniverseTier::Core,
        }
    }
}

/// Parse a symbols file: one symbol per line, uppercased, `#` comments and
/// duplicates dropped, first-seen order preserved.
fn parse_symbol_list(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_uppercase)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let parsed = parse_symbol_list("# header\nRELIANCE\n\n  tcs  \n# tail\nINFY\n");
        assert_eq!(parsed, vec!["RELIANCE", "TCS", "INFY"]);
    }

    #[test]
    fn test_parse_dedups_preserving_order() {
        let parsed = parse_symbol_list("TCS\nRELIANCE\ntcs\nINFY\nRELIANCE\n");
        assert_eq!(parsed, vec!["TCS", "RELIANCE", "INFY"]);
    }

    #[test]
    fn test_bundled_list_is_valid() {
        let bundled = parse_symbol_list(BUNDLED_LIST);
        assert!(bundled.len() > 100);
        assert_eq!(bundled[0], "RELIANCE");
        // No duplicates survived parsing.
        let unique: HashSet<_> = bundled.iter().collect();
        assert_eq!(unique.len(), bundled.len());
    }

    #[test]
    fn test_resolve_without_file_uses_bundled() {
        let u = Universe::resolve(None);
        assert_eq!(u.tier(), UniverseTier::Bundled);
        assert!(!u.is_empty());
    }

    #[test]
    fn test_resolve_missing_file_falls_back() {
        let u = Universe::resolve(Some("/tmp/trendscan_no_such_file.txt"));
        assert_eq!(u.tier(), UniverseTier::Bundled);
    }

    #[test]
    fn test_resolve_from_file() {
        let path = std::env::temp_dir().join(format!("trendscan_universe_{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "AAA\nBBB\nCCC\n").unwrap();
        let u = Universe::resolve(path.to_str());
        assert_eq!(u.tier(), UniverseTier::File);
        assert_eq!(u.symbols(), &["AAA", "BBB", "CCC"]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_ordering_is_stable() {
        let a = Universe::resolve(None);
        let b = Universe::resolve(None);
        assert_eq!(a.symbols(), b.symbols());
    }

    #[test]
    fn test_core_list_has_30() {
        assert_eq!(CORE_SYMBOLS.len(), 30);
    }

    #[test]
    fn test_get_in_and_out_of_range() {
        let u = Universe::from_symbols(vec!["A".into(), "B".into()]);
        assert_eq!(u.get(1), Some("B"));
        assert_eq!(u.get(2), None);
    }
}
