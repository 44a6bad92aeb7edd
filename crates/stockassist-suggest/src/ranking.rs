//! Suggestion ranking.
//!
//! Raw search results come back in whatever order the backend's fuzzy
//! matcher produced. Ranking surfaces the listing the user most likely
//! means: roots from the priority table that relate to the query are
//! injected (or flagged when already present), then the list is sorted by
//! a fixed chain of keys.

use crate::error::RankingInputError;
use crate::priority::{PriorityEntry, PriorityTable};
use serde::Serialize;
use std::cmp::Reverse;
use stockassist_core::SuggestionCandidate;
use tracing::{debug, warn};

/// A candidate with the flags computed by one ranking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSuggestion {
    #[serde(flatten)]
    pub candidate: SuggestionCandidate,
    /// Preferred listing of a root related to the query.
    #[serde(rename = "isPreferredMatch")]
    pub is_preferred_match: bool,
    /// Preferred listing of a root the query names exactly.
    #[serde(rename = "isExactTermMatch")]
    pub is_exact_term_match: bool,
}

impl RankedSuggestion {
    fn unflagged(candidate: SuggestionCandidate) -> Self {
        Self {
            candidate,
            is_preferred_match: false,
            is_exact_term_match: false,
        }
    }

    fn score(&self) -> u32 {
        let mut score = 0;
        if self.is_exact_term_match {
            score += 100;
        }
        if self.is_preferred_match {
            score += 50;
        }
        score
    }
}

/// Rank against the curated table.
pub fn rank(raw: &[SuggestionCandidate], query: &str) -> Vec<RankedSuggestion> {
    Ranker::new(PriorityTable::global()).rank(raw, query)
}

/// Ranking engine over a priority table.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    table: &'a PriorityTable,
}

impl<'a> Ranker<'a> {
    pub fn new(table: &'a PriorityTable) -> Self {
        Self { table }
    }

    /// Re-order `raw` for display, injecting preferred listings.
    pub fn rank(&self, raw: &[SuggestionCandidate], query: &str) -> Vec<RankedSuggestion> {
        let Some(term) = search_term(raw, query) else {
            warn!(
                error = %RankingInputError::NoSearchTerm,
                candidates = raw.len(),
                "Returning suggestions unranked"
            );
            return raw.iter().cloned().map(RankedSuggestion::unflagged).collect();
        };

        let matches = self.classify(raw, &term);
        let relevant = matches.relevant(&term);

        let mut working: Vec<RankedSuggestion> =
            raw.iter().cloned().map(RankedSuggestion::unflagged).collect();

        for entry in &relevant {
            let exact = matches.is_exact(&entry.root);
            match working
                .iter_mut()
                .find(|s| s.candidate.same_listing(&entry.preferred))
            {
                Some(existing) => {
                    existing.is_preferred_match = true;
                    existing.is_exact_term_match |= exact;
                }
                None => working.insert(
                    0,
                    RankedSuggestion {
                        candidate: entry.preferred.clone(),
                        is_preferred_match: true,
                        is_exact_term_match: exact,
                    },
                ),
            }
        }

        debug!(
            term = %term,
            relevant = relevant.len(),
            total = working.len(),
            "Ranked suggestions"
        );

        working.sort_by_cached_key(|s| Reverse(self.sort_key(s, &term)));
        working
    }

    fn classify(&self, raw: &[SuggestionCandidate], term: &str) -> RootMatches<'a> {
        let term_lower = term.to_lowercase();
        let mut matches = RootMatches::default();

        for entry in self.table.entries() {
            let preferred = &entry.preferred;
            let name_upper = preferred.name.to_uppercase();
            let aliases = &preferred.search_terms;

            let exact = entry.root == term
                || aliases.iter().any(|a| a.to_lowercase() == term_lower);
            let strong = entry.root.contains(term) || name_upper.contains(term);
            let alias_related = aliases.iter().any(|a| {
                let a = a.to_lowercase();
                a.contains(&term_lower) || term_lower.contains(&a)
            });
            let overlaps = raw
                .iter()
                .any(|candidate| overlaps_root(candidate, &entry.root, &name_upper));

            if exact {
                matches.exact.push(entry);
            }
            if strong || (alias_related && overlaps) {
                matches.term.push(entry);
            }
            if overlaps {
                matches.potential.push(entry);
            }
        }

        matches
    }

    fn sort_key(&self, s: &RankedSuggestion, term: &str) -> SortKey {
        let candidate = &s.candidate;
        let base = base_symbol(&candidate.symbol);
        SortKey {
            score: s.score(),
            base_is_term: base == term,
            name_has_term: candidate.name.to_uppercase().contains(term),
            is_preferred_listing: self.table.is_preferred_listing(candidate),
            base_is_root: self.table.contains_root(base),
            is_crypto_usd: candidate.asset_type.as_deref() == Some("crypto")
                && candidate.symbol.contains("USD"),
        }
    }
}

/// Field order is the sort priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    score: u32,
    base_is_term: bool,
    name_has_term: bool,
    is_preferred_listing: bool,
    base_is_root: bool,
    is_crypto_usd: bool,
}

#[derive(Default)]
struct RootMatches<'a> {
    exact: Vec<&'a PriorityEntry>,
    term: Vec<&'a PriorityEntry>,
    potential: Vec<&'a PriorityEntry>,
}

impl<'a> RootMatches<'a> {
    fn is_exact(&self, root: &str) -> bool {
        self.exact.iter().any(|e| e.root == root)
    }

    /// Exact, then term, then potential matches, first occurrence wins.
    fn relevant(&self, term: &str) -> Vec<&'a PriorityEntry> {
        let mut seen: Vec<&'a PriorityEntry> = Vec::new();
        for entry in self
            .exact
            .iter()
            .chain(&self.term)
            .chain(&self.potential)
            .copied()
        {
            if !seen.iter().any(|e| e.root == entry.root) {
                seen.push(entry);
            }
        }

        let term_lower = term.to_lowercase();
        if term.chars().count() == 1 {
            // One letter would relate to most of the table.
            seen.retain(|entry| {
                entry.root.starts_with(term)
                    || entry
                        .preferred
                        .search_terms
                        .iter()
                        .any(|a| a.to_lowercase().starts_with(&term_lower))
            });
        } else {
            // Symbol overlap alone is not enough: short roots such as `T`
            // are contained in most raw symbols.
            seen.retain(|entry| {
                entry.root.contains(term)
                    || entry.preferred.name.to_uppercase().contains(term)
                    || entry.preferred.search_terms.iter().any(|a| {
                        let a = a.to_lowercase();
                        a.contains(&term_lower) || term_lower.contains(&a)
                    })
            });
        }

        seen
    }
}

/// Normalised query, or a term recovered from the first candidate.
fn search_term(raw: &[SuggestionCandidate], query: &str) -> Option<String> {
    let query = query.trim().to_uppercase();
    if !query.is_empty() {
        return Some(query);
    }

    let first = raw.first()?;
    let fallback = if first.symbol.trim().is_empty() {
        first.name.trim()
    } else {
        first.symbol.trim()
    };
    (!fallback.is_empty()).then(|| fallback.to_uppercase())
}

/// Whether a raw candidate refers to the same instrument family as a root.
fn overlaps_root(candidate: &SuggestionCandidate, root: &str, preferred_name_upper: &str) -> bool {
    let symbol_overlap = !candidate.symbol.is_empty() && {
        let symbol = candidate.symbol.to_uppercase();
        candidate.symbol == root || symbol.contains(root) || root.contains(&symbol)
    };
    let name_overlap = !candidate.name.is_empty() && {
        let name = candidate.name.to_uppercase();
        name.contains(root) || preferred_name_upper.contains(&name)
    };
    symbol_overlap || name_overlap
}

/// Ticker without exchange prefix and USD/USDT quote suffix.
///
/// `"BINANCE:BTCUSDT"` -> `"BTC"`, `"AAPL"` -> `"AAPL"`.
pub fn base_symbol(symbol: &str) -> &str {
    let ticker = symbol.rsplit(':').next().unwrap_or(symbol);
    ticker
        .strip_suffix("USDT")
        .or_else(|| ticker.strip_suffix("USD"))
        .unwrap_or(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(symbol: &str, exchange: &str, name: &str) -> SuggestionCandidate {
        SuggestionCandidate::new(symbol, exchange, name)
    }

    fn symbols(ranked: &[RankedSuggestion]) -> Vec<String> {
        ranked
            .iter()
            .map(|s| format!("{}@{}", s.candidate.symbol, s.candidate.exchange))
            .collect()
    }

    #[test]
    fn test_base_symbol() {
        assert_eq!(base_symbol("BINANCE:BTCUSDT"), "BTC");
        assert_eq!(base_symbol("ETHUSD"), "ETH");
        assert_eq!(base_symbol("AAPL"), "AAPL");
        assert_eq!(base_symbol("A:B:USDUSD"), "USD");
        assert_eq!(base_symbol(""), "");
    }

    #[test]
    fn test_btc_injects_binance_pair_first() {
        let raw = vec![listing("XBT", "KRAKEN", "Bitcoin")];
        let ranked = rank(&raw, "btc");

        let first = &ranked[0];
        assert_eq!(first.candidate.symbol, "BTCUSD");
        assert_eq!(first.candidate.exchange, "BINANCE");
        assert!(first.is_preferred_match);
        assert!(first.is_exact_term_match);
        assert!(symbols(&ranked).contains(&"XBT@KRAKEN".to_string()));
    }

    #[test]
    fn test_appl_ranks_apple_above_unrelated_substring_match() {
        let raw = vec![
            listing("APLD", "NASDAQ", "Applied Digital Corporation"),
            listing("AAPL", "NASDAQ", "Apple Inc."),
        ];
        let ranked = rank(&raw, "appl");
        let order = symbols(&ranked);

        let apple = order.iter().position(|s| s == "AAPL@NASDAQ").unwrap();
        let applied = order.iter().position(|s| s == "APLD@NASDAQ").unwrap();
        assert!(apple < applied);
        assert!(ranked[apple].is_preferred_match);
        // Already present, so not duplicated.
        assert_eq!(order.iter().filter(|s| *s == "AAPL@NASDAQ").count(), 1);
    }

    #[test]
    fn test_single_letter_query_does_not_over_match() {
        let raw = vec![
            listing("C", "NYSE", "Citigroup Inc."),
            listing("CAT", "NYSE", "Caterpillar Inc."),
            listing("TSLA", "NASDAQ", "Tesla, Inc."),
            listing("MA", "NYSE", "Mastercard Incorporated"),
        ];
        let ranked = rank(&raw, "c");
        let table = PriorityTable::global();

        for s in ranked.iter().filter(|s| s.is_preferred_match) {
            let root = table
                .entries()
                .iter()
                .find(|e| e.preferred.same_listing(&s.candidate))
                .unwrap();
            let alias_hit = root.preferred.search_terms.iter().any(|a| a.starts_with('c'));
            assert!(
                root.root.starts_with('C') || alias_hit,
                "unexpected root {} for query C",
                root.root
            );
        }
        assert_eq!(ranked[0].candidate.symbol, "C");
        assert!(ranked[0].is_exact_term_match);
        assert!(!ranked
            .iter()
            .any(|s| s.candidate.symbol == "TSLA" && s.is_preferred_match));
    }

    #[test]
    fn test_exact_entries_sort_before_unflagged() {
        let raw = vec![
            listing("TSLQ", "NASDAQ", "Tradr TSLA Short"),
            listing("TSLL", "NASDAQ", "Direxion Daily TSLA Bull"),
            listing("TSLA", "NASDAQ", "Tesla, Inc."),
        ];
        let ranked = rank(&raw, "tsla");

        let last_exact = ranked.iter().rposition(|s| s.is_exact_term_match).unwrap();
        let first_unflagged = ranked
            .iter()
            .position(|s| !s.is_exact_term_match && !s.is_preferred_match)
            .unwrap();
        assert!(last_exact < first_unflagged);
        assert_eq!(ranked[0].candidate.symbol, "TSLA");
    }

    #[test]
    fn test_alias_is_exact_term() {
        let ranked = rank(&[listing("GOOGL", "NASDAQ", "Alphabet Inc.")], "google");
        let googl = ranked
            .iter()
            .find(|s| s.candidate.symbol == "GOOGL")
            .unwrap();
        assert!(googl.is_exact_term_match);
        assert!(googl.is_preferred_match);
    }

    #[test]
    fn test_empty_query_falls_back_to_first_candidate() {
        let raw = vec![listing("ETH", "COINBASE", "Ethereum")];
        let ranked = rank(&raw, "   ");
        assert_eq!(ranked[0].candidate.symbol, "ETHUSD");
        assert!(ranked[0].is_exact_term_match);

        // A fallback term no root relates to injects nothing.
        let raw = vec![listing("ETHUSDT", "BINANCE", "Ethereum / TetherUS")];
        assert_eq!(symbols(&rank(&raw, "")), vec!["ETHUSDT@BINANCE"]);
    }

    #[test]
    fn test_short_roots_are_not_injected_for_longer_queries() {
        let raw = vec![
            listing("APLD", "NASDAQ", "Applied Digital Corporation"),
            listing("AAPL", "NASDAQ", "Apple Inc."),
        ];
        let ranked = rank(&raw, "appl");
        assert_eq!(symbols(&ranked), vec!["AAPL@NASDAQ", "APLD@NASDAQ"]);

        let ranked = rank(&[listing("TSLA", "NASDAQ", "Tesla, Inc.")], "tsla");
        assert_eq!(symbols(&ranked), vec!["TSLA@NASDAQ"]);
        assert!(ranked[0].is_exact_term_match);
        for unrelated in ["T@NYSE", "C@NYSE"] {
            assert!(!symbols(&ranked).iter().any(|s| s == unrelated));
        }
    }

    #[test]
    fn test_alias_inside_query_keeps_short_root() {
        // Neither "C" nor "Citigroup Inc." contains the query, but the
        // alias "citibank" is part of it.
        let raw = vec![listing("CCB", "NYSE", "Citibank Credit Bond")];
        let ranked = rank(&raw, "citibank credit");
        assert_eq!(symbols(&ranked), vec!["C@NYSE", "CCB@NYSE"]);
        assert!(ranked[0].is_preferred_match);
        assert!(!ranked[0].is_exact_term_match);
    }

    #[test]
    fn test_no_term_passes_input_through() {
        let raw = vec![SuggestionCandidate::default(), listing("X", "NYSE", "")];
        let ranked = rank(&raw, "");
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| !s.is_preferred_match && !s.is_exact_term_match));
        assert_eq!(ranked[1].candidate.symbol, "X");

        assert!(rank(&[], "").is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let table = PriorityTable::new(Vec::new());
        let raw = vec![
            listing("ZZZ1", "X", "one"),
            listing("ZZZ2", "X", "two"),
            listing("ZZZ3", "X", "three"),
        ];
        let ranked = Ranker::new(&table).rank(&raw, "qqq");
        assert_eq!(symbols(&ranked), vec!["ZZZ1@X", "ZZZ2@X", "ZZZ3@X"]);
    }

    #[test]
    fn test_crypto_usd_pair_breaks_ties() {
        let table = PriorityTable::new(Vec::new());
        let raw = vec![
            listing("FOOEUR", "KRAKEN", "Foo Euro").with_type("crypto"),
            listing("FOOUSD", "KRAKEN", "Foo Dollar").with_type("crypto"),
        ];
        let ranked = Ranker::new(&table).rank(&raw, "zzz");
        assert_eq!(ranked[0].candidate.symbol, "FOOUSD");
    }

    #[test]
    fn test_ranking_does_not_mutate_table() {
        let _ = rank(&[listing("XBT", "KRAKEN", "Bitcoin")], "btc");
        let table = PriorityTable::global();
        let btc = table.get("BTC").unwrap();
        // Flags live on the ranked copy only.
        assert_eq!(btc.preferred.symbol, "BTCUSD");
        let again = rank(&[], "zzzz");
        assert!(again.iter().all(|s| !s.is_preferred_match));
    }
}
