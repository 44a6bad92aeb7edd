//! Symbol search candidates.

use serde::{Deserialize, Serialize};

/// One tradable instrument returned by symbol search.
///
/// Every field is optional on the wire; missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    /// Exchange-local ticker (e.g., "AAPL", "BTCUSD").
    #[serde(default)]
    pub symbol: String,
    /// Listing exchange (e.g., "NASDAQ", "BINANCE").
    #[serde(default)]
    pub exchange: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Asset classification ("crypto", "stock").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    /// Screener the listing belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screener: Option<String>,
    /// Alias strings used for fuzzy matching.
    #[serde(rename = "searchTerms", default, skip_serializing_if = "Vec::is_empty")]
    pub search_terms: Vec<String>,
}

impl SuggestionCandidate {
    /// Create a candidate with symbol, exchange and name.
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the asset classification (also used as screener).
    pub fn with_type(mut self, asset_type: impl Into<String>) -> Self {
        let asset_type = asset_type.into();
        self.screener = Some(asset_type.clone());
        self.asset_type = Some(asset_type);
        self
    }

    /// Set the alias list.
    pub fn with_search_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Classification, falling back to the screener when `type` is absent.
    pub fn classification(&self) -> Option<&str> {
        self.asset_type.as_deref().or(self.screener.as_deref())
    }

    /// Whether this is a crypto listing.
    pub fn is_crypto(&self) -> bool {
        self.classification() == Some("crypto")
    }

    /// Whether two candidates denote the same listing (symbol + exchange).
    pub fn same_listing(&self, other: &SuggestionCandidate) -> bool {
        self.symbol == other.symbol && self.exchange == other.exchange
    }
}
