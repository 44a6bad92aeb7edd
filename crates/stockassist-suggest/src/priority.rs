//! Curated primary listings.
//!
//! Each root symbol maps to the one listing users almost always mean when
//! they type it. Crypto roots point at the BINANCE USD pair; equities point
//! at their primary US listing and carry a few aliases for name search.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use stockassist_core::SuggestionCandidate;

const CRYPTO_EXCHANGE: &str = "BINANCE";

const CRYPTO_ROOTS: &[(&str, &str)] = &[
    ("BTC", "Bitcoin USD"),
    ("ETH", "Ethereum USD"),
    ("XRP", "Ripple USD"),
    ("SOL", "Solana USD"),
    ("DOGE", "Dogecoin USD"),
    ("ADA", "Cardano USD"),
    ("DOT", "Polkadot USD"),
    ("AVAX", "Avalanche USD"),
    ("MATIC", "Polygon USD"),
    ("LINK", "Chainlink USD"),
    ("UNI", "Uniswap USD"),
    ("SHIB", "Shiba Inu USD"),
    ("LTC", "Litecoin USD"),
    ("BCH", "Bitcoin Cash USD"),
    ("ATOM", "Cosmos USD"),
    ("XLM", "Stellar USD"),
    ("ALGO", "Algorand USD"),
    ("FIL", "Filecoin USD"),
    ("ETC", "Ethereum Classic USD"),
    ("NEAR", "NEAR Protocol USD"),
];

type EquityRow = (&'static str, &'static str, &'static str, &'static [&'static str]);

const EQUITIES: &[EquityRow] = &[
    // Technology
    ("AAPL", "NASDAQ", "Apple Inc.", &["apple"]),
    ("MSFT", "NASDAQ", "Microsoft Corporation", &["microsoft"]),
    ("GOOGL", "NASDAQ", "Alphabet Inc.", &["google", "alphabet"]),
    ("GOOG", "NASDAQ", "Alphabet Inc. Class C", &["google", "alphabet"]),
    ("AMZN", "NASDAQ", "Amazon.com, Inc.", &["amazon"]),
    ("TSLA", "NASDAQ", "Tesla, Inc.", &["tesla"]),
    ("META", "NASDAQ", "Meta Platforms, Inc.", &["facebook", "meta"]),
    ("NVDA", "NASDAQ", "NVIDIA Corporation", &["nvidia"]),
    ("NFLX", "NASDAQ", "Netflix, Inc.", &["netflix"]),
    ("INTC", "NASDAQ", "Intel Corporation", &["intel"]),
    ("AMD", "NASDAQ", "Advanced Micro Devices, Inc.", &["amd"]),
    ("CRM", "NYSE", "Salesforce, Inc.", &["salesforce"]),
    ("CSCO", "NASDAQ", "Cisco Systems, Inc.", &["cisco"]),
    ("ORCL", "NYSE", "Oracle Corporation", &["oracle"]),
    ("IBM", "NYSE", "International Business Machines", &["ibm"]),
    ("ADBE", "NASDAQ", "Adobe Inc.", &["adobe"]),
    ("PYPL", "NASDAQ", "PayPal Holdings, Inc.", &["paypal"]),
    ("QCOM", "NASDAQ", "Qualcomm Incorporated", &["qualcomm"]),
    ("TXN", "NASDAQ", "Texas Instruments Incorporated", &["texas instruments"]),
    // Financials
    ("JPM", "NYSE", "JPMorgan Chase & Co.", &["jpmorgan", "chase"]),
    ("BAC", "NYSE", "Bank of America Corporation", &["bank of america"]),
    ("WFC", "NYSE", "Wells Fargo & Company", &["wells fargo"]),
    ("C", "NYSE", "Citigroup Inc.", &["citi", "citigroup", "citibank"]),
    ("GS", "NYSE", "The Goldman Sachs Group, Inc.", &["goldman", "goldman sachs"]),
    ("MS", "NYSE", "Morgan Stanley", &["morgan"]),
    ("V", "NYSE", "Visa Inc.", &["visa", "visa inc"]),
    ("MA", "NYSE", "Mastercard Incorporated", &["mastercard", "master card"]),
    ("AXP", "NYSE", "American Express Company", &["american express", "amex"]),
    // Healthcare
    ("JNJ", "NYSE", "Johnson & Johnson", &["johnson"]),
    ("PFE", "NYSE", "Pfizer Inc.", &["pfizer"]),
    ("ABBV", "NYSE", "AbbVie Inc.", &["abbvie"]),
    ("MRK", "NYSE", "Merck & Co., Inc.", &["merck"]),
    ("UNH", "NYSE", "UnitedHealth Group Incorporated", &["unitedhealth", "united health"]),
    ("BMY", "NYSE", "Bristol-Myers Squibb Company", &["bristol", "squibb"]),
    ("TMO", "NYSE", "Thermo Fisher Scientific Inc.", &["thermo", "fisher"]),
    ("ABT", "NYSE", "Abbott Laboratories", &["abbott"]),
    // Consumer
    ("KO", "NYSE", "The Coca-Cola Company", &["coca", "cola", "coke"]),
    ("PEP", "NASDAQ", "PepsiCo, Inc.", &["pepsi", "pepsico"]),
    ("MCD", "NYSE", "McDonald's Corporation", &["mcdonald", "mcdonalds"]),
    ("NKE", "NYSE", "NIKE, Inc.", &["nike"]),
    ("WMT", "NYSE", "Walmart Inc.", &["walmart", "wal-mart"]),
    ("PG", "NYSE", "The Procter & Gamble Company", &["procter", "gamble", "p&g"]),
    ("COST", "NASDAQ", "Costco Wholesale Corporation", &["costco"]),
    ("HD", "NYSE", "The Home Depot, Inc.", &["home depot"]),
    ("DIS", "NYSE", "The Walt Disney Company", &["disney", "walt"]),
    // Energy
    ("XOM", "NYSE", "Exxon Mobil Corporation", &["exxon", "mobil"]),
    ("CVX", "NYSE", "Chevron Corporation", &["chevron"]),
    ("COP", "NYSE", "ConocoPhillips", &["conoco", "phillips"]),
    ("BP", "NYSE", "BP p.l.c.", &["british petroleum"]),
    ("SHEL", "NYSE", "Shell plc", &["shell"]),
    // Telecom
    ("VZ", "NYSE", "Verizon Communications Inc.", &["verizon"]),
    ("T", "NYSE", "AT&T Inc.", &["at&t"]),
    // Other large caps
    ("BRK.A", "NYSE", "Berkshire Hathaway Inc.", &["berkshire", "buffett"]),
    ("BRK.B", "NYSE", "Berkshire Hathaway Inc.", &["berkshire", "buffett"]),
    ("BABA", "NYSE", "Alibaba Group Holding Limited", &["alibaba"]),
    ("TSM", "NYSE", "Taiwan Semiconductor Manufacturing Company", &["taiwan", "semiconductor"]),
    ("SHOP", "NYSE", "Shopify Inc.", &["shopify"]),
    ("SE", "NYSE", "Sea Limited", &["sea"]),
    ("TCEHY", "OTC", "Tencent Holdings Limited", &["tencent"]),
    ("UBER", "NYSE", "Uber Technologies, Inc.", &["uber"]),
    ("ABNB", "NASDAQ", "Airbnb, Inc.", &["airbnb"]),
    ("ZM", "NASDAQ", "Zoom Video Communications, Inc.", &["zoom"]),
    ("SQ", "NYSE", "Block, Inc.", &["square", "block"]),
    ("PLTR", "NYSE", "Palantir Technologies Inc.", &["palantir"]),
    ("GME", "NYSE", "GameStop Corp.", &["gamestop"]),
    ("AMC", "NYSE", "AMC Entertainment Holdings, Inc.", &["amc"]),
];

static GLOBAL_TABLE: Lazy<PriorityTable> = Lazy::new(PriorityTable::curated);

/// One root and its preferred listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityEntry {
    /// Canonical root symbol (uppercase).
    pub root: String,
    pub preferred: SuggestionCandidate,
}

/// Ordered, read-only map from root symbol to preferred listing.
#[derive(Debug, Clone)]
pub struct PriorityTable {
    entries: Vec<PriorityEntry>,
    by_root: HashMap<String, usize>,
}

impl PriorityTable {
    /// Build a table from entries. Later duplicates of a root are ignored.
    pub fn new(entries: Vec<PriorityEntry>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut by_root = HashMap::with_capacity(entries.len());
        for entry in entries {
            if by_root.contains_key(&entry.root) {
                continue;
            }
            by_root.insert(entry.root.clone(), kept.len());
            kept.push(entry);
        }
        Self {
            entries: kept,
            by_root,
        }
    }

    /// The process-wide curated table.
    pub fn global() -> &'static PriorityTable {
        &GLOBAL_TABLE
    }

    fn curated() -> Self {
        let crypto = CRYPTO_ROOTS.iter().map(|(root, name)| PriorityEntry {
            root: (*root).to_string(),
            preferred: SuggestionCandidate::new(format!("{root}USD"), CRYPTO_EXCHANGE, *name)
                .with_type("crypto"),
        });
        let equities = EQUITIES
            .iter()
            .map(|(root, exchange, name, aliases)| PriorityEntry {
                root: (*root).to_string(),
                preferred: SuggestionCandidate::new(*root, *exchange, *name)
                    .with_search_terms(aliases.iter().copied()),
            });
        Self::new(crypto.chain(equities).collect())
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[PriorityEntry] {
        &self.entries
    }

    pub fn get(&self, root: &str) -> Option<&PriorityEntry> {
        self.by_root.get(root).map(|&idx| &self.entries[idx])
    }

    pub fn contains_root(&self, root: &str) -> bool {
        self.by_root.contains_key(root)
    }

    /// Whether `candidate` is the preferred listing of any root.
    pub fn is_preferred_listing(&self, candidate: &SuggestionCandidate) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.preferred.same_listing(candidate))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
