//! Comma-separated symbol input.
//!
//! The symbol box holds a list like `"AAPL, MSFT, goo"`; only the text after
//! the last comma is being typed.

/// The term currently being typed.
pub fn active_term(input: &str) -> &str {
    input.rsplit(',').next().unwrap_or(input).trim()
}

/// Replace the term being typed with `symbol`, ready for the next entry.
///
/// `append_symbol("AAPL, ms", "MSFT") == "AAPL, MSFT, "`
pub fn append_symbol(input: &str, symbol: &str) -> String {
    let mut parts: Vec<&str> = input.split(',').map(str::trim).collect();
    parts.pop();
    parts.retain(|p| !p.is_empty());
    parts.push(symbol);

    let mut out = parts.join(", ");
    out.push_str(", ");
    out
}

/// Strip an exchange prefix: `"NASDAQ:AAPL"` -> `"AAPL"`.
pub fn plain_symbol(symbol: &str) -> &str {
    match symbol.split_once(':') {
        Some((_, rest)) => rest.split(':').next().unwrap_or(rest),
        None => symbol,
    }
}

/// Every symbol in the input, exchange prefixes stripped, uppercased.
pub fn selected_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| plain_symbol(p).to_uppercase())
        .collect()
}
