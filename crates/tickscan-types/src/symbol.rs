//! Exchange symbol normalization.

/// Suffixes stripped from hyphenated symbols (`BTC-USDT-SWAP`), longest first.
const HYPHEN_SUFFIXES: &[&str] = &[
    "-USDT-SWAP",
    "-USDT",
    "-USD-SWAP",
    "-USD",
    "-PERP",
    "-FUTURE",
    "-SWAP",
];

/// Quote assets stripped from concatenated symbols (`BTCUSDT`).
const QUOTE_SUFFIXES: &[&str] = &["USDT_UMCBL", "USDT", "BUSD", "USDC", "TUSD", "USD", "DAI"];

/// Strips the quote asset from a raw exchange symbol.
///
/// The symbol is uppercased first. Symbols without a known suffix pass
/// through unchanged (but uppercased).
///
/// ```
/// use tickscan_types::clean_symbol;
///
/// assert_eq!(clean_symbol("btcusdt"), "BTC");
/// assert_eq!(clean_symbol("ETH-USDT-SWAP"), "ETH");
/// assert_eq!(clean_symbol("XAUEUR"), "XAUEUR");
/// ```
#[must_use]
pub fn clean_symbol(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let suffixes = if upper.contains('-') {
        HYPHEN_SUFFIXES
    } else {
        QUOTE_SUFFIXES
    };

    suffixes
        .iter()
        .find_map(|suffix| upper.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
        .map_or_else(|| upper.clone(), str::to_string)
}
