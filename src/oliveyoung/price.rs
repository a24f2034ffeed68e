//! Price and discount extraction from free-form card text.
//!
//! Cards print prices in several shapes ("US$ 25.99", "$1,299.00",
//! "Value US$30.00", "정가 US$30.00", "13%"), so extraction is a set of small
//! regex helpers tried in tiers by the parser.

use regex_lite::Regex;
use std::sync::LazyLock;

static THOUSANDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d),(\d{3})").unwrap());

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

static USD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:US)?\$\s*(\d+(?:\.\d+)?)").unwrap());

static VALUE_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:정가|Value)\s*[: ]?\s*(?:US)?\$\s*(\d+(?:\.\d+)?)").unwrap()
});

/// Collapses whitespace runs (including newlines and `&nbsp;`) and trims.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unicode spaces to ASCII; the price patterns only know `\s` as ASCII.
fn ascii_spaces(text: &str) -> String {
    text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }).collect()
}

/// Removes thousands separators sitting between digits ("1,234,567" -> "1234567").
fn strip_thousands(text: &str) -> String {
    let mut current = ascii_spaces(text);
    // Overlapping groups need a second pass ("1,234,567").
    loop {
        let next = THOUSANDS.replace_all(&current, "${1}${2}").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Extracts the first number in the text.
pub fn to_float(text: &str) -> Option<f64> {
    let text = strip_thousands(text);
    NUMBER.find(&text).and_then(|m| m.as_str().parse().ok())
}

/// Extracts the first dollar amount ("US$ 25.99" or "$25.99").
pub fn parse_usd(text: &str) -> Option<f64> {
    let text = strip_thousands(text);
    USD.captures(&text).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Extracts a labelled list price ("Value US$30.00" / "정가 US$30.00").
pub fn parse_value_price(text: &str) -> Option<f64> {
    let text = strip_thousands(text);
    VALUE_PRICE.captures(&text).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Discount percent, floored.
///
/// A printed rate wins over the computed one. Without a printed rate the
/// discount is derived from the two prices and never goes below zero.
pub fn discount_percent_floor(
    original: Option<f64>,
    sale: Option<f64>,
    percent_text: Option<&str>,
) -> Option<u8> {
    if let Some(pct) = percent_text.and_then(to_float) {
        return Some(pct.floor().clamp(0.0, 100.0) as u8);
    }

    match (original, sale) {
        (Some(orig), Some(sale)) if orig > 0.0 => {
            let pct = (1.0 - sale / orig) * 100.0;
            Some(pct.floor().clamp(0.0, 100.0) as u8)
        }
        _ => None,
    }
}

/// Discount percent, rounded to the nearest integer. Zero when the list
/// price is missing or either value is not finite.
pub fn pct_round(current: f64, original: f64) -> u8 {
    if original <= 0.0 || !current.is_finite() || !original.is_finite() {
        return 0;
    }
    (100.0 * (1.0 - current / original)).max(0.0).round().min(100.0) as u8
}
