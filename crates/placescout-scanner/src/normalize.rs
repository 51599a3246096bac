//! Field normalization.
//!
//! Every function takes the raw text a driver read for one field and returns
//! the normalized value, or `None` when nothing usable is left. None of them
//! fail: unparsable input simply becomes an unknown field.

use once_cell::sync::Lazy;
use placescout_core::Rating;
use regex::Regex;

static FIRST_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("rating regex is hardcoded and valid"));

static COMPACT_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([km])\b").expect("compact count regex is hardcoded and valid")
});

static FIELD_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:address|phone|website|category)\s*:\s*")
        .expect("label regex is hardcoded and valid")
});

/// Collapse whitespace runs and trim. Empty input becomes `None`.
#[must_use]
pub fn clean_text(raw: &str) -> Option<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Drop an accessibility label such as `"Address: "` from the front of a value.
fn strip_label(raw: &str) -> &str {
    match FIELD_LABEL.find(raw) {
        Some(label) => &raw[label.end()..],
        None => raw,
    }
}

/// Normalize a free-text field (name, category).
#[must_use]
pub fn normalize_text(raw: &str) -> Option<String> {
    clean_text(strip_label(raw))
}

/// Join a multi-line address into one line.
#[must_use]
pub fn normalize_address(raw: &str) -> Option<String> {
    let lines: Vec<String> = strip_label(raw)
        .lines()
        .filter_map(|line| clean_text(line.trim_end().trim_end_matches(',')))
        .collect();
    (!lines.is_empty()).then(|| lines.join(", "))
}

/// Keep only the characters that belong in a displayed phone number.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let kept: String = strip_label(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | '.') || c.is_whitespace())
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    clean_text(&kept)
}

/// Normalize a website, unwrapping search-engine redirect links.
#[must_use]
pub fn normalize_website(raw: &str) -> Option<String> {
    let text = clean_text(strip_label(raw))?;

    if let Ok(url) = url::Url::parse(&text) {
        let is_google = url
            .host_str()
            .is_some_and(|host| host.starts_with("www.google.") || host.starts_with("google."));

        if is_google && url.path() == "/url" {
            if let Some((_, target)) = url.query_pairs().find(|(key, _)| *key == "q" || *key == "url") {
                return clean_text(&target);
            }
        }
    }

    Some(text)
}

/// Parse the first number in a rating text such as `"4.5 stars"` or `"4,5"`.
///
/// Values outside `[0.0, 5.0]` are rejected.
#[must_use]
pub fn parse_rating(raw: &str) -> Option<Rating> {
    let number = FIRST_DECIMAL.find(raw)?.as_str().replace(',', ".");
    number.parse::<f64>().ok().and_then(Rating::new)
}

/// Parse a review count such as `"(1,234)"`, `"1.234 reviews"` or `"1.2K"`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_review_count(raw: &str) -> Option<u64> {
    if let Some(caps) = COMPACT_COUNT.captures(raw) {
        let value: f64 = caps[1].replace(',', ".").parse().ok()?;
        let multiplier = match caps[2].to_ascii_lowercase().as_str() {
            "k" => 1_000.0,
            _ => 1_000_000.0,
        };
        let expanded = (value * multiplier).round();
        return (expanded.is_finite() && expanded >= 0.0).then_some(expanded as u64);
    }

    // without a suffix every separator is a thousands separator
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
