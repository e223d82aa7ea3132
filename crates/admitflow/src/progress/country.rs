//! Country name normalization.
//!
//! Every country comparison in the engine goes through [`normalize_country`]
//! first, so "U.K." on a university and "United Kingdom" on a profile agree.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Static patterns - compiled once
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ALIAS_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z0-9]").unwrap());

pub const UNITED_KINGDOM: &str = "UNITED KINGDOM";
pub const UNITED_STATES: &str = "UNITED STATES";

/// Normalizes a country name to its canonical upper-case form.
///
/// "UK", "U.K." and "U.K" become `UNITED KINGDOM`; "USA", "US", "U.S." and
/// "United States of America" become `UNITED STATES`. Anything else is
/// upper-cased with whitespace collapsed. Idempotent.
pub fn normalize_country(name: &str) -> String {
    let collapsed = WHITESPACE_REGEX
        .replace_all(name.trim(), " ")
        .to_uppercase();

    match alias_key(&collapsed).as_str() {
        "UK" => UNITED_KINGDOM.to_string(),
        "US" | "USA" | "UNITEDSTATESOFAMERICA" => UNITED_STATES.to_string(),
        _ => collapsed,
    }
}

/// Like [`normalize_country`], then maps through configured extra aliases.
///
/// Alias keys and values are normalized before comparison, so configuration
/// may spell them however it likes.
pub fn normalize_country_with(name: &str, aliases: &HashMap<String, String>) -> String {
    let normalized = normalize_country(name);
    aliases
        .iter()
        .find(|(alias, _)| normalize_country(alias) == normalized)
        .map(|(_, canonical)| normalize_country(canonical))
        .unwrap_or(normalized)
}

/// Returns true if both names are non-empty and normalize to the same country.
pub fn countries_match(
    left: Option<&str>,
    right: Option<&str>,
    aliases: &HashMap<String, String>,
) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => {
            let l = normalize_country_with(l, aliases);
            !l.is_empty() && l == normalize_country_with(r, aliases)
        }
        _ => false,
    }
}

/// Letters and digits only, used to match punctuation variants of an alias
fn alias_key(upper: &str) -> String {
    ALIAS_KEY_REGEX.replace_all(upper, "").into_owned()
}
