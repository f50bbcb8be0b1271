//! Item name to market slug normalization
//!
//! Rules, applied in order:
//! 1. a trailing `Blueprint` word is detached
//! 2. `&` becomes `_and_`
//! 3. the word `Prime` gets underscores on both sides (`Primed` is left alone)
//! 4. lowercase, whitespace to `_`, anything outside `[a-z0-9_]` dropped
//! 5. underscore runs collapse, leading/trailing underscores trimmed
//! 6. `_blueprint` is reattached

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TRAILING_BLUEPRINT: Regex =
        Regex::new(r"(?:(?i:(?:^|[\s_])blueprint)|Blueprint)\s*$").unwrap();
    static ref AMPERSAND: Regex = Regex::new(r"\s*&\s*").unwrap();
    static ref PRIME_WORD: Regex = Regex::new(r"Prime([^a-z]|$)").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9_]").unwrap();
    static ref UNDERSCORES: Regex = Regex::new(r"_+").unwrap();
}

/// Normalize a display name into the slug used by the market API.
///
/// Pure and idempotent. Garbage in yields a slug the market simply won't know.
pub fn normalize_item_name(name: &str) -> String {
    let trimmed = name.trim();

    let (rest, blueprint) = match TRAILING_BLUEPRINT.find(trimmed) {
        Some(m) => (&trimmed[..m.start()], true),
        None => (trimmed, false),
    };

    let slug = slugify(rest);
    match (blueprint, slug.is_empty()) {
        (false, _) => slug,
        (true, true) => "blueprint".to_string(),
        (true, false) => format!("{slug}_blueprint"),
    }
}

fn slugify(text: &str) -> String {
    let text = AMPERSAND.replace_all(text, "_and_");
    let text = PRIME_WORD.replace_all(&text, "_prime_${1}");
    let text = text.to_lowercase();
    let text = WHITESPACE.replace_all(&text, "_");
    let text = DISALLOWED.replace_all(&text, "");
    let text = UNDERSCORES.replace_all(&text, "_");
    text.trim_matches('_').to_string()
}
