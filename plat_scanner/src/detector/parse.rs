//! Parsing of the detector's free-text answer

use super::Detection;
use lazy_static::lazy_static;
use plat_common::RelicRarity;
use regex::Regex;

/// Phrases meaning the model could not read the screenshot
const ERROR_INDICATORS: [&str; 8] = [
    "impossible to provide",
    "cannot identify",
    "unable to detect",
    "no prime parts",
    "could not analyze",
    "cannot analyze",
    "not a valid",
    "not readable",
];

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").unwrap();
    static ref RELIC: Regex = Regex::new(
        r"(?i)^(lith|meso|neo|axi|requiem)\s+([a-z]{1,2}\d{1,2}|[ivx]{1,4})(?:\s+relic)?(?:\s*[\[(]?\s*(intact|exceptional|flawless|radiant)\s*[\])]?)?$"
    )
    .unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
}

pub fn is_error_response(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Parse the detector's answer, one item per line, in order.
///
/// An answer containing one of the "can't read this" phrases yields nothing.
pub fn parse_detections(text: &str) -> Vec<Detection> {
    if is_error_response(text) {
        log::info!("Detector could not read the image");
        return Vec::new();
    }

    text.lines().filter_map(parse_line).collect()
}

/// Parse a single answer line; chatter and blank lines give `None`.
pub fn parse_line(line: &str) -> Option<Detection> {
    let line = LIST_MARKER.replace(line.trim(), "");
    let line = SPACES.replace_all(line.trim_matches('*').trim(), " ");
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = RELIC.captures(&line) {
        let era = capitalize(&caps[1]);
        let code = caps[2].to_uppercase();
        let rarity = caps.get(3).and_then(|m| RelicRarity::from_name(m.as_str()));
        return Some(Detection::relic(format!("{era} {code} Relic"), rarity));
    }

    if line.contains("Prime") {
        return Some(Detection::prime_part(line.to_string()));
    }

    None
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plat_common::ItemCategory;

    #[test]
    fn parses_one_prime_part_per_line() {
        let text = "Mirage Prime Blueprint\nKronen Prime Blade\n\n  Burston Prime Receiver  \n";
        let names: Vec<String> = parse_detections(text).into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "Mirage Prime Blueprint",
                "Kronen Prime Blade",
                "Burston Prime Receiver"
            ]
        );
    }

    #[test]
    fn strips_list_markers_and_bold() {
        assert_eq!(
            parse_line("- Ash Prime Systems").unwrap().name,
            "Ash Prime Systems"
        );
        assert_eq!(
            parse_line("2. **Nikana Prime Hilt**").unwrap().name,
            "Nikana Prime Hilt"
        );
        assert_eq!(
            parse_line("• Saryn  Prime   Neuroptics").unwrap().name,
            "Saryn Prime Neuroptics"
        );
    }

    #[test]
    fn recognises_relics_with_refinement() {
        let relic = parse_line("Lith A1 Relic [Radiant]").unwrap();
        assert_eq!(relic.name, "Lith A1 Relic");
        assert_eq!(relic.category, ItemCategory::Relic);
        assert_eq!(relic.rarity, Some(RelicRarity::Radiant));

        let relic = parse_line("axi s3 (flawless)").unwrap();
        assert_eq!(relic.name, "Axi S3 Relic");
        assert_eq!(relic.rarity, Some(RelicRarity::Flawless));

        let relic = parse_line("Neo V8 Relic Exceptional").unwrap();
        assert_eq!(relic.rarity, Some(RelicRarity::Exceptional));

        let relic = parse_line("Requiem IV Relic").unwrap();
        assert_eq!(relic.name, "Requiem IV Relic");
        assert_eq!(relic.rarity, None);
    }

    #[test]
    fn ignores_chatter() {
        assert!(parse_line("Here are the items I found:").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("Forma Blueprint").is_none());
        assert!(parse_line("Neo Prime").unwrap().category == ItemCategory::PrimePart);
    }

    #[test]
    fn error_phrases_mean_no_items() {
        let text = "I cannot identify any items. Mirage Prime Blueprint might be there.";
        assert!(parse_detections(text).is_empty());
        assert!(is_error_response("This image is NOT READABLE"));
        assert!(!is_error_response("Mirage Prime Blueprint"));
    }

    #[test]
    fn mixed_answer_keeps_order() {
        let text = "Mirage Prime Blueprint\nLith A1 Relic\n";
        let detections = parse_detections(text);
        assert_eq!(
            detections,
            [
                Detection::prime_part("Mirage Prime Blueprint"),
                Detection::relic("Lith A1 Relic", None),
            ]
        );
    }
}
