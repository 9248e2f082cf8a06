//! Pure cell-text helpers: footnote stripping, frequency classification,
//! numeric coercion and key normalization.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Frequency;

static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("valid regex"));
static ANNUAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));
static MONTHLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\s+[A-Za-z]+$").expect("valid regex"));
static QUARTERLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\s+Q[1-4]$").expect("valid regex"));

/// Split a header cell into its text and footnote id.
///
/// `"Food stores [note3]"` becomes `("Food stores", "Note3")`. Only the first
/// bracketed token is used as the id, but every bracketed token is removed.
pub fn clean_text(raw: Option<&str>) -> (String, String) {
    let Some(raw) = raw else {
        return (String::new(), String::new());
    };

    let note = FOOTNOTE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| capitalize(m.as_str()))
        .unwrap_or_default();
    let cleaned = FOOTNOTE.replace_all(raw, "").trim().to_string();

    (cleaned, note)
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl Frequency {
    /// Classify a date label by its lexical shape.
    pub fn classify(label: &str) -> Self {
        let label = label.trim();
        if ANNUAL.is_match(label) {
            Frequency::Annual
        } else if MONTHLY.is_match(label) {
            Frequency::Monthly
        } else if QUARTERLY.is_match(label) {
            Frequency::Quarterly
        } else {
            Frequency::Unknown
        }
    }
}

/// Parse a cell as a finite number.
pub fn coerce_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Non-blank, trimmed text of a cell.
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Description key used for case-insensitive lookups.
pub fn normalize_description(desc: &str) -> String {
    desc.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footnote_extracted() {
        assert_eq!(
            clean_text(Some("12.3 [a]")),
            ("12.3".to_string(), "A".to_string())
        );
    }

    #[test]
    fn test_no_footnote() {
        assert_eq!(clean_text(Some("12.3")), ("12.3".to_string(), String::new()));
    }

    #[test]
    fn test_absent_cell() {
        assert_eq!(clean_text(None), (String::new(), String::new()));
    }

    #[test]
    fn test_only_first_footnote_kept_all_removed() {
        let (text, note) = clean_text(Some("All retailing [NOTE1] excl fuel [x]"));
        assert_eq!(text, "All retailing  excl fuel");
        assert_eq!(note, "Note1");
    }

    #[test]
    fn test_frequency_examples() {
        assert_eq!(Frequency::classify("2023"), Frequency::Annual);
        assert_eq!(Frequency::classify("2023 Jan"), Frequency::Monthly);
        assert_eq!(Frequency::classify("2023 Q2"), Frequency::Quarterly);
        assert_eq!(Frequency::classify("abc"), Frequency::Unknown);
    }

    #[test]
    fn test_frequency_edge_shapes() {
        assert_eq!(Frequency::classify("  2023  "), Frequency::Annual);
        assert_eq!(Frequency::classify("2023   September"), Frequency::Monthly);
        assert_eq!(Frequency::classify("2023 Q5"), Frequency::Unknown);
        assert_eq!(Frequency::classify("23 Jan"), Frequency::Unknown);
        assert_eq!(Frequency::classify(""), Frequency::Unknown);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(" 101.5 "), Some(101.5));
        assert_eq!(coerce_number("-3"), Some(-3.0));
        assert_eq!(coerce_number("[x]"), None);
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("NaN"), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(
            normalize_description("  All Businesses, Not Seasonally Adjusted "),
            "all businesses, not seasonally adjusted"
        );
    }
}
