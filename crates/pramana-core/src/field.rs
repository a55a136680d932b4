//! Per-field credit for the identification grader.

use crate::fuzzy::Similarity;
use crate::normalize::{extract_numbers, normalize_string, parse_number};

/// Fraction of the weight earned by a near-miss on a text field.
pub const FUZZY_CREDIT: f64 = 0.7;
/// Minimum similarity (0–100) for a near-miss on a text field.
pub const FUZZY_THRESHOLD: f64 = 80.0;

const SHARED_NUMBER_CREDIT: f64 = 0.8;
const ADJACENT_VERSE_CREDIT: f64 = 0.6;
const NEARBY_VERSE_CREDIT: f64 = 0.3;

/// How a field is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Author, work, book and chapter: exact, else fuzzy partial credit.
    ExactOrFuzzy,
    /// Verse: exact, else credit by numeric distance.
    NumericProximity,
}

impl MatchMode {
    /// The gold value that means "the corpus does not know".
    pub const fn sentinel(&self) -> &'static str {
        match self {
            Self::ExactOrFuzzy => "unknown",
            Self::NumericProximity => "0",
        }
    }
}

/// A gold field, classified before any comparison happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoldField {
    Absent,
    Sentinel,
    Present(String),
}

impl GoldField {
    /// Text fields are compared in normalized form, verses as trimmed raw text.
    pub fn classify(raw: Option<&str>, mode: MatchMode) -> Self {
        let value = match mode {
            MatchMode::ExactOrFuzzy => normalize_string(raw),
            MatchMode::NumericProximity => raw.map(|s| s.trim().to_string()).unwrap_or_default(),
        };
        if value.is_empty() {
            GoldField::Absent
        } else if value == mode.sentinel() {
            GoldField::Sentinel
        } else {
            GoldField::Present(value)
        }
    }

    /// Whether the field takes part in scoring at all.
    pub fn is_scored(&self) -> bool {
        matches!(self, GoldField::Present(_))
    }
}

/// Canonical produced value for a mode, matching how [`GoldField::classify`] canonicalizes gold.
pub fn canonical_produced(raw: Option<&str>, mode: MatchMode) -> String {
    match mode {
        MatchMode::ExactOrFuzzy => normalize_string(raw),
        MatchMode::NumericProximity => raw.map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}

/// Credit in [0, 1] for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldMatcher {
    similarity: Similarity,
}

impl FieldMatcher {
    pub fn new(similarity: Similarity) -> Self {
        Self { similarity }
    }

    /// `produced` must already be canonical (see [`canonical_produced`]).
    pub fn credit(&self, mode: MatchMode, gold: &GoldField, produced: &str) -> f64 {
        let GoldField::Present(expected) = gold else {
            return 0.0;
        };
        match mode {
            MatchMode::ExactOrFuzzy => self.text_credit(expected, produced),
            MatchMode::NumericProximity => verse_credit(expected, produced),
        }
    }

    /// Exact match on the canonical values, which is all the all-correct bonus accepts.
    pub fn is_exact(&self, gold: &GoldField, produced: &str) -> bool {
        match gold {
            GoldField::Present(expected) => expected == produced,
            GoldField::Absent | GoldField::Sentinel => true,
        }
    }

    fn text_credit(&self, expected: &str, produced: &str) -> f64 {
        if produced == expected {
            return 1.0;
        }
        if !produced.is_empty() && self.similarity.score(produced, expected) >= FUZZY_THRESHOLD {
            return FUZZY_CREDIT;
        }
        0.0
    }
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self::new(Similarity::folding())
    }
}

fn verse_credit(expected: &str, produced: &str) -> f64 {
    if produced == expected {
        return 1.0;
    }

    let expected_numbers = extract_numbers(Some(expected));
    let produced_numbers = extract_numbers(Some(produced));
    if expected_numbers.is_empty() || produced_numbers.is_empty() {
        return 0.0;
    }

    // Shared means the same digit run, so "042" and "42" are different numbers.
    if produced_numbers.iter().any(|n| expected_numbers.contains(n)) {
        return SHARED_NUMBER_CREDIT;
    }

    let (Some(expected_first), Some(produced_first)) = (
        parse_number(&expected_numbers[0]),
        parse_number(&produced_numbers[0]),
    ) else {
        return 0.0;
    };
    // A verse numbered 0 is a placeholder; distance to it means nothing.
    if expected_first == 0 {
        return 0.0;
    }

    match expected_first.abs_diff(produced_first) {
        0..=1 => ADJACENT_VERSE_CREDIT,
        2..=5 => NEARBY_VERSE_CREDIT,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(gold: &str, produced: &str) -> f64 {
        let gold = GoldField::classify(Some(gold), MatchMode::ExactOrFuzzy);
        let produced = canonical_produced(Some(produced), MatchMode::ExactOrFuzzy);
        FieldMatcher::default().credit(MatchMode::ExactOrFuzzy, &gold, &produced)
    }

    fn verse(gold: &str, produced: &str) -> f64 {
        let gold = GoldField::classify(Some(gold), MatchMode::NumericProximity);
        let produced = canonical_produced(Some(produced), MatchMode::NumericProximity);
        FieldMatcher::default().credit(MatchMode::NumericProximity, &gold, &produced)
    }

    #[test]
    fn test_classify_three_ways() {
        assert_eq!(GoldField::classify(None, MatchMode::ExactOrFuzzy), GoldField::Absent);
        assert_eq!(GoldField::classify(Some(" "), MatchMode::ExactOrFuzzy), GoldField::Absent);
        assert_eq!(GoldField::classify(Some("Unknown"), MatchMode::ExactOrFuzzy), GoldField::Sentinel);
        assert_eq!(GoldField::classify(Some("0"), MatchMode::NumericProximity), GoldField::Sentinel);
    }

    #[test]
    fn test_zero_is_a_real_chapter() {
        // "0" is only a sentinel for verses.
        assert_eq!(
            GoldField::classify(Some("0"), MatchMode::ExactOrFuzzy),
            GoldField::Present("0".to_string())
        );
        assert_eq!(text("0", "0"), 1.0);
    }

    #[test]
    fn test_excluded_fields_earn_nothing() {
        assert_eq!(text("unknown", "unknown"), 0.0);
        assert_eq!(text("", "kalidasa"), 0.0);
        assert_eq!(verse("0", "0"), 0.0);
    }

    #[test]
    fn test_text_exact_and_fuzzy() {
        assert_eq!(text("Abhinavagupta", " abhinavagupta "), 1.0);
        assert_eq!(text("nagarjuna", "nāgārjuna"), FUZZY_CREDIT);
        assert_eq!(text("abhinavagupta", "kalidasa"), 0.0);
        assert_eq!(text("abhinavagupta", ""), 0.0);
    }

    #[test]
    fn test_verse_tiers() {
        assert_eq!(verse("42", "42"), 1.0);
        assert_eq!(verse("42", "41-42"), SHARED_NUMBER_CREDIT);
        assert_eq!(verse("42", "43"), ADJACENT_VERSE_CREDIT);
        assert_eq!(verse("42", "47"), NEARBY_VERSE_CREDIT);
        assert_eq!(verse("42", "48"), 0.0);
        assert_eq!(verse("42", "100"), 0.0);
    }

    #[test]
    fn test_verse_without_numbers() {
        assert_eq!(verse("42", "unknown"), 0.0);
        assert_eq!(verse("iti", "42"), 0.0);
    }

    #[test]
    fn test_verse_leading_zero_is_not_shared() {
        // Different digit runs with the same value fall through to proximity.
        assert_eq!(verse("42", "042"), ADJACENT_VERSE_CREDIT);
        assert_eq!(verse("12-042", "042"), SHARED_NUMBER_CREDIT);
    }

    #[test]
    fn test_is_exact_ignores_fuzzy() {
        let matcher = FieldMatcher::default();
        let gold = GoldField::classify(Some("nagarjuna"), MatchMode::ExactOrFuzzy);
        assert!(!matcher.is_exact(&gold, "nāgārjuna"));
        assert!(matcher.is_exact(&GoldField::Sentinel, "anything"));
    }
}
