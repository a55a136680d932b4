//! Calibration credit for a stated confidence.

use pramana_types::DifficultyTier;
use serde_json::Value;

const MISCALIBRATED_CREDIT: f64 = 0.5;

/// Fraction of the confidence weight earned by `confidence` on an item of `tier`.
///
/// Full credit inside the tier's band, half credit for any other value in
/// [0, 1], nothing for out-of-range or unparsable confidence (`None`). An
/// unrecognized tier has no band, so an in-range confidence still earns half
/// credit.
pub fn confidence_credit(confidence: Option<f64>, tier: Option<DifficultyTier>) -> f64 {
    let Some(c) = confidence else {
        return 0.0;
    };
    if !(0.0..=1.0).contains(&c) {
        return 0.0;
    }
    let in_band = match tier {
        Some(DifficultyTier::Easy) => c >= 0.7,
        Some(DifficultyTier::Medium) => (0.4..=0.8).contains(&c),
        Some(DifficultyTier::Hard) => c <= 0.6,
        None => false,
    };
    if in_band {
        1.0
    } else {
        MISCALIBRATED_CREDIT
    }
}

/// Reads a confidence from a produced answer. An answer that states no
/// confidence claims 0.0; numeric strings are accepted and anything else
/// (including `null`) is unparsable.
pub fn parse_confidence(v: Option<&Value>) -> Option<f64> {
    match v {
        None => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    }
}

/// Reads a difficulty from a gold item. A missing tier means medium.
pub fn parse_tier(v: Option<&Value>) -> Option<DifficultyTier> {
    match v {
        None | Some(Value::Null) => Some(DifficultyTier::Medium),
        Some(Value::String(s)) => s.parse().ok(),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use pramana_types::DifficultyTier::{Easy, Hard, Medium};

    #[test]
    fn test_bands_full_credit() {
        assert_eq!(confidence_credit(Some(0.9), Some(Easy)), 1.0);
        assert_eq!(confidence_credit(Some(0.6), Some(Medium)), 1.0);
        assert_eq!(confidence_credit(Some(0.2), Some(Hard)), 1.0);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(confidence_credit(Some(0.7), Some(Easy)), 1.0);
        assert_eq!(confidence_credit(Some(0.4), Some(Medium)), 1.0);
        assert_eq!(confidence_credit(Some(0.8), Some(Medium)), 1.0);
        assert_eq!(confidence_credit(Some(0.6), Some(Hard)), 1.0);
        assert_eq!(confidence_credit(Some(0.0), Some(Hard)), 1.0);
        assert_eq!(confidence_credit(Some(1.0), Some(Easy)), 1.0);
    }

    #[test]
    fn test_out_of_band_half_credit() {
        assert_eq!(confidence_credit(Some(0.69), Some(Easy)), 0.5);
        assert_eq!(confidence_credit(Some(0.81), Some(Medium)), 0.5);
        assert_eq!(confidence_credit(Some(0.95), Some(Hard)), 0.5);
        assert_eq!(confidence_credit(Some(0.5), None), 0.5);
    }

    #[test]
    fn test_out_of_range_or_unparsable() {
        assert_eq!(confidence_credit(Some(1.01), Some(Easy)), 0.0);
        assert_eq!(confidence_credit(Some(-0.1), Some(Hard)), 0.0);
        assert_eq!(confidence_credit(Some(f64::NAN), Some(Medium)), 0.0);
        assert_eq!(confidence_credit(None, Some(Medium)), 0.0);
    }

    #[test]
    fn test_parse_confidence() {
        assert_eq!(parse_confidence(Some(&json!(0.75))), Some(0.75));
        assert_eq!(parse_confidence(Some(&json!(" 0.5 "))), Some(0.5));
        assert_eq!(parse_confidence(Some(&json!("very sure"))), None);
        assert_eq!(parse_confidence(Some(&json!(true))), None);
        assert_eq!(parse_confidence(Some(&Value::Null)), None);
    }

    #[test]
    fn test_unstated_confidence_is_zero() {
        assert_eq!(parse_confidence(None), Some(0.0));
        assert_eq!(confidence_credit(parse_confidence(None), Some(Hard)), 1.0);
        assert_eq!(confidence_credit(parse_confidence(None), Some(Medium)), 0.5);
    }

    #[test]
    fn test_parse_tier_defaults_to_medium() {
        assert_eq!(parse_tier(None), Some(Medium));
        assert_eq!(parse_tier(Some(&json!("hard"))), Some(Hard));
        assert_eq!(parse_tier(Some(&json!("extreme"))), None);
    }
}
