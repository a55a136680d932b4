use serde::{Deserialize, Serialize};

/// Normalizing denominator of the identification profile: 12.5 of field
/// weights plus the 2.0 all-correct bonus. Pass/fail thresholds downstream
/// are calibrated against this exact value.
pub const IDENTIFICATION_DENOMINATOR: f64 = 14.5;

/// Per-field weights of the identification grader plus the bonus awarded
/// when every scored field matches exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub author: f64,
    pub work: f64,
    pub book: f64,
    pub chapter: f64,
    pub verse: f64,
    pub confidence: f64,
    pub all_correct_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            author: 2.0,
            work: 3.0,
            book: 1.5,
            chapter: 1.5,
            verse: 4.0,
            confidence: 0.5,
            all_correct_bonus: 2.0,
        }
    }
}

impl ScoringWeights {
    /// Sum of every weight and the bonus; the most a single answer can earn.
    pub fn denominator(&self) -> f64 {
        self.author
            + self.work
            + self.book
            + self.chapter
            + self.verse
            + self.confidence
            + self.all_correct_bonus
    }

    /// Rejects profiles that would make scores meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        let named = [
            ("author", self.author),
            ("work", self.work),
            ("book", self.book),
            ("chapter", self.chapter),
            ("verse", self.verse),
            ("confidence", self.confidence),
        ];
        for (field, weight) in named {
            if !(weight.is_finite() && weight > 0.0) {
                anyhow::bail!("weight for '{}' must be a positive number, got {}", field, weight);
            }
        }
        if !(self.all_correct_bonus.is_finite() && self.all_correct_bonus >= 0.0) {
            anyhow::bail!("all_correct_bonus must be non-negative, got {}", self.all_correct_bonus);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denominator_is_literal() {
        assert_eq!(ScoringWeights::default().denominator(), IDENTIFICATION_DENOMINATOR);
    }

    #[test]
    fn test_validate_rejects_zero_weight() {
        let weights = ScoringWeights { verse: 0.0, ..ScoringWeights::default() };
        assert!(weights.validate().is_err());
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn test_partial_profile_from_yaml() {
        let weights: ScoringWeights = serde_yaml::from_str("verse: 6.0\n").unwrap();
        assert_eq!(weights.verse, 6.0);
        assert_eq!(weights.author, 2.0);
        assert_eq!(weights.denominator(), 16.5);
    }
}
