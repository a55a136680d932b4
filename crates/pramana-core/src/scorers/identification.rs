use anyhow::Result;
use async_trait::async_trait;
use pramana_types::{DifficultyTier, GradedAnswer};
use serde::Serialize;
use serde_json::Value;

use crate::confidence::{confidence_credit, parse_confidence, parse_tier};
use crate::error::{json_kind, GradeError};
use crate::field::{canonical_produced, FieldMatcher, GoldField, MatchMode};
use crate::normalize::value_text;
use crate::scorer::{produced_value, Scorer};
use crate::types::Score;
use crate::weights::ScoringWeights;

const SCORED_FIELDS: [(&str, MatchMode); 5] = [
    ("author", MatchMode::ExactOrFuzzy),
    ("work", MatchMode::ExactOrFuzzy),
    ("book", MatchMode::ExactOrFuzzy),
    ("chapter", MatchMode::ExactOrFuzzy),
    ("verse", MatchMode::NumericProximity),
];

#[derive(Debug, Clone, Serialize)]
pub struct FieldScore {
    pub field: &'static str,
    /// False when the gold value is absent or a sentinel.
    pub scored: bool,
    pub exact: bool,
    pub credit: f64,
    pub weighted: f64,
}

/// Where the points of an identification grade came from.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub fields: Vec<FieldScore>,
    pub confidence: f64,
    pub bonus: f64,
    pub earned: f64,
    pub score: f64,
}

/// Hierarchical partial-credit grader for quote source identification.
///
/// Author, work, book and chapter earn full credit on a normalized exact
/// match and 70% on a close fuzzy match; the verse earns credit by numeric
/// distance; a stated confidence earns credit when it suits the item's
/// difficulty; and a bonus is paid when every known field is exactly right.
/// The sum is normalized by the profile's denominator into [0, 1].
pub struct IdentificationScorer {
    weights: ScoringWeights,
    denominator: f64,
    matcher: FieldMatcher,
    pass_threshold: f64,
}

impl IdentificationScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        if let Err(err) = weights.validate() {
            tracing::warn!(error = %err, "identification weights are invalid; affected grades may be 0.0");
        }
        Self {
            denominator: weights.denominator(),
            weights,
            matcher: FieldMatcher::default(),
            pass_threshold: 0.8,
        }
    }

    /// Minimum grade for the runner to count a case as passed.
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Grade a raw model answer. Never fails: anything ungradable scores 0.0.
    pub fn grade(&self, expected: &GradedAnswer, tier: Option<DifficultyTier>, produced_raw: &str) -> f64 {
        let result = serde_json::from_str::<Value>(produced_raw.trim())
            .map_err(GradeError::from)
            .and_then(|produced| self.breakdown(expected, tier, &produced));
        match result {
            Ok(breakdown) => breakdown.score,
            Err(err) => {
                tracing::debug!(error = %err, "identification answer scored 0.0");
                0.0
            }
        }
    }

    /// Grade against a dataset item carrying `expected_answer` and `difficulty`.
    pub fn grade_item(&self, item: &Value, produced_raw: &str) -> f64 {
        match gold_from_item(item) {
            Ok((expected, tier)) => self.grade(expected, tier, produced_raw),
            Err(err) => {
                tracing::debug!(error = %err, "identification item scored 0.0");
                0.0
            }
        }
    }

    pub fn breakdown(
        &self,
        expected: &GradedAnswer,
        tier: Option<DifficultyTier>,
        produced: &Value,
    ) -> Result<ScoreBreakdown, GradeError> {
        let produced = produced
            .as_object()
            .ok_or_else(|| GradeError::NotAnObject(json_kind(produced)))?;

        let mut fields = Vec::with_capacity(SCORED_FIELDS.len());
        let mut earned = 0.0;
        let mut all_exact = true;

        for (field, mode) in SCORED_FIELDS {
            let gold_text = value_text(expected.get(field));
            let gold = GoldField::classify(gold_text.as_deref(), mode);
            let produced_text = value_text(produced.get(field));
            let candidate = canonical_produced(produced_text.as_deref(), mode);

            let credit = self.matcher.credit(mode, &gold, &candidate);
            let weighted = credit * self.weight_of(field);
            let exact = self.matcher.is_exact(&gold, &candidate);

            earned += weighted;
            all_exact &= exact;
            fields.push(FieldScore {
                field,
                scored: gold.is_scored(),
                exact,
                credit,
                weighted,
            });
        }

        let confidence = confidence_credit(parse_confidence(produced.get("confidence")), tier)
            * self.weights.confidence;
        earned += confidence;

        let bonus = if all_exact { self.weights.all_correct_bonus } else { 0.0 };
        earned += bonus;

        let score = normalized(earned, self.denominator);
        Ok(ScoreBreakdown { fields, confidence, bonus, earned, score })
    }

    fn weight_of(&self, field: &str) -> f64 {
        match field {
            "author" => self.weights.author,
            "work" => self.weights.work,
            "book" => self.weights.book,
            "chapter" => self.weights.chapter,
            "verse" => self.weights.verse,
            _ => 0.0,
        }
    }
}

/// `earned / denominator` in [0, 1]; a profile with no positive weight scores 0.0.
fn normalized(earned: f64, denominator: f64) -> f64 {
    let score = earned / denominator;
    if denominator > 0.0 && score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl Default for IdentificationScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

fn gold_from_item(item: &Value) -> Result<(&GradedAnswer, Option<DifficultyTier>), GradeError> {
    let expected = item
        .get("expected_answer")
        .and_then(Value::as_object)
        .ok_or(GradeError::MissingGold("expected_answer"))?;
    Ok((expected, parse_tier(item.get("difficulty"))))
}

#[async_trait]
impl Scorer for IdentificationScorer {
    fn name(&self) -> &'static str {
        "source_identification"
    }

    async fn score(&self, expected: &Value, output: &Value) -> Result<Score> {
        let (gold, tier) = gold_from_item(expected)?;
        let (value, details) = match produced_value(output).and_then(|p| self.breakdown(gold, tier, &p)) {
            Ok(breakdown) => (breakdown.score, serde_json::to_value(&breakdown)?),
            Err(err) => (0.0, serde_json::json!({ "error": err.to_string() })),
        };
        Ok(Score {
            name: self.name().to_string(),
            value,
            passed: value >= self.pass_threshold,
            details: Some(details),
        })
    }
}
