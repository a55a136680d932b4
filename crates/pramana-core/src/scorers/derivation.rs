use anyhow::Result;
use async_trait::async_trait;
use pramana_types::Step;
use serde_json::Value;

use crate::error::{json_kind, GradeError};
use crate::fuzzy::Similarity;
use crate::normalize::value_text;
use crate::scorer::{produced_value, Scorer};
use crate::types::Score;

/// Minimum text similarity (0–100) for a derivation step to match.
pub const STEP_TEXT_THRESHOLD: f64 = 95.0;

/// Grades a derivation (prakriya) by its longest correct prefix.
///
/// Rule applications are strictly ordered, so once a produced step diverges
/// from the gold derivation nothing after it earns credit, even if a later
/// step happens to coincide.
pub struct DerivationScorer {
    similarity: Similarity,
    pass_threshold: f64,
}

impl DerivationScorer {
    pub fn new() -> Self {
        Self {
            similarity: Similarity::strict(),
            pass_threshold: 1.0,
        }
    }

    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    /// Fraction of `expected` matched from the first step on. Never fails.
    pub fn grade(&self, expected: &[Step], produced_raw: &str) -> f64 {
        let result = serde_json::from_str::<Value>(produced_raw.trim())
            .map_err(GradeError::from)
            .and_then(|produced| produced_steps(&produced));
        match result {
            Ok(produced) => self.prefix_score(expected, &produced),
            Err(err) => {
                tracing::debug!(error = %err, "derivation answer scored 0.0");
                0.0
            }
        }
    }

    /// Number of leading steps that match.
    pub fn matching_prefix(&self, expected: &[Step], produced: &[Step]) -> usize {
        expected
            .iter()
            .zip(produced)
            .take_while(|(gold, step)| self.step_matches(gold, step))
            .count()
    }

    pub fn prefix_score(&self, expected: &[Step], produced: &[Step]) -> f64 {
        if expected.is_empty() || produced.is_empty() {
            return 0.0;
        }
        self.matching_prefix(expected, produced) as f64 / expected.len() as f64
    }

    fn step_matches(&self, gold: &Step, step: &Step) -> bool {
        gold.code.trim() == step.code.trim()
            && self.similarity.score(step.text.trim(), gold.text.trim()) >= STEP_TEXT_THRESHOLD
    }
}

impl Default for DerivationScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// The `derivation_history` of a produced answer. A missing history is empty;
/// a step that is not an object makes the whole answer ungradable.
pub fn produced_steps(produced: &Value) -> Result<Vec<Step>, GradeError> {
    let obj = produced
        .as_object()
        .ok_or_else(|| GradeError::NotAnObject(json_kind(produced)))?;
    let Some(history) = obj.get("derivation_history").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    history
        .iter()
        .enumerate()
        .map(|(index, step)| -> Result<Step, GradeError> {
            let step = step.as_object().ok_or(GradeError::MalformedStep { index })?;
            Ok(Step {
                code: value_text(step.get("code")).unwrap_or_default(),
                text: value_text(step.get("text")).unwrap_or_default(),
            })
        })
        .collect()
}

fn gold_steps(item: &Value) -> Result<Vec<Step>, GradeError> {
    let history = item
        .get("derivation_history")
        .cloned()
        .ok_or(GradeError::MissingGold("derivation_history"))?;
    serde_json::from_value(history).map_err(GradeError::from)
}

#[async_trait]
impl Scorer for DerivationScorer {
    fn name(&self) -> &'static str {
        "derivation_prefix"
    }

    async fn score(&self, expected: &Value, output: &Value) -> Result<Score> {
        let gold = gold_steps(expected)?;
        let (value, details) = match produced_value(output).and_then(|p| produced_steps(&p)) {
            Ok(steps) => (
                self.prefix_score(&gold, &steps),
                serde_json::json!({
                    "matched_steps": self.matching_prefix(&gold, &steps),
                    "expected_steps": gold.len(),
                    "produced_steps": steps.len(),
                }),
            ),
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
