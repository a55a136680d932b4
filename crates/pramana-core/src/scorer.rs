use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::Score;

/// Grades one task output against the gold item of its test case.
///
/// `expected` is the whole gold record (for example a dataset row with
/// `expected_answer` and `difficulty`); `output` is whatever the task returned,
/// usually the raw completion text as a JSON string.
#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn score(&self, expected: &Value, output: &Value) -> Result<Score>;
}

/// Parses a task output into the produced answer object. A string output is
/// the model's raw text and must itself be JSON.
pub(crate) fn produced_value(output: &Value) -> std::result::Result<Value, crate::error::GradeError> {
    match output {
        Value::String(raw) => Ok(serde_json::from_str(raw.trim())?),
        other => Ok(other.clone()),
    }
}
