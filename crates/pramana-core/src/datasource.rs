use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::types::TestCase;

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn load(&self) -> Result<Vec<TestCase>>;
}

pub struct VecDataSource {
    cases: Vec<TestCase>,
}

impl VecDataSource {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }
}

#[async_trait]
impl DataSource for VecDataSource {
    async fn load(&self) -> Result<Vec<TestCase>> {
        Ok(self.cases.clone())
    }
}

/// Read a JSONL dataset where each line is either:
/// - a dataset row, `{"messages": [...], "expected_answer": ..., ...}`; the
///   messages become the input and the remaining fields the gold item
/// - an explicit case, `{"id": "...", "input": ..., "expected": ...}`
///
/// Rows without an `id` are numbered by line.
pub struct JsonlDataSource {
    path: PathBuf,
    limit: Option<usize>,
}

impl JsonlDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), limit: None }
    }

    /// Only load the first `n` cases.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

#[async_trait]
impl DataSource for JsonlDataSource {
    async fn load(&self) -> Result<Vec<TestCase>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        let mut cases = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if self.limit.is_some_and(|n| cases.len() >= n) {
                break;
            }
            let line = line.trim().trim_start_matches('\u{feff}');
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line)
                .with_context(|| format!("Invalid JSON on line {}", idx + 1))?;
            cases.push(parse_case(value, idx + 1)?);
        }
        tracing::debug!(path = ?self.path, cases = cases.len(), "loaded dataset");
        Ok(cases)
    }
}

fn parse_case(value: Value, line_no: usize) -> Result<TestCase> {
    let Value::Object(mut obj) = value else {
        return Err(anyhow!("Line {}: expected object", line_no));
    };
    let id = match obj.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => line_no.to_string(),
    };

    if let Some(messages) = obj.remove("messages") {
        obj.remove("id");
        return Ok(TestCase::with_id(id, messages, Value::Object(obj)));
    }

    let input = obj
        .remove("input")
        .ok_or_else(|| anyhow!("Line {}: missing 'messages' or 'input'", line_no))?;
    let expected = obj
        .remove("expected")
        .ok_or_else(|| anyhow!("Line {}: missing 'expected'", line_no))?;
    Ok(TestCase::with_id(id, input, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn test_loads_dataset_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let row = json!({
            "messages": [{"role": "user", "content": "Sanskrit quote: \"x\""}],
            "difficulty": "hard",
            "expected_answer": {"author": "kalidasa", "verse": "3"}
        });
        writeln!(file, "{row}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", json!({"id": "c2", "input": "q", "expected": "a"})).unwrap();

        let cases = JsonlDataSource::new(file.path()).load().await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id.as_deref(), Some("1"));
        assert_eq!(cases[0].input[0]["role"], "user");
        assert_eq!(cases[0].expected["difficulty"], "hard");
        assert!(cases[0].expected.get("messages").is_none());
        assert_eq!(cases[1].id.as_deref(), Some("c2"));
        assert_eq!(cases[1].expected, json!("a"));
    }

    #[tokio::test]
    async fn test_limit_and_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..3 {
            writeln!(file, "{}", json!({"messages": [], "expected_answer": i})).unwrap();
        }
        let cases = JsonlDataSource::new(file.path()).limit(2).load().await.unwrap();
        assert_eq!(cases.len(), 2);

        writeln!(file, "[1, 2]").unwrap();
        let err = JsonlDataSource::new(file.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("Line 4"));
    }

    #[tokio::test]
    async fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conjugation_test.jsonl");
        let err = JsonlDataSource::new(&path).load().await.unwrap_err();
        assert!(format!("{err:#}").contains("conjugation_test.jsonl"));
    }
}
