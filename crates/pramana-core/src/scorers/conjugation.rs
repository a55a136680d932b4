use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::scorer::Scorer;
use crate::types::Score;

/// Checks the final conjugated form, ignoring case and surrounding whitespace.
///
/// Unlike the structured graders this one is lenient about the answer's
/// shape: chat models often wrap the JSON in a Markdown fence or add prose
/// around it, so the form is dug out of the text (see [`extract_conjugated_verb`]).
pub struct ConjugatedFormScorer;

impl ConjugatedFormScorer {
    pub fn grade(&self, expected_form: &str, produced_raw: &str) -> f64 {
        let answer = extract_conjugated_verb(produced_raw);
        if !answer.is_empty() && answer.to_lowercase() == expected_form.trim().to_lowercase() {
            1.0
        } else {
            0.0
        }
    }
}

/// Pull the `conjugated_verb` out of a free-form completion.
///
/// Tries, in order: the first `{...}` object parsed as JSON, a
/// `"conjugated_verb": "..."` pattern, and finally the whole trimmed text.
/// An object that parses but has no `conjugated_verb` yields `""`.
pub fn extract_conjugated_verb(text: &str) -> String {
    let stripped = text.replace("```json", "").replace("```", "");

    if let Some(object) = first_object().find(&stripped) {
        // A well-formed object is the answer: without the field it answers nothing.
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object.as_str()) {
            return match map.get("conjugated_verb") {
                Some(Value::String(verb)) => verb.trim().to_string(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
        }
    }

    if let Some(caps) = verb_field().captures(&stripped) {
        return caps[1].trim().to_string();
    }

    stripped.trim().to_string()
}

fn first_object() -> &'static Regex {
    static OBJECT: OnceLock<Regex> = OnceLock::new();
    OBJECT.get_or_init(|| Regex::new(r"\{[^}]+\}").expect("object pattern is valid"))
}

fn verb_field() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| {
        Regex::new(r#""conjugated_verb"\s*:\s*"([^"]+)""#).expect("field pattern is valid")
    })
}

#[async_trait]
impl Scorer for ConjugatedFormScorer {
    fn name(&self) -> &'static str {
        "conjugated_form"
    }

    async fn score(&self, expected: &Value, output: &Value) -> Result<Score> {
        let gold = expected
            .get("expected_answer")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("gold item has no 'expected_answer' string"))?;
        let produced = match output {
            Value::String(s) => s.clone(),
            _ => serde_json::to_string(output)?,
        };
        let answer = extract_conjugated_verb(&produced);
        let value = self.grade(gold, &produced);

        Ok(Score {
            name: self.name().to_string(),
            value,
            passed: value == 1.0,
            details: Some(serde_json::json!({
                "expected": gold,
                "answer": answer,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_from_plain_json() {
        assert_eq!(extract_conjugated_verb(r#"{"conjugated_verb": "bhavati"}"#), "bhavati");
    }

    #[test]
    fn test_extract_from_fenced_json_with_prose() {
        let text = "Here is the form:\n```json\n{ \"conjugated_verb\": \"bhavataḥ\" }\n```";
        assert_eq!(extract_conjugated_verb(text), "bhavataḥ");
    }

    #[test]
    fn test_extract_from_broken_json() {
        let text = r#"{"conjugated_verb": "bhavanti", }"#;
        assert_eq!(extract_conjugated_verb(text), "bhavanti");
    }

    #[test]
    fn test_object_without_verb_is_empty() {
        let text = r#"{"answer": "bhavati"} "conjugated_verb": "bhavati""#;
        assert_eq!(extract_conjugated_verb(text), "");
        assert_eq!(ConjugatedFormScorer.grade("bhavati", r#"{"verb": "bhavati"}"#), 0.0);
    }

    #[test]
    fn test_extract_falls_back_to_text() {
        assert_eq!(extract_conjugated_verb("  gacchati \n"), "gacchati");
    }

    #[test]
    fn test_grade_is_case_insensitive() {
        let scorer = ConjugatedFormScorer;
        assert_eq!(scorer.grade("bhavati", r#"{"conjugated_verb": "Bhavati"}"#), 1.0);
        assert_eq!(scorer.grade("bhavataḥ", r#"{"conjugated_verb": "bhavatah"}"#), 0.0);
        assert_eq!(scorer.grade("bhavati", ""), 0.0);
    }

    #[tokio::test]
    async fn test_scorer_trait() {
        let item = json!({ "expected_answer": "gacchanti" });
        let score = ConjugatedFormScorer
            .score(&item, &json!("{\"conjugated_verb\": \"gacchanti\"}"))
            .await
            .unwrap();
        assert!(score.passed);
        assert!(ConjugatedFormScorer.score(&json!({}), &json!("x")).await.is_err());
    }
}
