use thiserror::Error;

/// Why a produced answer could not be graded. Graders absorb these into a
/// score of 0.0; they never reach the caller of `grade`.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("produced answer is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("produced answer is a JSON {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("gold item has no '{0}'")]
    MissingGold(&'static str),

    #[error("derivation step {index} is not an object")]
    MalformedStep { index: usize },
}

pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
