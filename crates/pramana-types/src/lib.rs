use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// A graded answer as it arrives on the wire: field name to scalar value.
pub type GradedAnswer = serde_json::Map<String, Value>;

/// One rule application in a derivation (prakriya).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Grammar rule reference, e.g. "3.2.123"
    pub code: String,

    /// Intermediate derivation state after the rule applied
    pub text: String,
}

impl Step {
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }
}

/// Declared difficulty of an identification item; selects the acceptable confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("unsupported difficulty: {value}")),
        }
    }
}

/// Where a quote comes from. `"unknown"` marks fields the corpus could not supply,
/// and a verse of `"0"` marks an unnumbered segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub author: String,
    pub work: String,
    pub book: String,
    pub chapter: String,
    pub verse: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn developer(content: impl Into<String>) -> Self {
        Self { role: "developer".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A conjugation dataset row. All grammatical labels are IAST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjugationRecord {
    pub messages: Vec<ChatMessage>,
    pub dhatu: String,
    pub gana: String,
    pub prayoga: String,
    pub lakara: String,
    pub purusha: String,
    pub vacana: String,
    /// Gold conjugated form
    pub expected_answer: String,
    pub derivation_history: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteType {
    Verse,
    Line,
    Paragraph,
}

/// Structural position of a segment, taken from enclosing `<div>` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub book: String,
    pub chapter: String,
    pub section: String,
}

impl Default for ChapterInfo {
    fn default() -> Self {
        Self {
            book: "unknown".to_string(),
            chapter: "unknown".to_string(),
            section: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub filename: String,
    pub segment_id: String,
    pub chapter_info: ChapterInfo,
    pub text_length: usize,
}

/// A quote identification dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationRecord {
    pub messages: Vec<ChatMessage>,
    pub quote: String,
    pub quote_type: QuoteType,
    pub difficulty: DifficultyTier,
    pub expected_answer: SourceCitation,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
	pub id: Option<String>,
	pub input: Value,
	pub expected: Value,
}

impl TestCase {
	pub fn new(input: Value, expected: Value) -> Self {
		Self { id: None, input, expected }
	}

	pub fn with_id(id: impl Into<String>, input: Value, expected: Value) -> Self {
		Self { id: Some(id.into()), input, expected }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
	pub name: String,
	pub value: f64,
	pub passed: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
	pub case: TestCase,
	pub output: Value,
	/// Set when the completion service produced no answer for this case
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub scores: Vec<Score>,
}

impl CaseResult {
	pub fn all_passed(&self) -> bool {
		!self.scores.is_empty() && self.scores.iter().all(|s| s.passed)
	}

	pub fn avg_score(&self) -> f64 {
		if self.scores.is_empty() {
			return 0.0;
		}
		let sum: f64 = self.scores.iter().map(|s| s.value).sum();
		sum / (self.scores.len() as f64)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
	pub total: usize,
	pub passed: usize,
	pub unanswered: usize,
	pub pass_rate: f64,
	pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
	pub cases: Vec<CaseResult>,
	pub summary: EvalSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct SummaryRow {
	id: String,
	passed: String,
	avg_score: f64,
	input: String,
	output: String,
	expected: String,
}

impl EvalResult {
	pub fn summarize(cases: &[CaseResult]) -> EvalSummary {
		let total = cases.len();
		let mut passed = 0usize;
		let mut unanswered = 0usize;
		let mut score_sum = 0.0f64;
		let mut score_count = 0usize;

		for cr in cases {
			if cr.error.is_some() {
				unanswered += 1;
			}
			if cr.all_passed() {
				passed += 1;
			}
			for s in &cr.scores {
				score_sum += s.value;
				score_count += 1;
			}
		}

		let pass_rate = if total == 0 { 0.0 } else { passed as f64 / total as f64 };
		let avg_score = if score_count == 0 { 0.0 } else { score_sum / score_count as f64 };

		EvalSummary { total, passed, unanswered, pass_rate, avg_score }
	}

	pub fn summary_table(&self) -> String {
		use tabled::Table;
		let rows: Vec<SummaryRow> = self.cases.iter().map(|cr| {
			SummaryRow {
				id: cr.case.id.clone().unwrap_or_else(|| "-".to_string()),
				passed: if cr.all_passed() { "✓" } else { " " }.to_string(),
				avg_score: cr.avg_score(),
				input: truncate(input_preview(&cr.case.input), 64),
				output: truncate(value_preview(&cr.output), 64),
				expected: truncate(expected_preview(&cr.case.expected), 64),
			}
		}).collect();

		let table_str = Table::new(rows).to_string();

		let summary_text = format!(
			"Total: {}  Passed: {}  Unanswered: {}  Pass rate: {:.1}%  Avg score: {:.3}",
			self.summary.total,
			self.summary.passed,
			self.summary.unanswered,
			self.summary.pass_rate * 100.0,
			self.summary.avg_score
		);

		format!("{}\n\n{}\n", table_str, summary_text)
	}
}

// Chat inputs are previewed by their last message, which carries the actual question.
fn input_preview(v: &Value) -> String {
	v.as_array()
		.and_then(|messages| messages.last())
		.and_then(|m| m.get("content"))
		.and_then(Value::as_str)
		.map(|s| s.to_string())
		.unwrap_or_else(|| value_preview(v))
}

fn expected_preview(v: &Value) -> String {
	match v.get("expected_answer") {
		Some(answer) => value_preview(answer),
		None => value_preview(v),
	}
}

fn value_preview(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		_ => v.to_string(),
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}
