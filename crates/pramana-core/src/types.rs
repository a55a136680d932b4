//! Shared record and result types, re-exported so callers of the grading
//! library need only one crate.

pub use pramana_types::{
	CaseResult, ChatMessage, DifficultyTier, EvalResult, EvalSummary, GradedAnswer, Score,
	SourceCitation, Step, TestCase,
};
