//! pramana-core: partial-credit graders for Sanskrit model answers.
//! Grade a source identification or a verb derivation directly, or compose a
//! data source, a task (usually a completion service) and scorers and run them
//! with concurrency. See `examples/grade.rs` for a quickstart.

pub mod completion;
pub mod config;
pub mod confidence;
pub mod datasource;
pub mod error;
pub mod field;
pub mod fuzzy;
pub mod normalize;
pub mod runner;
pub mod scorer;
pub mod task;
pub mod testing;
pub mod types;
pub mod weights;

pub mod scorers {
    pub mod conjugation;
    pub mod derivation;
    pub mod identification;
}

pub use completion::{ChatCompletionClient, CompletionConfig, CompletionService};
pub use config::{PipelineConfig, SplitRatios, DEFAULT_ROOTS};
pub use datasource::{DataSource, JsonlDataSource, VecDataSource};
pub use error::GradeError;
pub use fuzzy::Similarity;
pub use runner::{Eval, EvalBuilder};
pub use scorer::Scorer;
pub use scorers::{
    conjugation::{extract_conjugated_verb, ConjugatedFormScorer},
    derivation::DerivationScorer,
    identification::{IdentificationScorer, ScoreBreakdown},
};
pub use task::{completion_task, from_async_fn, Task};
pub use types::{CaseResult, EvalResult, EvalSummary, Score, TestCase};
pub use weights::{ScoringWeights, IDENTIFICATION_DENOMINATOR};
