//! Gates for `#[tokio::test]` functions that hold a model to a bar on a
//! held-out split.
//!
//! ```ignore
//! #[tokio::test]
//! async fn test_identification_model() -> Result<()> {
//!     let result = Eval::builder()
//!         .data_source(Arc::new(JsonlDataSource::new("sanskrit_quotes_test.jsonl")))
//!         .task(completion_task(client))
//!         .add_scorer(Arc::new(IdentificationScorer::default()))
//!         .build()?
//!         .run()
//!         .await?;
//!
//!     assert_max_unanswered(&result, 5)?;
//!     assert_tier_pass_rate(&result, DifficultyTier::Easy, 0.6)?;
//!     assert_scorer_mean(&result, "source_identification", 0.5)?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use pramana_types::DifficultyTier;

use crate::confidence::parse_tier;
use crate::types::EvalResult;

/// Fail when more than `max` cases got no answer from the model.
pub fn assert_max_unanswered(result: &EvalResult, max: usize) -> Result<()> {
    let unanswered = result.summary.unanswered;
    if unanswered > max {
        let first_error = result.cases.iter().find_map(|c| c.error.as_deref()).unwrap_or_default();
        anyhow::bail!(
            "{unanswered} of {} cases went unanswered (allowed {max}); first error: {first_error}",
            result.summary.total
        );
    }
    Ok(())
}

/// Fail unless the cases of one difficulty tier pass at `min_rate` or better.
///
/// The tier is read from each gold item's `difficulty`, missing meaning
/// medium. A split with no cases of the tier fails too.
pub fn assert_tier_pass_rate(result: &EvalResult, tier: DifficultyTier, min_rate: f64) -> Result<()> {
    let in_tier: Vec<_> = result
        .cases
        .iter()
        .filter(|c| parse_tier(c.case.expected.get("difficulty")) == Some(tier))
        .collect();
    if in_tier.is_empty() {
        anyhow::bail!("no {tier} cases in the evaluation");
    }
    let passed = in_tier.iter().filter(|c| c.all_passed()).count();
    let rate = passed as f64 / in_tier.len() as f64;
    if rate < min_rate {
        anyhow::bail!(
            "{tier} pass rate {:.1}% ({passed}/{}) is below {:.1}%\n{}",
            rate * 100.0,
            in_tier.len(),
            min_rate * 100.0,
            result.summary_table()
        );
    }
    Ok(())
}

/// Fail unless the mean of one scorer reaches `min_mean`. Unanswered cases
/// count as 0.0 for every scorer.
pub fn assert_scorer_mean(result: &EvalResult, scorer: &str, min_mean: f64) -> Result<()> {
    if result.cases.is_empty() {
        anyhow::bail!("no cases in the evaluation");
    }
    let total: f64 = result
        .cases
        .iter()
        .filter_map(|c| c.scores.iter().find(|s| s.name == scorer))
        .map(|s| s.value)
        .sum();
    let mean = total / result.cases.len() as f64;
    if mean < min_mean {
        anyhow::bail!("mean '{scorer}' score {mean:.3} is below {min_mean:.3}");
    }
    Ok(())
}
