use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::datasource::DataSource;
use crate::scorer::Scorer;
use crate::task::Task;
use crate::types::{CaseResult, EvalResult, Score, TestCase};

/// Assembles an evaluation: cases from a data source, answers from a task,
/// grades from every scorer.
pub struct EvalBuilder {
	data_source: Option<Arc<dyn DataSource>>,
	task: Option<Arc<dyn Task>>,
	scorers: Vec<Arc<dyn Scorer>>,
	concurrency: usize,
}

impl EvalBuilder {
	pub fn new() -> Self {
		Self {
			data_source: None,
			task: None,
			scorers: Vec::new(),
			concurrency: 8,
		}
	}

	pub fn data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
		self.data_source = Some(data_source);
		self
	}

	pub fn task(mut self, task: Arc<dyn Task>) -> Self {
		self.task = Some(task);
		self
	}

	pub fn scorers<I>(mut self, scorers: I) -> Self
	where
		I: IntoIterator<Item = Arc<dyn Scorer>>,
	{
		self.scorers = scorers.into_iter().collect();
		self
	}

	pub fn add_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
		self.scorers.push(scorer);
		self
	}

	pub fn concurrency(mut self, n: usize) -> Self {
		self.concurrency = n.max(1);
		self
	}

	pub fn build(self) -> Result<Eval> {
		Ok(Eval {
			data_source: self.data_source.ok_or_else(|| anyhow::anyhow!("data_source must be set"))?,
			task: self.task.ok_or_else(|| anyhow::anyhow!("task must be set"))?,
			scorers: self.scorers,
			concurrency: self.concurrency,
		})
	}
}

pub struct Eval {
	data_source: Arc<dyn DataSource>,
	task: Arc<dyn Task>,
	scorers: Vec<Arc<dyn Scorer>>,
	concurrency: usize,
}

impl Eval {
	pub fn builder() -> EvalBuilder {
		EvalBuilder::new()
	}

	/// Run every case. Cases the task fails on are kept as unanswered rather
	/// than aborting the run; results come back in data source order.
	pub async fn run(&self) -> Result<EvalResult> {
		let cases = self.data_source.load().await?;
		tracing::info!(cases = cases.len(), scorers = self.scorers.len(), concurrency = self.concurrency, "starting evaluation");
		let results = self.run_cases(cases).await?;
		let summary = EvalResult::summarize(&results);
		tracing::info!(
			total = summary.total,
			passed = summary.passed,
			unanswered = summary.unanswered,
			avg_score = summary.avg_score,
			"evaluation finished"
		);
		Ok(EvalResult { cases: results, summary })
	}

	async fn run_cases(&self, cases: Vec<TestCase>) -> Result<Vec<CaseResult>> {
		let mut indexed: Vec<(usize, CaseResult)> = stream::iter(cases.into_iter().enumerate())
			.map(|(idx, case)| async move { (idx, answer_case(self.task.as_ref(), &self.scorers, case).await) })
			.buffer_unordered(self.concurrency)
			.collect()
			.await;
		indexed.sort_by_key(|(idx, _)| *idx);
		Ok(indexed.into_iter().map(|(_, result)| result).collect())
	}
}

/// Ask the task for an answer and grade it with every scorer.
async fn answer_case(task: &dyn Task, scorers: &[Arc<dyn Scorer>], case: TestCase) -> CaseResult {
	let output = match task.run(&case.input).await {
		Ok(output) => output,
		Err(err) => {
			tracing::warn!(case = ?case.id, error = %err, "no answer, case left unanswered");
			return CaseResult { case, output: Value::Null, error: Some(format!("{err:#}")), scores: Vec::new() };
		}
	};

	let mut scores = Vec::with_capacity(scorers.len());
	for scorer in scorers {
		let score = scorer.score(&case.expected, &output).await.unwrap_or_else(|err| {
			tracing::warn!(case = ?case.id, scorer = scorer.name(), error = %err, "scorer failed");
			Score {
				name: scorer.name().to_string(),
				value: 0.0,
				passed: false,
				details: Some(json!({ "error": err.to_string() })),
			}
		});
		scores.push(score);
	}
	CaseResult { case, output, error: None, scores }
}

impl Default for EvalBuilder {
	fn default() -> Self {
		Self::new()
	}
}
