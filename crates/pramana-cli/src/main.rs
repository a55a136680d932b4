use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pramana_core::{
	completion_task, ChatCompletionClient, ConjugatedFormScorer, DerivationScorer, Eval, IdentificationScorer,
	JsonlDataSource, PipelineConfig, Scorer, SplitRatios,
};
use pramana_dataset::{
	file_timestamp, read_jsonl, split_dataset, write_split, ConjugationBuilder, CorpusReader, DerivationEngine,
	IdentificationBuilder, Lakara, LipiTransliterator, TableEngine, TeiCorpusReader, VyakaranaEngine,
};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "pramana", about = "Build Sanskrit datasets, grade answers and evaluate models")]
struct Cli {
	/// YAML pipeline config; flags override it
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Grade one produced answer against a gold dataset row
	Grade(GradeArgs),
	/// Build the verb conjugation dataset with the vidyut rule engine
	BuildConjugation(BuildConjugationArgs),
	/// Build the quote identification dataset from a TEI corpus
	BuildIdentification(BuildIdentificationArgs),
	/// Re-split an existing JSONL dataset into train/val/test
	Split(SplitArgs),
	/// Ask a completion endpoint every question of a dataset and grade the answers
	Eval(EvalArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GradeKind {
	Identification,
	Derivation,
	Conjugation,
}

#[derive(Debug, Clone, Parser)]
struct GradeArgs {
	#[arg(long, value_enum)]
	kind: GradeKind,

	/// JSON file with the gold row (`expected_answer`, `difficulty`, `derivation_history`)
	#[arg(long)]
	gold: PathBuf,

	/// File with the produced answer text; `-` reads stdin
	#[arg(long, default_value = "-")]
	answer: String,

	/// Print the per-field breakdown of an identification grade
	#[arg(long)]
	explain: bool,
}

#[derive(Debug, Clone, Parser)]
struct BuildConjugationArgs {
	/// vidyut-prakriya data directory holding `dhatupatha.tsv`
	#[arg(long)]
	data: Option<PathBuf>,

	/// JSON table of pre-computed derivations, used instead of the rule engine
	#[arg(long, conflicts_with = "data")]
	table: Option<PathBuf>,

	#[arg(long, default_value = "conjugation_dataset")]
	out_dir: PathBuf,

	#[arg(long, default_value = "conjugation")]
	prefix: String,

	/// Roots to conjugate, in IAST (comma separated)
	#[arg(long, value_delimiter = ',')]
	roots: Vec<String>,

	/// Conjugate every root the engine knows
	#[arg(long, conflicts_with = "roots")]
	all_roots: bool,

	/// Lakaras to conjugate, in IAST or SLP1 (comma separated)
	#[arg(long, value_delimiter = ',')]
	lakaras: Vec<String>,

	#[arg(long)]
	seed: Option<u64>,

	/// Leave the timestamp out of output file names
	#[arg(long)]
	no_timestamp: bool,
}

#[derive(Debug, Clone, Parser)]
struct BuildIdentificationArgs {
	/// Directory of TEI XML files
	#[arg(long)]
	corpus: PathBuf,

	#[arg(long, default_value = "sanskrit_dataset_output")]
	out_dir: PathBuf,

	#[arg(long, default_value = "sanskrit_quotes")]
	prefix: String,

	#[arg(long)]
	max_files: Option<usize>,

	#[arg(long)]
	num_samples: Option<usize>,

	#[arg(long)]
	min_length: Option<usize>,

	#[arg(long)]
	max_length: Option<usize>,

	#[arg(long)]
	seed: Option<u64>,

	#[arg(long)]
	no_timestamp: bool,
}

#[derive(Debug, Clone, Parser)]
struct SplitArgs {
	/// JSONL file to split
	#[arg(long)]
	input: PathBuf,

	#[arg(long)]
	out_dir: PathBuf,

	#[arg(long)]
	prefix: String,

	#[arg(long, default_value_t = 0.8)]
	train: f64,

	#[arg(long, default_value_t = 0.1)]
	val: f64,

	#[arg(long, default_value_t = 0.1)]
	test: f64,

	#[arg(long, default_value_t = 42)]
	seed: u64,

	#[arg(long)]
	no_timestamp: bool,
}

#[derive(Debug, Clone, Parser)]
struct EvalArgs {
	/// JSONL dataset split to evaluate
	#[arg(long)]
	data: PathBuf,

	#[arg(long, value_enum)]
	kind: GradeKind,

	/// Chat completion base URL (up to `/chat/completions`)
	#[arg(long)]
	base_url: Option<String>,

	#[arg(long)]
	model: Option<String>,

	/// Concurrency (cases in-flight)
	#[arg(long)]
	concurrency: Option<usize>,

	/// Only evaluate the first N cases
	#[arg(long)]
	limit: Option<usize>,

	/// Score at or above which an identification counts as passed
	#[arg(long)]
	pass_threshold: Option<f64>,

	/// Output JSON result to a file
	#[arg(long)]
	json_out: Option<PathBuf>,
}

/// `RUST_LOG`, then `LOG_LEVEL`, then `info`. Logs go to stderr so stdout
/// stays clean for scores and tables.
fn init_tracing() {
	let filter = EnvFilter::try_from_env("RUST_LOG")
		.or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
		.unwrap_or_else(|_| EnvFilter::new("info"));
	fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
	init_tracing();
	let cli = Cli::parse();
	let config = match &cli.config {
		Some(path) => PipelineConfig::load(path)?,
		None => PipelineConfig::default(),
	};
	match cli.command {
		Commands::Grade(args) => grade(args, &config).await?,
		Commands::BuildConjugation(args) => build_conjugation(args, config)?,
		Commands::BuildIdentification(args) => build_identification(args, config)?,
		Commands::Split(args) => split(args)?,
		Commands::Eval(args) => eval(args, config).await?,
	}
	Ok(())
}

async fn read_answer(source: &str) -> Result<String> {
	if source == "-" {
		use tokio::io::AsyncReadExt;
		let mut buf = String::new();
		tokio::io::stdin().read_to_string(&mut buf).await.context("Failed to read answer from stdin")?;
		return Ok(buf);
	}
	tokio::fs::read_to_string(source)
		.await
		.with_context(|| format!("Failed to read answer {source:?}"))
}

async fn grade(args: GradeArgs, config: &PipelineConfig) -> Result<()> {
	let raw = tokio::fs::read_to_string(&args.gold)
		.await
		.with_context(|| format!("Failed to read gold row {:?}", args.gold))?;
	let gold: Value = serde_json::from_str(&raw).with_context(|| format!("Invalid gold row {:?}", args.gold))?;
	let answer = read_answer(&args.answer).await?;

	let score = match args.kind {
		GradeKind::Identification => {
			let scorer = IdentificationScorer::new(config.weights);
			if args.explain {
				match serde_json::from_str::<Value>(answer.trim()) {
					Ok(produced) => {
						let expected = gold
							.get("expected_answer")
							.and_then(Value::as_object)
							.context("gold row has no 'expected_answer' object")?;
						let tier = pramana_core::confidence::parse_tier(gold.get("difficulty"));
						match scorer.breakdown(expected, tier, &produced) {
							Ok(breakdown) => println!("{}", serde_json::to_string_pretty(&breakdown)?),
							Err(err) => println!("ungradable answer: {err}"),
						}
					}
					Err(err) => println!("ungradable answer: {err}"),
				}
			}
			scorer.grade_item(&gold, &answer)
		}
		GradeKind::Derivation => {
			let steps: Vec<pramana_core::types::Step> = serde_json::from_value(gold.get("derivation_history").cloned().unwrap_or(Value::Null))
				.context("gold row has no valid 'derivation_history'")?;
			DerivationScorer::new().grade(&steps, &answer)
		}
		GradeKind::Conjugation => {
			let expected = gold
				.get("expected_answer")
				.and_then(Value::as_str)
				.context("gold row has no 'expected_answer' string")?;
			ConjugatedFormScorer.grade(expected, &answer)
		}
	};
	println!("{score:.4}");
	Ok(())
}

fn build_conjugation(args: BuildConjugationArgs, config: PipelineConfig) -> Result<()> {
	let mut settings = config.conjugation;
	if args.all_roots {
		settings.roots.clear();
	} else if !args.roots.is_empty() {
		settings.roots = args.roots;
	}
	if !args.lakaras.is_empty() {
		settings.lakaras = args.lakaras;
	}
	if let Some(seed) = args.seed {
		settings.split.seed = seed;
	}
	let lakaras = settings
		.lakaras
		.iter()
		.map(|name| name.parse::<Lakara>())
		.collect::<Result<Vec<_>>>()?;

	let engine: Box<dyn DerivationEngine> = match args.table {
		Some(table) => Box::new(TableEngine::load(table)?),
		None => Box::new(VyakaranaEngine::load(args.data.unwrap_or(settings.data_dir))?),
	};
	let lipi = LipiTransliterator::new();
	let records = ConjugationBuilder::new(engine.as_ref(), &lipi)
		.roots(settings.roots)
		.lakaras(lakaras)
		.build()?;

	write_dataset(&args.out_dir, &args.prefix, records, &settings.split, args.no_timestamp)
}

fn build_identification(args: BuildIdentificationArgs, config: PipelineConfig) -> Result<()> {
	let mut settings = config.identification;
	settings.max_files = args.max_files.unwrap_or(settings.max_files);
	settings.num_samples = args.num_samples.unwrap_or(settings.num_samples);
	settings.min_quote_length = args.min_length.unwrap_or(settings.min_quote_length);
	settings.max_quote_length = args.max_length.unwrap_or(settings.max_quote_length);
	if let Some(seed) = args.seed {
		settings.sample_seed = seed;
		settings.split.seed = seed;
	}

	let segments = TeiCorpusReader::new(settings.max_files).read_dir(&args.corpus)?;
	let records = IdentificationBuilder::new()
		.quote_length(settings.min_quote_length, settings.max_quote_length)
		.num_samples(settings.num_samples)
		.seed(settings.sample_seed)
		.build(segments);
	if records.is_empty() {
		anyhow::bail!("no corpus segments within {}..={} characters", settings.min_quote_length, settings.max_quote_length);
	}

	write_dataset(&args.out_dir, &args.prefix, records, &settings.split, args.no_timestamp)
}

fn split(args: SplitArgs) -> Result<()> {
	let ratios = SplitRatios { train: args.train, val: args.val, test: args.test, seed: args.seed };
	ratios.validate()?;
	let records: Vec<Value> = read_jsonl(&args.input)?;
	write_dataset(&args.out_dir, &args.prefix, records, &ratios, args.no_timestamp)
}

fn write_dataset<T: serde::Serialize + Clone>(
	out_dir: &Path,
	prefix: &str,
	records: Vec<T>,
	ratios: &SplitRatios,
	no_timestamp: bool,
) -> Result<()> {
	let timestamp = (!no_timestamp).then(file_timestamp);
	let parts = split_dataset(records.clone(), ratios);
	let files = write_split(out_dir, prefix, &parts, &records, timestamp.as_deref())?;
	println!(
		"Train: {} → {}\nVal: {} → {}\nTest: {} → {}\nComplete: {} → {}",
		parts.train.len(),
		files.train.display(),
		parts.val.len(),
		files.val.display(),
		parts.test.len(),
		files.test.display(),
		records.len(),
		files.complete.display()
	);
	Ok(())
}

async fn eval(args: EvalArgs, config: PipelineConfig) -> Result<()> {
	let mut completion = config.completion;
	if let Some(base_url) = args.base_url {
		completion.base_url = base_url;
	}
	if let Some(model) = args.model {
		completion.model = model;
	}
	let concurrency = args.concurrency.unwrap_or(config.eval.concurrency);
	let pass_threshold = args.pass_threshold.unwrap_or(config.eval.pass_threshold);

	let mut data = JsonlDataSource::new(&args.data);
	if let Some(limit) = args.limit.or(config.eval.limit) {
		data = data.limit(limit);
	}

	let client = ChatCompletionClient::new(completion)?;
	tracing::info!(model = %client.config().model, data = ?args.data, "evaluating");

	let conjugated: Arc<dyn Scorer> = Arc::new(ConjugatedFormScorer);
	let scorers: Vec<Arc<dyn Scorer>> = match args.kind {
		GradeKind::Identification => {
			vec![Arc::new(IdentificationScorer::new(config.weights).with_pass_threshold(pass_threshold))]
		}
		GradeKind::Derivation => vec![conjugated, Arc::new(DerivationScorer::new())],
		GradeKind::Conjugation => vec![conjugated],
	};

	let result = Eval::builder()
		.data_source(Arc::new(data))
		.task(completion_task(Arc::new(client)))
		.scorers(scorers)
		.concurrency(concurrency)
		.build()?
		.run()
		.await?;
	println!("{}", result.summary_table());

	if let Some(path) = args.json_out {
		let json = serde_json::to_string_pretty(&result)?;
		tokio::fs::write(path, json).await?;
	}

	Ok(())
}
