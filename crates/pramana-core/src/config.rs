use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::completion::CompletionConfig;
use crate::weights::ScoringWeights;

/// Everything the pipeline can be told from a YAML file. Every section is
/// optional; command line flags override whatever is loaded here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weights: ScoringWeights,
    pub completion: CompletionConfig,
    pub conjugation: ConjugationDatasetConfig,
    pub identification: IdentificationDatasetConfig,
    pub eval: EvalConfig,
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.conjugation.split.validate().context("conjugation.split")?;
        self.identification.split.validate().context("identification.split")?;
        if self.identification.min_quote_length > self.identification.max_quote_length {
            anyhow::bail!(
                "identification.min_quote_length ({}) exceeds max_quote_length ({})",
                self.identification.min_quote_length,
                self.identification.max_quote_length
            );
        }
        Ok(())
    }
}

/// Train/val/test proportions and the shuffle seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

impl SplitRatios {
    pub const fn new(train: f64, val: f64, test: f64) -> Self {
        Self { train, val, test, seed: 42 }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, r) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(0.0..=1.0).contains(&r) {
                anyhow::bail!("{name} ratio {r} is outside [0, 1]");
            }
        }
        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > 1e-6 {
            anyhow::bail!("split ratios sum to {sum}, expected 1");
        }
        Ok(())
    }
}

/// Common roots conjugated when no list is given, in IAST.
pub const DEFAULT_ROOTS: [&str; 10] = ["bhāṣ", "gam", "bhū", "dṛś", "śru", "car", "han", "vad", "vac", "kṛ"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConjugationDatasetConfig {
    /// vidyut-prakriya data directory (holds `dhatupatha.tsv`)
    pub data_dir: PathBuf,
    /// Roots to conjugate (IAST); an empty list means every root the engine knows
    pub roots: Vec<String>,
    /// Tense/mood names (IAST)
    pub lakaras: Vec<String>,
    pub split: SplitRatios,
}

impl Default for ConjugationDatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("vidyut-0.4.0/prakriya"),
            roots: DEFAULT_ROOTS.map(String::from).to_vec(),
            lakaras: ["laṭ", "liṭ", "vidhiliṅ", "loṭ", "laṅ"].map(String::from).to_vec(),
            split: SplitRatios::new(0.8, 0.1, 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentificationDatasetConfig {
    pub max_files: usize,
    /// Inclusive bounds on quote length, in characters
    pub min_quote_length: usize,
    pub max_quote_length: usize,
    pub num_samples: usize,
    pub sample_seed: u64,
    pub split: SplitRatios,
}

impl Default for IdentificationDatasetConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            min_quote_length: 15,
            max_quote_length: 300,
            num_samples: 2000,
            sample_seed: 42,
            split: SplitRatios::new(0.7, 0.15, 0.15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub concurrency: usize,
    /// Identification score at or above which a case counts as passed
    pub pass_threshold: f64,
    pub limit: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { concurrency: 8, pass_threshold: 0.8, limit: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: PipelineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.conjugation.lakaras.len(), 5);
        assert_eq!(config.conjugation.roots.len(), 10);
        assert!(config.conjugation.roots.iter().any(|r| r == "bhū"));
        assert_eq!(config.identification.split.train, 0.7);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "weights:\n  verse: 6\ncompletion:\n  model: o4-mini\nconjugation:\n  roots: []\nidentification:\n  num_samples: 50\n  split: {{ train: 0.8, val: 0.1, test: 0.1, seed: 7 }}\neval:\n  concurrency: 2\n"
        )
        .unwrap();
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.weights.verse, 6.0);
        assert_eq!(config.weights.author, 2.0);
        assert_eq!(config.completion.model, "o4-mini");
        assert!(config.conjugation.roots.is_empty());
        assert_eq!(config.identification.num_samples, 50);
        assert_eq!(config.identification.max_quote_length, 300);
        assert_eq!(config.identification.split.seed, 7);
        assert_eq!(config.eval.concurrency, 2);
    }

    #[test]
    fn test_rejects_bad_split() {
        let mut config = PipelineConfig::default();
        config.conjugation.split = SplitRatios::new(0.8, 0.3, 0.1);
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("conjugation.split"));
        assert!(SplitRatios::new(1.2, -0.1, -0.1).validate().is_err());
    }
}
