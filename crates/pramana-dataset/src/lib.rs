//! pramana-dataset: build the conjugation and quote identification datasets
//! that the graders in `pramana-core` score against, and split them into
//! reproducible train/val/test JSONL files.

pub mod conjugation;
pub mod corpus;
pub mod engine;
pub mod identification;
pub mod jsonl;
pub mod lipi;
pub mod prakriya;
pub mod split;

pub use conjugation::ConjugationBuilder;
pub use corpus::{CorpusReader, Provenance, Segment, TeiCorpusReader};
pub use engine::{Candidate, DerivationEngine, DerivationRequest, Dhatu, Lakara, TableEngine};
pub use identification::IdentificationBuilder;
pub use jsonl::{read_jsonl, write_jsonl};
pub use lipi::{LipiTransliterator, Scheme, Transliterator};
pub use prakriya::VyakaranaEngine;
pub use split::{file_timestamp, split_dataset, write_split, DatasetSplit, SplitFiles};
