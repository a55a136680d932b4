use std::path::{Path, PathBuf};

use anyhow::Result;
use pramana_core::SplitRatios;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::jsonl::write_jsonl;

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> DatasetSplit<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shuffle with a seeded generator and cut into train/val/test.
///
/// Train and val get `floor(ratio * total)` records each; test gets whatever
/// remains, so nothing is dropped. The same seed always gives the same split.
pub fn split_dataset<T>(mut records: Vec<T>, ratios: &SplitRatios) -> DatasetSplit<T> {
    let mut rng = ChaCha8Rng::seed_from_u64(ratios.seed);
    records.shuffle(&mut rng);

    let total = records.len();
    let train_size = ((total as f64 * ratios.train).floor() as usize).min(total);
    let val_size = ((total as f64 * ratios.val).floor() as usize).min(total - train_size);

    let mut rest = records.split_off(train_size);
    let test = rest.split_off(val_size);

    tracing::debug!(
        train = records.len(),
        val = rest.len(),
        test = test.len(),
        seed = ratios.seed,
        "dataset split"
    );

    DatasetSplit { train: records, val: rest, test }
}

/// Files written by [`write_split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFiles {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
    pub complete: PathBuf,
}

/// `<prefix>_<part>[_<timestamp>].jsonl` inside `dir`.
pub fn split_file_name(dir: &Path, prefix: &str, part: &str, timestamp: Option<&str>) -> PathBuf {
    let name = match timestamp {
        Some(ts) => format!("{prefix}_{part}_{ts}.jsonl"),
        None => format!("{prefix}_{part}.jsonl"),
    };
    dir.join(name)
}

/// A human-readable local timestamp for output file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Write the three partitions and the complete dataset as JSONL files.
pub fn write_split<T: Serialize>(
    dir: &Path,
    prefix: &str,
    split: &DatasetSplit<T>,
    complete: &[T],
    timestamp: Option<&str>,
) -> Result<SplitFiles> {
    std::fs::create_dir_all(dir)?;
    let files = SplitFiles {
        train: split_file_name(dir, prefix, "train", timestamp),
        val: split_file_name(dir, prefix, "val", timestamp),
        test: split_file_name(dir, prefix, "test", timestamp),
        complete: split_file_name(dir, prefix, "complete", timestamp),
    };
    write_jsonl(&files.train, &split.train)?;
    write_jsonl(&files.val, &split.val)?;
    write_jsonl(&files.test, &split.test)?;
    write_jsonl(&files.complete, complete)?;
    tracing::info!(dir = ?dir, prefix, records = complete.len(), "wrote dataset files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonl::read_jsonl;

    #[test]
    fn test_floor_sizes_and_remainder() {
        let split = split_dataset((0..101).collect::<Vec<u32>>(), &SplitRatios::new(0.8, 0.1, 0.1));
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.val.len(), 10);
        assert_eq!(split.test.len(), 11);

        let split = split_dataset((0..7).collect::<Vec<u32>>(), &SplitRatios::new(0.7, 0.15, 0.15));
        assert_eq!((split.train.len(), split.val.len(), split.test.len()), (4, 1, 2));
    }

    #[test]
    fn test_nothing_lost_or_duplicated() {
        let split = split_dataset((0..50).collect::<Vec<u32>>(), &SplitRatios::new(0.7, 0.15, 0.15));
        let mut all: Vec<u32> = split.train.iter().chain(&split.val).chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let ratios = SplitRatios::new(0.8, 0.1, 0.1);
        let a = split_dataset((0..40).collect::<Vec<u32>>(), &ratios);
        let b = split_dataset((0..40).collect::<Vec<u32>>(), &ratios);
        assert_eq!(a, b);
        assert_ne!(a.train, (0..32).collect::<Vec<u32>>());

        let other = SplitRatios { seed: 7, ..ratios };
        assert_ne!(split_dataset((0..40).collect::<Vec<u32>>(), &other), a);
    }

    #[test]
    fn test_empty_input() {
        let split = split_dataset(Vec::<u32>::new(), &SplitRatios::new(0.8, 0.1, 0.1));
        assert!(split.is_empty());
    }

    #[test]
    fn test_write_split_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<u32> = (0..10).collect();
        let split = split_dataset(records.clone(), &SplitRatios::new(0.8, 0.1, 0.1));
        let files = write_split(dir.path(), "conjugation", &split, &records, Some("2026-10-15_09-30-00")).unwrap();
        assert_eq!(
            files.train.file_name().unwrap(),
            "conjugation_train_2026-10-15_09-30-00.jsonl"
        );
        assert_eq!(read_jsonl::<u32>(&files.complete).unwrap(), records);
        assert_eq!(read_jsonl::<u32>(&files.test).unwrap().len(), 1);

        let plain = split_file_name(dir.path(), "quotes", "val", None);
        assert_eq!(plain.file_name().unwrap(), "quotes_val.jsonl");
    }
}
