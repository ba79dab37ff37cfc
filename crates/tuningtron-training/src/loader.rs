use crate::error::{TrainingError, TrainingResult};
use crate::record::Record;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Resolves a dataset identifier to its training split.
pub trait DatasetLoader: Send + Sync {
    fn load(&self, dataset: &str) -> TrainingResult<Vec<Record>>;
}

/// Loads JSONL datasets: a `.jsonl` file, or a directory holding `train.jsonl`.
///
/// Identifiers that are not local paths are looked up under `datasets_dir`.
#[derive(Debug, Clone, Default)]
pub struct JsonlDatasetLoader {
    datasets_dir: Option<PathBuf>,
}

impl JsonlDatasetLoader {
    #[must_use]
    pub fn new(datasets_dir: Option<PathBuf>) -> Self {
        Self { datasets_dir }
    }

    fn train_file(candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        let split = candidate.join("train.jsonl");
        split.is_file().then_some(split)
    }

    fn locate(&self, dataset: &str) -> Option<PathBuf> {
        Self::train_file(Path::new(dataset)).or_else(|| {
            self.datasets_dir
                .as_ref()
                .and_then(|root| Self::train_file(&root.join(dataset)))
        })
    }
}

impl DatasetLoader for JsonlDatasetLoader {
    fn load(&self, dataset: &str) -> TrainingResult<Vec<Record>> {
        let path = self
            .locate(dataset)
            .ok_or_else(|| TrainingError::Dataset(format!("dataset not found: {dataset}")))?;
        read_jsonl_records(&path)
    }
}

pub fn read_jsonl_records(path: &Path) -> TrainingResult<Vec<Record>> {
    let contents = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> TrainingResult<()> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}
