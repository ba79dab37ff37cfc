use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier for a prepared dataset (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

/// Instruction-tuning row: an instruction, an optional input and the expected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructRecord {
    #[serde(alias = "instruction")]
    pub instruct: String,
    #[serde(default)]
    pub input: String,
    pub output: String,
}

/// Preference row for DPO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub prompt: String,
    pub chosen: String,
    pub rejected: String,
}

/// A single dataset row as read from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Instruct(InstructRecord),
    Preference(PreferenceRecord),
    /// Already formatted training text.
    Text { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Instruct,
    Preference,
    Text,
}

impl Record {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Instruct(_) => RecordKind::Instruct,
            Self::Preference(_) => RecordKind::Preference,
            Self::Text { .. } => RecordKind::Text,
        }
    }
}

/// Column summary of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetShape {
    pub instruct: usize,
    pub preference: usize,
    pub text: usize,
}

impl DatasetShape {
    #[must_use]
    pub fn of(records: &[Record]) -> Self {
        let mut shape = Self::default();
        for record in records {
            match record.kind() {
                RecordKind::Instruct => shape.instruct += 1,
                RecordKind::Preference => shape.preference += 1,
                RecordKind::Text => shape.text += 1,
            }
        }
        shape
    }

    #[must_use]
    pub const fn has_instruct(&self) -> bool {
        self.instruct > 0
    }

    #[must_use]
    pub const fn has_text(&self) -> bool {
        self.text > 0
    }
}

/// A record after chat-template rendering, as handed to the trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedExample {
    pub text: String,
    pub num_tokens: usize,
}

pub fn compute_dataset_id<T: Serialize>(rows: &[T]) -> TrainingResult<DatasetId> {
    let mut hasher = Sha256::new();

    for row in rows {
        let bytes = serde_json::to_vec(row)?;
        hasher.update(bytes);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}

pub fn validate_records(records: &[Record]) -> TrainingResult<()> {
    if records.is_empty() {
        return Err(TrainingError::Dataset("dataset must not be empty".to_string()));
    }
    for (idx, record) in records.iter().enumerate() {
        match record {
            Record::Instruct(r) => {
                if r.instruct.trim().is_empty() {
                    return Err(TrainingError::Dataset(format!("record[{idx}] instruct is empty")));
                }
                if r.output.trim().is_empty() {
                    return Err(TrainingError::Dataset(format!("record[{idx}] output is empty")));
                }
            }
            Record::Preference(r) => {
                if r.prompt.trim().is_empty() {
                    return Err(TrainingError::Dataset(format!("record[{idx}] prompt is empty")));
                }
                if r.chosen.trim().is_empty() || r.rejected.trim().is_empty() {
                    return Err(TrainingError::Dataset(format!(
                        "record[{idx}] chosen/rejected must not be empty"
                    )));
                }
            }
            Record::Text { text } => {
                if text.trim().is_empty() {
                    return Err(TrainingError::Dataset(format!("record[{idx}] text is empty")));
                }
            }
        }
    }
    Ok(())
}
