use crate::error::{TrainingError, TrainingResult};
use sha2::{Digest, Sha256};

/// Share of rows held out for evaluation.
pub const EVAL_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub eval: Option<Vec<T>>,
}

/// Split rows into train/eval sets when `do_eval` is set.
///
/// Rows are shuffled by a seeded hash of their position, so the same input and
/// seed always produce the same split. The eval set holds `ceil(n * 0.1)` rows.
pub fn train_eval_split<T>(rows: Vec<T>, do_eval: bool, seed: u64) -> TrainingResult<Split<T>> {
    if !do_eval {
        return Ok(Split { train: rows, eval: None });
    }

    let n = rows.len();
    let n_eval = (n as f64 * EVAL_FRACTION).ceil() as usize;
    if n_eval == 0 || n_eval >= n {
        return Err(TrainingError::Dataset(format!(
            "dataset of {n} rows is too small for a train/eval split"
        )));
    }

    let mut keyed: Vec<([u8; 32], T)> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| (shuffle_key(seed, idx), row))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut train: Vec<T> = keyed.into_iter().map(|(_, row)| row).collect();
    let eval = train.split_off(n - n_eval);
    Ok(Split { train, eval: Some(eval) })
}

fn shuffle_key(seed: u64, idx: usize) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update((idx as u64).to_le_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}
