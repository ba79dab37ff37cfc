use crate::error::{TrainingError, TrainingResult};

/// Percentile with linear interpolation between the closest ranks.
pub fn percentile(values: &[usize], pct: f64) -> TrainingResult<f64> {
    if values.is_empty() {
        return Err(TrainingError::Dataset("cannot take a percentile of an empty dataset".to_string()));
    }
    if !(0.0..=100.0).contains(&pct) {
        return Err(TrainingError::InvalidSpec(format!("percentile must be within 0..=100, got {pct}")));
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    Ok((b - a).mul_add(rank - lo as f64, a))
}

/// Sequence length cutoff: the truncated `pct` percentile of token counts.
pub fn max_len_at_percentile(lengths: &[usize], pct: f64) -> TrainingResult<usize> {
    Ok(percentile(lengths, pct)?.floor() as usize)
}
