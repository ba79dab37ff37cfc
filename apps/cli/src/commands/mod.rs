//! Command implementations for the Tuningtron CLI.

pub mod devices;
pub mod dpo;
pub mod jobs;
pub mod merge;
pub mod plan;
pub mod sft;
pub mod types;

use colored::Colorize;
use tuningtron_training::TrainingManifest;

/// Human summary of a finished training job.
pub(crate) fn print_manifest(title: &str, manifest: &TrainingManifest) {
    println!();
    println!("{}", title.bold().green());
    println!("  Job:     {}", manifest.job_id.to_string().cyan());
    println!("  Model:   {} ({})", manifest.base_model.model_id, manifest.base_model.family);
    println!("  Adapter: {}", manifest.output_dir.display().to_string().dimmed());
    if let Some(max_len) = manifest.max_len {
        println!("  Max len: {max_len}");
    }
    if let Some(loss) = manifest.metrics.train_loss {
        println!("  Loss:    {loss:.4}");
    }
    println!();
}
