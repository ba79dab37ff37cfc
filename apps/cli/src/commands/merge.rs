//! Adapter merge command.

use super::types::MergeCommand;
use crate::context::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tuningtron_training::{LogProgressSink, resolve_job_output};

/// A directory is used as-is; anything else is looked up as a job id.
fn resolve_adapter(ctx: &CliContext, adapter: &str) -> Result<PathBuf> {
    let path = Path::new(adapter);
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    resolve_job_output(&ctx.workspace, adapter)
        .with_context(|| format!("Adapter {adapter} is neither a directory nor a finished job"))
}

pub async fn execute(ctx: &CliContext, cmd: MergeCommand) -> Result<()> {
    let adapter_dir = resolve_adapter(ctx, &cmd.adapter)?;
    let tuner = ctx.tuner(&cmd.model, &cmd.hardware)?;
    let outcome = tuner
        .merge(&adapter_dir, &cmd.output_dir, &ctx.trainer(), &LogProgressSink)
        .await
        .context("Merge failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    println!("{}", "Merge complete".bold().green());
    println!("  Job:     {}", outcome.job_id.to_string().cyan());
    println!("  Adapter: {}", adapter_dir.display().to_string().dimmed());
    println!("  Output:  {}", outcome.output_dir.display().to_string().dimmed());
    println!("  Files:   {}", outcome.artifacts.len());
    println!();
    Ok(())
}
