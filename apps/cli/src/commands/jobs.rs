//! Job listing command.

use super::types::JobsCommand;
use crate::context::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tuningtron_training::discover_jobs;

pub fn execute(ctx: &CliContext, cmd: JobsCommand) -> Result<()> {
    let jobs = discover_jobs(&ctx.workspace).context("Failed to discover jobs")?;

    if cmd.json {
        let out: Vec<_> = jobs
            .iter()
            .map(|entry| {
                let m = &entry.manifest;
                json!({
                    "job_id": m.job_id.0,
                    "created_at": m.created_at,
                    "objective": m.objective,
                    "base_model": m.base_model,
                    "dataset_id": m.dataset_id.0,
                    "output_dir": m.output_dir,
                    "metrics": m.metrics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Jobs ({})", jobs.len()).bold().cyan());
    println!();

    if jobs.is_empty() {
        println!("  {}", "No finished jobs found in this workspace.".dimmed());
        println!();
        return Ok(());
    }

    println!("{:<38} {:<5} {:<24} {}", "ID", "Type", "Model", "Output");
    println!("{}", "─".repeat(100));
    for entry in jobs {
        let m = entry.manifest;
        let objective = serde_json::to_value(m.objective)?;
        println!(
            "{:<38} {:<5} {:<24} {}",
            m.job_id.0.cyan(),
            objective.as_str().unwrap_or_default(),
            m.base_model.model_id,
            m.output_dir.display().to_string().dimmed()
        );
    }
    println!();
    Ok(())
}
