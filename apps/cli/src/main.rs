//! Tuningtron CLI - LoRA fine-tuning front end
//!
//! Resolves a base model and dataset, derives training settings for the
//! current hardware and hands the job to the configured training launcher.

mod commands;
mod config;
mod context;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{DevicesCommand, DpoCommand, JobsCommand, MergeCommand, PlanCommand, SftCommand};
use commands::{devices, dpo, jobs, merge, plan, sft};
use context::CliContext;

/// Tuningtron - LoRA fine-tuning for gemma, cohere and qwen models
#[derive(Parser, Debug)]
#[command(
    name = "tuningtron",
    author,
    version,
    about = "Tuningtron - LoRA fine-tuning for gemma, cohere and qwen models",
    long_about = "Tuningtron prepares datasets with the model family's chat template, derives precision,\nattention and optimizer settings from the hardware, and runs an external trainer."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); defaults to the config file, then info
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Extra config file applied after ~/.tuningtron/config.toml and ./tuningtron.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory holding .tuningtron/jobs (defaults to the current directory)
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supervised fine-tuning of a LoRA adapter
    ///
    /// Renders instruction records with the model's chat template, drops rows
    /// longer than the chosen length percentile and trains an adapter.
    Sft(SftCommand),

    /// Direct preference optimization of a LoRA adapter
    Dpo(DpoCommand),

    /// Merge an adapter into its base model
    ///
    /// The adapter may be a directory or the id of a finished job.
    Merge(MergeCommand),

    /// Print the derived settings, LoRA config and training arguments without training
    Plan(PlanCommand),

    /// List finished jobs in the workspace
    Jobs(JobsCommand),

    /// Show visible CUDA devices
    Devices(DevicesCommand),
}

fn log_level(raw: &str) -> Level {
    match raw {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let tuner_config = config::load_config(args.config.as_deref())?;

    let level = args
        .log_level
        .as_deref()
        .or(tuner_config.log_level.as_deref())
        .map_or(Level::INFO, log_level);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = CliContext::new(tuner_config, args.workspace)?;

    match command {
        Command::Sft(cmd) => sft::execute(&ctx, cmd).await?,
        Command::Dpo(cmd) => dpo::execute(&ctx, cmd).await?,
        Command::Merge(cmd) => merge::execute(&ctx, cmd).await?,
        Command::Plan(cmd) => plan::execute(&ctx, cmd)?,
        Command::Jobs(cmd) => jobs::execute(&ctx, cmd)?,
        Command::Devices(cmd) => devices::execute(cmd)?,
    }

    Ok(())
}
