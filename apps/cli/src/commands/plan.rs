//! Plan command: show what a run would use without training.

use super::types::PlanCommand;
use crate::context::CliContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tuningtron_training::{
    DataCollator, LoraConfig, LrSchedulerType, ModelFamily, ModelLoadOptions, SftOptions, TrainingArguments,
    TrainingSettings,
};

#[derive(Debug, Serialize)]
struct DatasetReport {
    max_len: usize,
    dropped: usize,
    train_rows: usize,
    eval_rows: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    model: String,
    family: ModelFamily,
    settings: TrainingSettings,
    lora: LoraConfig,
    collator: DataCollator,
    args: TrainingArguments,
    model_load: ModelLoadOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<DatasetReport>,
}

fn options(ctx: &CliContext, cmd: &PlanCommand) -> SftOptions {
    let mut options = ctx.config.sft_options();
    cmd.tuning.apply(&mut options.adapter, &mut options.hyperparams);
    options.do_eval |= cmd.tuning.do_eval;
    options.comp_only |= cmd.comp_only;
    if let Some(pct) = cmd.max_len_percentile {
        options.max_len_percentile = pct;
    }
    options
}

fn build_report(ctx: &CliContext, cmd: &PlanCommand) -> Result<PlanReport> {
    let options = options(ctx, cmd);

    if let Some(dataset) = &cmd.dataset {
        let tuner = ctx.tuner(&cmd.model, &cmd.hardware)?;
        let records = ctx.load_dataset(dataset)?;
        let plan = tuner.plan_sft(&records, &options).context("Failed to prepare dataset")?;
        let settings = tuner.settings().clone();
        return Ok(PlanReport {
            model: cmd.model.clone(),
            family: tuner.family(),
            model_load: ModelLoadOptions::for_training(&settings),
            settings,
            lora: plan.lora,
            collator: plan.collator,
            args: plan.args,
            dataset: Some(DatasetReport {
                max_len: plan.max_len,
                dropped: plan.dropped,
                train_rows: plan.split.train.len(),
                eval_rows: plan.split.eval.as_ref().map(Vec::len),
            }),
        });
    }

    // Without a dataset the tokenizer is not needed.
    let model = ctx.resolve_model(&cmd.model)?;
    let family = model.config.family()?;
    let settings = TrainingSettings::derive(ctx.hardware(&cmd.hardware)?, family, ctx.distributed(&cmd.hardware));
    let lora = LoraConfig::new(family, options.adapter.rank, options.adapter.lora_alpha, options.adapter.lora_dropout);
    lora.validate()?;
    options.hyperparams.validate()?;
    let args = TrainingArguments::new(&options.hyperparams, &settings, LrSchedulerType::Linear, options.do_eval);

    Ok(PlanReport {
        model: cmd.model.clone(),
        family,
        model_load: ModelLoadOptions::for_training(&settings),
        settings,
        lora,
        collator: DataCollator::select(family, options.comp_only),
        args,
        dataset: None,
    })
}

pub fn execute(ctx: &CliContext, cmd: PlanCommand) -> Result<()> {
    let report = build_report(ctx, &cmd)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let settings = &report.settings;
    println!();
    println!("{}", format!("Plan for {} ({})", report.model, report.family).bold().cyan());
    println!();
    match settings.hardware.capability() {
        Some(cap) => println!("  Accelerator:  capability {cap}"),
        None => println!("  Accelerator:  {}", "none (CPU)".yellow()),
    }
    println!("  Precision:    bf16={} fp16={}", report.args.bf16, report.args.fp16);
    println!("  Attention:    {}", settings.attention.map_or("default", |a| a.as_str()));
    println!("  Optimizer:    {}", settings.optimizer.as_str());
    println!("  Offload:      {}", if settings.offload.is_some() { "zero3 cpu" } else { "none" });
    println!(
        "  LoRA:         r={} alpha={} dropout={}",
        report.lora.r, report.lora.lora_alpha, report.lora.lora_dropout
    );
    println!("  Targets:      {}", report.lora.target_modules.join(", ").dimmed());
    println!("  Scheduler:    {:?}", report.args.lr_scheduler_type);
    println!("  Collator:     {:?}", report.collator);

    if let Some(dataset) = &report.dataset {
        println!();
        println!("  Max len:      {}", dataset.max_len);
        println!("  Dropped rows: {}", dataset.dropped);
        println!("  Train rows:   {}", dataset.train_rows);
        if let Some(eval) = dataset.eval_rows {
            println!("  Eval rows:    {eval}");
        }
    }
    println!();
    Ok(())
}
