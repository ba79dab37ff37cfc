//! Supervised fine-tuning command.

use super::types::SftCommand;
use crate::context::CliContext;
use anyhow::{Context, Result};
use tuningtron_training::LogProgressSink;

pub async fn execute(ctx: &CliContext, cmd: SftCommand) -> Result<()> {
    let mut options = ctx.config.sft_options();
    cmd.tuning.apply(&mut options.adapter, &mut options.hyperparams);
    if cmd.tuning.do_eval {
        options.do_eval = true;
    }
    if let Some(pct) = cmd.max_len_percentile {
        options.max_len_percentile = pct;
    }
    if cmd.comp_only {
        options.comp_only = true;
    }

    let tuner = ctx.tuner(&cmd.model, &cmd.hardware)?;
    let records = ctx.load_dataset(&cmd.dataset)?;
    let manifest = tuner
        .sft(&records, &cmd.adapter_dir, &options, &ctx.trainer(), &LogProgressSink)
        .await
        .context("SFT failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        super::print_manifest("Supervised fine-tuning complete", &manifest);
    }
    Ok(())
}
