//! Preference optimization command.

use super::types::DpoCommand;
use crate::context::CliContext;
use anyhow::{Context, Result};
use tuningtron_training::LogProgressSink;

pub async fn execute(ctx: &CliContext, cmd: DpoCommand) -> Result<()> {
    let mut options = ctx.config.dpo_options();
    cmd.tuning.apply(&mut options.adapter, &mut options.hyperparams);
    if cmd.tuning.do_eval {
        options.do_eval = true;
    }

    let tuner = ctx.tuner(&cmd.model, &cmd.hardware)?;
    let records = ctx.load_dataset(&cmd.dataset)?;
    let manifest = tuner
        .dpo(&records, &cmd.adapter_dir, &options, &ctx.trainer(), &LogProgressSink)
        .await
        .context("DPO failed")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        super::print_manifest("Preference optimization complete", &manifest);
    }
    Ok(())
}
