use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use fill_engine::{FillOutcome, FillRequest};
use form_driver::FormDriver;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::sink::PrintSink;

#[derive(Args, Clone, Debug)]
pub struct FillArgs {
    /// JSON file with the field values (and optional secondary records)
    #[arg(value_name = "REQUEST")]
    pub request: PathBuf,
}

pub async fn cmd_fill(args: FillArgs, ctx: &CliContext) -> Result<()> {
    let request = read_request(&args.request).await?;
    let driver = ctx.browser().await?;
    let outcome = run_pass(ctx, driver, &request).await?;
    ensure_success(&outcome)
}

pub async fn read_request(path: &Path) -> Result<FillRequest> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let request =
        FillRequest::from_json(&raw).with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), fields = request.len(), "fill request loaded");
    Ok(request)
}

/// One pass with results printed in the selected output format.
pub async fn run_pass(
    ctx: &CliContext,
    driver: Arc<dyn FormDriver>,
    request: &FillRequest,
) -> Result<FillOutcome> {
    let sink = Arc::new(PrintSink::stdout(ctx.output()));
    let engine = ctx.engine(driver, sink)?;
    Ok(engine.fill(request).await)
}

pub fn ensure_success(outcome: &FillOutcome) -> Result<()> {
    if !outcome.success() {
        bail!(
            "fill pass {} failed: {}",
            outcome.pass_id(),
            outcome.error().unwrap_or("unknown error")
        );
    }
    Ok(())
}
