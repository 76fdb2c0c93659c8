use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use form_driver::{FormFixture, MemoryForm};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::fill::{ensure_success, read_request, run_pass};

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// YAML description of the form to fill
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// JSON file with the field values (and optional secondary records)
    #[arg(value_name = "REQUEST")]
    pub request: PathBuf,

    /// Print the form's field values once the pass is over
    #[arg(long)]
    pub show_form: bool,
}

#[derive(Serialize)]
struct FormValues<'a> {
    form: &'a BTreeMap<String, String>,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let fixture = read_fixture(&args.fixture).await?;
    let request = read_request(&args.request).await?;
    let form = Arc::new(MemoryForm::from_fixture(&fixture, ctx.config().ui.clone()));

    let outcome = run_pass(ctx, form.clone(), &request).await?;
    if args.show_form {
        let values = form.values();
        match ctx.output().render(&FormValues { form: &values })? {
            Some(rendered) => println!("{rendered}"),
            None => {
                println!("Form after pass:");
                for (name, value) in &values {
                    println!("  {:<40} {}", name, value);
                }
            }
        }
    }
    ensure_success(&outcome)
}

async fn read_fixture(path: &Path) -> Result<FormFixture> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let fixture: FormFixture =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), fields = fixture.fields.len(), "form fixture loaded");
    Ok(fixture)
}
