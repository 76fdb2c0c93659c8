use anyhow::Result;
use clap::Args;
use fill_engine::detect_form;
use formpilot_core_types::FieldId;
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct DetectArgs {
    /// Field whose presence identifies the form (defaults to the configured marker)
    #[arg(long, value_name = "FIELD")]
    pub marker: Option<String>,
}

#[derive(Serialize)]
struct Detection<'a> {
    marker: &'a FieldId,
    present: bool,
}

pub async fn cmd_detect(args: DetectArgs, ctx: &CliContext) -> Result<()> {
    let marker = match args.marker.as_deref() {
        Some(raw) => FieldId::parse(raw)?,
        None => ctx.config().detect_marker.clone(),
    };
    let driver = ctx.browser().await?;
    let present = detect_form(driver.as_ref(), &marker).await?;

    let detection = Detection {
        marker: &marker,
        present,
    };
    match ctx.output().render(&detection)? {
        Some(rendered) => println!("{rendered}"),
        None if present => println!("Form detected (field {marker} is present)"),
        None => println!("Form not detected (no field {marker})"),
    }
    Ok(())
}
