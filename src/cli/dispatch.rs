use super::config::cmd_config;
use super::detect::cmd_detect;
use super::env::CliArgs;
use super::fill::cmd_fill;
use super::simulate::cmd_simulate;
use super::tasks::cmd_tasks;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Fill(args) => cmd_fill(args, ctx).await,
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Detect(args) => cmd_detect(args, ctx).await,
        Commands::Tasks(args) => cmd_tasks(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
