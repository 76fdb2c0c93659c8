use clap::Subcommand;

use super::config::ConfigArgs;
use super::detect::DetectArgs;
use super::fill::FillArgs;
use super::simulate::SimulateArgs;
use super::tasks::TasksArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Fill the open form in a running browser from a request file
    Fill(FillArgs),

    /// Run a fill pass against an in-memory form fixture
    Simulate(SimulateArgs),

    /// Check whether the target form is open in the browser
    Detect(DetectArgs),

    /// Print the task list the engine would walk
    Tasks(TasksArgs),

    /// Manage formpilot configuration
    Config(ConfigArgs),
}
