pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod detect;
pub mod dispatch;
pub mod env;
pub mod fill;
pub mod output;
pub mod runtime;
pub mod simulate;
pub mod tasks;

pub use config::{cmd_config, ConfigArgs};
pub use detect::{cmd_detect, DetectArgs};
pub use fill::{cmd_fill, FillArgs};
pub use simulate::{cmd_simulate, SimulateArgs};
pub use tasks::{cmd_tasks, TasksArgs};
