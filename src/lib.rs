//! formpilot command-line front end
//!
//! Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod sink;

pub use config::{Config, ConfigError};
pub use sink::PrintSink;
