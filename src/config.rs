//! Configuration file model
//!
//! One YAML document covering the browser connection, the foreign UI
//! contract, the fill policy and where to find the task list.

use std::env;
use std::path::PathBuf;

use cdp_adapter::CdpConfig;
use fill_engine::{FillPolicy, PolicyError, TaskList};
use form_driver::UiContract;
use formpilot_core_types::FieldId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const DEBUGGER_URL_ENV: &str = "FORMPILOT_DEBUGGER_URL";
pub const PAGE_PREFIX_ENV: &str = "FORMPILOT_PAGE_PREFIX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid fill policy: {0}")]
    Policy(#[source] PolicyError),
    #[error("task list {path}: {source}")]
    Tasks {
        path: PathBuf,
        #[source]
        source: PolicyError,
    },
    #[error("debugger url must start with ws:// or wss://, got '{0}'")]
    DebuggerUrl(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: CdpConfig,
    pub ui: UiContract,
    pub fill: FillPolicy,
    /// YAML task list replacing the built-in hospitalization case list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_file: Option<PathBuf>,
    /// Field whose presence identifies the target form
    pub detect_marker: FieldId,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: CdpConfig::default(),
            ui: UiContract::default(),
            fill: FillPolicy::default(),
            tasks_file: None,
            detect_marker: FieldId::from_static("ReferralHospitalizationNumberTicket"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fill.validate().map_err(ConfigError::Policy)?;
        let url = self.browser.debugger_url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::DebuggerUrl(url.to_string()));
        }
        self.task_list().map(|_| ())
    }

    /// Task list named by `tasks_file`, or the built-in one.
    pub fn task_list(&self) -> Result<TaskList, ConfigError> {
        match &self.tasks_file {
            Some(path) => TaskList::load(path).map_err(|source| ConfigError::Tasks {
                path: path.clone(),
                source,
            }),
            None => Ok(TaskList::hospitalization_case()),
        }
    }

    /// Environment variables win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(DEBUGGER_URL_ENV) {
            info!(%url, "debugger url overridden from {}", DEBUGGER_URL_ENV);
            self.browser.debugger_url = url;
        }
        if let Ok(prefix) = env::var(PAGE_PREFIX_ENV) {
            info!(%prefix, "page prefix overridden from {}", PAGE_PREFIX_ENV);
            self.browser.page_url_prefix = prefix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "browser:\n  page_url_prefix: https://example.test/\nfill:\n  await_row_selection: true\n",
        )
        .unwrap();
        assert_eq!(config.browser.page_url_prefix, "https://example.test/");
        assert_eq!(config.browser.connect_timeout_ms, 10_000);
        assert!(config.fill.await_row_selection);
        assert_eq!(config.ui.confirm_label, "Выбрать");
        assert_eq!(config.detect_marker.as_str(), "ReferralHospitalizationNumberTicket");
        config.validate().unwrap();
    }

    #[test]
    fn rejects_http_debugger_url() {
        let mut config = Config::default();
        config.browser.debugger_url = "http://127.0.0.1:9222".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DebuggerUrl(_))
        ));
    }

    #[test]
    fn missing_tasks_file_is_reported_with_its_path() {
        let config = Config {
            tasks_file: Some(PathBuf::from("/nonexistent/tasks.yaml")),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("task list /nonexistent/tasks.yaml"));
    }
}
