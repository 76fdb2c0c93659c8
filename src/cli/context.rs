use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cdp_adapter::ChromiumScriptPort;
use fill_engine::{FillEngine, FillEngineBuilder, ReportSink, TaskList};
use form_driver::{FormDriver, ScriptDriver};
use tokio::sync::OnceCell;
use tracing::info;

use crate::cli::output::OutputFormat;
use crate::config::Config;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
    output: OutputFormat,
    browser: OnceCell<Arc<ScriptDriver>>,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            browser: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn tasks(&self) -> Result<TaskList> {
        Ok(self.config.task_list()?)
    }

    /// Script driver attached to the form page of the configured browser.
    /// Connects on first use.
    pub async fn browser(&self) -> Result<Arc<ScriptDriver>> {
        self.browser
            .get_or_try_init(|| async {
                let browser = &self.config.browser;
                let port = ChromiumScriptPort::connect(browser)
                    .await
                    .with_context(|| format!("connecting to {}", browser.debugger_url))?;
                info!(url = %browser.debugger_url, "attached to browser");
                let driver = ScriptDriver::new(Arc::new(port), self.config.ui.clone())?;
                Ok::<_, anyhow::Error>(Arc::new(driver))
            })
            .await
            .map(Arc::clone)
    }

    pub fn engine(
        &self,
        driver: Arc<dyn FormDriver>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Arc<dyn FillEngine>> {
        let engine = FillEngineBuilder::new(self.config.fill.clone())
            .with_ui(self.config.ui.clone())
            .with_tasks(self.tasks()?)
            .with_driver(driver)
            .with_sink(sink)
            .build()?;
        Ok(engine)
    }
}
