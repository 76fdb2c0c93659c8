use std::sync::Arc;

use async_trait::async_trait;
use form_driver::{FormDriver, UiContract};
use formpilot_core_types::PassId;

use crate::errors::BuildError;
use crate::model::{FillOutcome, FillRequest};
use crate::policy::FillPolicy;
use crate::ports::{NullSink, ReportSink};
use crate::runner::{execute, RuntimeDeps};
use crate::tasks::TaskList;

#[async_trait]
pub trait FillEngine: Send + Sync {
    /// Perform exactly one fill pass. Failures are reported in the outcome,
    /// never retried.
    async fn fill(&self, request: &FillRequest) -> FillOutcome;

    fn tasks(&self) -> &TaskList;
}

pub struct FillEngineBuilder {
    policy: FillPolicy,
    ui: UiContract,
    tasks: TaskList,
    driver: Option<Arc<dyn FormDriver>>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl FillEngineBuilder {
    pub fn new(policy: FillPolicy) -> Self {
        Self {
            policy,
            ui: UiContract::default(),
            tasks: TaskList::hospitalization_case(),
            driver: None,
            sink: None,
        }
    }

    pub fn with_ui(mut self, ui: UiContract) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_tasks(mut self, tasks: TaskList) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn FormDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Arc<dyn FillEngine>, BuildError> {
        self.policy.validate()?;
        self.tasks.validate()?;
        Ok(Arc::new(FillEngineImpl {
            policy: self.policy,
            ui: self.ui,
            tasks: self.tasks,
            driver: self.driver.ok_or(BuildError::MissingDriver)?,
            sink: self.sink.unwrap_or_else(|| Arc::new(NullSink)),
        }))
    }
}

struct FillEngineImpl {
    policy: FillPolicy,
    ui: UiContract,
    tasks: TaskList,
    driver: Arc<dyn FormDriver>,
    sink: Arc<dyn ReportSink>,
}

#[async_trait]
impl FillEngine for FillEngineImpl {
    async fn fill(&self, request: &FillRequest) -> FillOutcome {
        let deps = RuntimeDeps {
            driver: self.driver.as_ref(),
            sink: self.sink.as_ref(),
            policy: &self.policy,
            ui: &self.ui,
            tasks: &self.tasks,
        };
        execute(&PassId::new(), request, deps).await
    }

    fn tasks(&self) -> &TaskList {
        &self.tasks
    }
}
