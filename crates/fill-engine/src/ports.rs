use async_trait::async_trait;

use crate::model::{DisplayMessage, FillOutcome};

/// Consumer of pass results.
///
/// `outcome` is called exactly once per pass; `display` follows it only for
/// a successful pass with secondary data to show.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn outcome(&self, outcome: &FillOutcome);

    async fn display(&self, message: &DisplayMessage);
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

#[async_trait]
impl ReportSink for NullSink {
    async fn outcome(&self, _outcome: &FillOutcome) {}

    async fn display(&self, _message: &DisplayMessage) {}
}
