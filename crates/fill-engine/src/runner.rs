use form_driver::{FormDriver, UiContract};
use formpilot_core_types::PassId;
use tracing::{error, info, instrument, trace, warn};

use crate::aggregator::{display_for, FillTally};
use crate::errors::FillError;
use crate::fillers::{fill_date, fill_dropdown, fill_plain, FillContext};
use crate::model::{FieldKind, FieldStatus, FieldTask, FillOutcome, FillRequest};
use crate::policy::FillPolicy;
use crate::ports::ReportSink;
use crate::reference::fill_reference;
use crate::tasks::TaskList;

pub struct RuntimeDeps<'a> {
    pub driver: &'a dyn FormDriver,
    pub sink: &'a dyn ReportSink,
    pub policy: &'a FillPolicy,
    pub ui: &'a UiContract,
    pub tasks: &'a TaskList,
}

/// Run one fill pass: every task with a supplied value, in task list order,
/// strictly one after another. The first fatal error ends the pass.
#[instrument(skip_all, fields(pass = %pass_id, supplied = request.len()))]
pub async fn execute(pass_id: &PassId, request: &FillRequest, deps: RuntimeDeps<'_>) -> FillOutcome {
    for key in request.keys() {
        if deps.tasks.get(key).is_none() {
            warn!(field = %key, "value supplied for a field outside the task list, ignored");
        }
    }

    let ctx = FillContext::new(deps.driver, deps.policy, deps.ui);
    let mut tally = FillTally::new();
    for task in deps.tasks {
        let Some(value) = request.value(&task.key) else {
            trace!(field = %task.key, "no value supplied, skipped");
            continue;
        };
        match fill_one(&ctx, task, value).await {
            Ok(status) => tally.record(task, status),
            Err(err) => {
                error!(field = %task.key, kind = err.kind(), error = %err, "fill pass aborted");
                let outcome = tally.abort(pass_id, &err);
                deps.sink.outcome(&outcome).await;
                return outcome;
            }
        }
    }

    let outcome = tally.complete(pass_id, request.secondary().clone());
    info!(
        all_fields_resolved = outcome.all_fields_resolved(),
        fields = outcome.fields().len(),
        "fill pass completed"
    );
    deps.sink.outcome(&outcome).await;
    if let Some(message) = display_for(&outcome, &deps.policy.display_title) {
        deps.sink.display(&message).await;
    }
    outcome
}

async fn fill_one(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    value: &str,
) -> Result<FieldStatus, FillError> {
    match &task.kind {
        FieldKind::Plain => fill_plain(ctx, task, value).await,
        FieldKind::Date => fill_date(ctx, task, value).await,
        FieldKind::Dropdown => fill_dropdown(ctx, task, value).await,
        FieldKind::Reference { column } => {
            let profile = ctx.policy.profile_for(task);
            fill_reference(ctx, task, column, profile, value).await
        }
    }
}
