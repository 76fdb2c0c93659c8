//! Reference picker protocol
//!
//! A reference field is filled by opening its picker modal, filtering the
//! server-backed grid by one column, waiting for the reload to settle and
//! confirming the first row. The first row is taken as is: the server-side
//! filter is trusted to have narrowed the list to the requested record.

use std::time::Duration;

use form_driver::{Key, Query, Signal};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::errors::{FillError, Phase, ProbeError};
use crate::fillers::{key_cycle, FillContext};
use crate::model::{FieldStatus, FieldTask, WaitProfile};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerState {
    Idle,
    Opening,
    WaitingGridReady,
    Filtering,
    WaitingGridSettled,
    Selecting,
    Confirming,
    Closed,
    Aborted,
}

impl PickerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PickerState::Closed | PickerState::Aborted)
    }

    /// The only state reachable from this one on success.
    fn next(self) -> Option<PickerState> {
        match self {
            PickerState::Idle => Some(PickerState::Opening),
            PickerState::Opening => Some(PickerState::WaitingGridReady),
            PickerState::WaitingGridReady => Some(PickerState::Filtering),
            PickerState::Filtering => Some(PickerState::WaitingGridSettled),
            PickerState::WaitingGridSettled => Some(PickerState::Selecting),
            PickerState::Selecting => Some(PickerState::Confirming),
            PickerState::Confirming => Some(PickerState::Closed),
            PickerState::Closed | PickerState::Aborted => None,
        }
    }
}

/// One entry of a session's history.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Transition {
    pub state: PickerState,
    pub at_ms: u64,
}

/// Transient state of one reference field fill.
pub struct ReferencePickerSession<'s, 'a> {
    ctx: &'s FillContext<'a>,
    task: &'s FieldTask,
    column: &'s str,
    profile: WaitProfile,
    state: PickerState,
    started: Instant,
    history: Vec<Transition>,
}

impl<'s, 'a> ReferencePickerSession<'s, 'a> {
    pub fn new(
        ctx: &'s FillContext<'a>,
        task: &'s FieldTask,
        column: &'s str,
        profile: WaitProfile,
    ) -> Self {
        Self {
            ctx,
            task,
            column,
            profile,
            state: PickerState::Idle,
            started: Instant::now(),
            history: vec![Transition {
                state: PickerState::Idle,
                at_ms: 0,
            }],
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    fn enter(&mut self, state: PickerState) {
        debug_assert!(
            state == PickerState::Aborted || self.state.next() == Some(state),
            "illegal picker transition {:?} -> {:?}",
            self.state,
            state
        );
        let at_ms = Instant::now()
            .saturating_duration_since(self.started)
            .as_millis() as u64;
        debug!(field = %self.task.key, from = ?self.state, to = ?state, at_ms, "picker transition");
        self.state = state;
        self.history.push(Transition { state, at_ms });
    }

    /// Drive the protocol to `Closed`, or to `Aborted` on the first error.
    pub async fn run(&mut self, value: &str) -> Result<FieldStatus, FillError> {
        match self.drive(value).await {
            Ok(status) => Ok(status),
            Err(err) => {
                warn!(field = %self.task.key, state = ?self.state, error = %err, "picker aborted");
                if !self.state.is_terminal() {
                    self.enter(PickerState::Aborted);
                }
                Err(err)
            }
        }
    }

    async fn drive(&mut self, value: &str) -> Result<FieldStatus, FillError> {
        let ctx = self.ctx;
        let task = self.task;
        let driver = ctx.driver();
        let timeouts = &ctx.policy.timeouts;
        let title = ctx.ui.picker_title.as_str();

        self.enter(PickerState::Opening);
        let query = Query::Field {
            name: task.key.as_str().to_string(),
        };
        let Some(input) = ctx.locate(task, &query).await? else {
            self.enter(PickerState::Aborted);
            return Ok(FieldStatus::NotFound);
        };
        ctx.signals(task, Phase::Opening, &input, &[Signal::Focus])
            .await?;
        ctx.press(task, Phase::Opening, &input).await?;

        self.enter(PickerState::WaitingGridReady);
        ctx.probes
            .wait_for_mask_gone(timeouts.mask())
            .await
            .map_err(lift(task, Phase::MaskClear))?;
        ctx.probes
            .wait_for_modal(title, true, timeouts.modal())
            .await
            .map_err(lift(task, Phase::ModalOpen))?;
        // Initial population is not filtered, so the field's profile does not apply.
        let initial = ctx
            .probes
            .wait_for_list_settled(ctx.policy.profiles.default)
            .await
            .map_err(lift(task, Phase::GridReady))?;
        debug!(rows = initial, "picker grid ready");

        self.enter(PickerState::Filtering);
        let filter = driver
            .find(&Query::ColumnFilter {
                header: self.column.trim().to_string(),
            })
            .await
            .map_err(|err| FillError::driver(&task.key, Phase::Filtering, err))?
            .ok_or_else(|| {
                FillError::violation(
                    &task.key,
                    Phase::Filtering,
                    format!("no filter input for column '{}'", self.column.trim()),
                )
            })?;
        driver
            .set_value(&filter, value)
            .await
            .map_err(|err| FillError::driver(&task.key, Phase::Filtering, err))?;
        ctx.signals(task, Phase::Filtering, &filter, &[Signal::Input, Signal::Change])
            .await?;
        ctx.signals(task, Phase::Filtering, &filter, &key_cycle(Key::Enter))
            .await?;
        ctx.signals(task, Phase::Filtering, &filter, &[Signal::Blur])
            .await?;

        self.enter(PickerState::WaitingGridSettled);
        ctx.probes
            .wait_for_mask_gone(timeouts.mask())
            .await
            .map_err(lift(task, Phase::MaskClear))?;
        let rows = ctx
            .probes
            .wait_for_list_settled(self.profile)
            .await
            .map_err(lift(task, Phase::GridSettle))?;
        if rows == 0 {
            return Err(FillError::violation(
                &task.key,
                Phase::GridSettle,
                format!("no rows match '{}' in column '{}'", value, self.column.trim()),
            ));
        }
        debug!(rows, "filtered grid settled");

        self.enter(PickerState::Selecting);
        let checker = driver
            .find(&Query::RowChecker { index: 0 })
            .await
            .map_err(|err| FillError::driver(&task.key, Phase::Selecting, err))?
            .ok_or_else(|| {
                FillError::violation(&task.key, Phase::Selecting, "row checker not found")
            })?;
        ctx.press(task, Phase::Selecting, &checker).await?;
        if ctx.policy.await_row_selection {
            ctx.probes
                .wait_for_row_selected(&checker, timeouts.row_selected())
                .await
                .map_err(lift(task, Phase::RowSelection))?;
        }

        self.enter(PickerState::Confirming);
        let label = ctx.ui.confirm_label.as_str();
        let confirm = driver
            .find(&Query::Button {
                label: label.to_string(),
            })
            .await
            .map_err(|err| FillError::driver(&task.key, Phase::Confirming, err))?
            .ok_or_else(|| {
                FillError::violation(
                    &task.key,
                    Phase::Confirming,
                    format!("confirm button '{}' not found", label),
                )
            })?;
        ctx.press(task, Phase::Confirming, &confirm).await?;
        ctx.probes
            .wait_for_modal(title, false, timeouts.modal())
            .await
            .map_err(lift(task, Phase::ModalClose))?;

        self.enter(PickerState::Closed);
        Ok(FieldStatus::Filled)
    }

    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.started)
    }
}

fn lift(task: &FieldTask, phase: Phase) -> impl FnOnce(ProbeError) -> FillError + '_ {
    move |err| FillError::from_probe(&task.key, phase, err)
}

/// Fill a reference field through a fresh [`ReferencePickerSession`].
#[instrument(skip_all, fields(field = %task.key, column = %column))]
pub async fn fill_reference(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    column: &str,
    profile: WaitProfile,
    value: &str,
) -> Result<FieldStatus, FillError> {
    let mut session = ReferencePickerSession::new(ctx, task, column, profile);
    let result = session.run(value).await;
    debug!(
        elapsed_ms = session.elapsed().as_millis() as u64,
        transitions = session.history().len(),
        final_state = ?session.state(),
        "picker session finished"
    );
    result
}
