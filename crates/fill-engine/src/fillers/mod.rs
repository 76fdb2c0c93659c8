//! Field fillers
//!
//! Each filler applies one value to one field through the same gestures a
//! person would make, and reports a [`FieldStatus`] for non-fatal outcomes.
//! Fillers assume they own the document for as long as they run.

mod date;
mod dropdown;
mod plain;

pub use date::fill_date;
pub use dropdown::fill_dropdown;
pub use plain::fill_plain;

use form_driver::{DriverError, ElementRef, FormDriver, Key, Query, Signal, UiContract};
use tracing::warn;

use crate::errors::{FillError, Phase, ProbeError};
use crate::model::{FieldStatus, FieldTask};
use crate::policy::FillPolicy;
use crate::probes::{Presence, Probes};

/// Everything a filler needs for one pass.
#[derive(Clone, Copy)]
pub struct FillContext<'a> {
    pub probes: Probes<'a>,
    pub policy: &'a FillPolicy,
    pub ui: &'a UiContract,
}

impl<'a> FillContext<'a> {
    pub fn new(driver: &'a dyn FormDriver, policy: &'a FillPolicy, ui: &'a UiContract) -> Self {
        Self {
            probes: Probes::new(driver, &policy.timeouts),
            policy,
            ui,
        }
    }

    pub fn driver(&self) -> &'a dyn FormDriver {
        self.probes.driver()
    }

    /// Locate an element belonging to `task`.
    ///
    /// Mandatory tasks wait the full element timeout and fail with
    /// [`FillError::NotFound`]; optional ones wait briefly and yield `None`.
    pub async fn locate(
        &self,
        task: &FieldTask,
        query: &Query,
    ) -> Result<Option<ElementRef>, FillError> {
        let timeouts = &self.policy.timeouts;
        let (presence, timeout) = if task.mandatory {
            (Presence::Required, timeouts.element())
        } else {
            (Presence::BestEffort, timeouts.element_lookup())
        };
        match self.probes.wait_for_element(query, timeout, presence).await {
            Ok(Some(element)) => Ok(Some(element)),
            Ok(None) => {
                warn!(field = %task.key, %query, "element not found, field skipped");
                Ok(None)
            }
            Err(ProbeError::Timeout { .. }) => Err(FillError::NotFound {
                field: task.key.clone(),
                what: query.to_string(),
            }),
            Err(ProbeError::Driver(source)) => Err(FillError::driver(&task.key, Phase::Lookup, source)),
        }
    }

    pub async fn press(
        &self,
        task: &FieldTask,
        phase: Phase,
        element: &ElementRef,
    ) -> Result<(), FillError> {
        press(self.driver(), element)
            .await
            .map_err(|err| FillError::driver(&task.key, phase, err))
    }

    pub async fn signals(
        &self,
        task: &FieldTask,
        phase: Phase,
        element: &ElementRef,
        signals: &[Signal],
    ) -> Result<(), FillError> {
        notify(self.driver(), element, signals)
            .await
            .map_err(|err| FillError::driver(&task.key, phase, err))
    }
}

/// Full mouse gesture: press, release, click.
pub(crate) async fn press(driver: &dyn FormDriver, element: &ElementRef) -> Result<(), DriverError> {
    notify(
        driver,
        element,
        &[Signal::MouseDown, Signal::MouseUp, Signal::Click],
    )
    .await
}

/// Full key cycle: down, press, up.
pub(crate) fn key_cycle(key: Key) -> [Signal; 3] {
    [Signal::KeyDown(key), Signal::KeyPress(key), Signal::KeyUp(key)]
}

pub(crate) async fn notify(
    driver: &dyn FormDriver,
    element: &ElementRef,
    signals: &[Signal],
) -> Result<(), DriverError> {
    for signal in signals {
        driver.dispatch(element, *signal).await?;
    }
    Ok(())
}

/// Shared body of the plain and date fillers.
pub(crate) async fn fill_text(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    value: &str,
    commit: &[Signal],
) -> Result<FieldStatus, FillError> {
    let query = Query::Field {
        name: task.key.as_str().to_string(),
    };
    let Some(input) = ctx.locate(task, &query).await? else {
        return Ok(FieldStatus::NotFound);
    };
    ctx.driver()
        .set_value(&input, value)
        .await
        .map_err(|err| FillError::driver(&task.key, Phase::Applying, err))?;
    ctx.signals(task, Phase::Applying, &input, &[Signal::Input, Signal::Change])
        .await?;
    ctx.signals(task, Phase::Applying, &input, commit).await?;
    ctx.signals(task, Phase::Applying, &input, &[Signal::Blur])
        .await?;
    Ok(FieldStatus::Filled)
}
