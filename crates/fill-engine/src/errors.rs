use std::fmt;

use form_driver::DriverError;
use formpilot_core_types::{FieldId, FieldIdError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Step of a field fill that was in progress when something went wrong.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lookup,
    Opening,
    MaskClear,
    ModalOpen,
    GridReady,
    Filtering,
    GridSettle,
    Selecting,
    RowSelection,
    Confirming,
    ModalClose,
    OptionList,
    Applying,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Lookup => "lookup",
            Phase::Opening => "opening",
            Phase::MaskClear => "mask clear",
            Phase::ModalOpen => "modal open",
            Phase::GridReady => "grid ready",
            Phase::Filtering => "filtering",
            Phase::GridSettle => "grid settle",
            Phase::Selecting => "selecting",
            Phase::RowSelection => "row selection",
            Phase::Confirming => "confirming",
            Phase::ModalClose => "modal close",
            Phase::OptionList => "option list",
            Phase::Applying => "applying",
        }
    }

    /// How a timeout in this phase reads in an error message.
    pub fn stalled(self) -> &'static str {
        match self {
            Phase::Lookup => "element did not appear",
            Phase::MaskClear => "loading mask did not clear",
            Phase::ModalOpen | Phase::Opening => "picker did not open",
            Phase::GridReady => "grid did not populate",
            Phase::GridSettle | Phase::Filtering => "grid did not settle",
            Phase::RowSelection | Phase::Selecting => "row was not selected",
            Phase::ModalClose | Phase::Confirming => "picker did not close",
            Phase::OptionList => "option list did not open",
            Phase::Applying => "value was not applied",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of a single readiness probe, before field context is known.
#[derive(Debug, Error, Clone)]
pub enum ProbeError {
    #[error("timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Field-level failure. Every variant names the field and, where one
/// applies, the phase that failed.
#[derive(Debug, Error, Clone)]
pub enum FillError {
    #[error("{what} not found for field {field}")]
    NotFound { field: FieldId, what: String },

    #[error("{} for field {field} within {waited_ms}ms", .phase.stalled())]
    Timeout {
        field: FieldId,
        phase: Phase,
        waited_ms: u64,
    },

    #[error("value '{value}' is not offered for field {field}")]
    ValueNotOffered { field: FieldId, value: String },

    #[error("protocol violation for field {field} during {phase}: {detail}")]
    ProtocolViolation {
        field: FieldId,
        phase: Phase,
        detail: String,
    },

    #[error("driver failed for field {field} during {phase}: {source}")]
    Driver {
        field: FieldId,
        phase: Phase,
        #[source]
        source: DriverError,
    },
}

impl FillError {
    /// Attach field context to a probe failure.
    pub fn from_probe(field: &FieldId, phase: Phase, err: ProbeError) -> Self {
        match err {
            ProbeError::Timeout { waited_ms, .. } => FillError::Timeout {
                field: field.clone(),
                phase,
                waited_ms,
            },
            ProbeError::Driver(source) => FillError::Driver {
                field: field.clone(),
                phase,
                source,
            },
        }
    }

    pub fn driver(field: &FieldId, phase: Phase, source: DriverError) -> Self {
        FillError::Driver {
            field: field.clone(),
            phase,
            source,
        }
    }

    pub fn violation(field: &FieldId, phase: Phase, detail: impl Into<String>) -> Self {
        FillError::ProtocolViolation {
            field: field.clone(),
            phase,
            detail: detail.into(),
        }
    }

    pub fn field(&self) -> &FieldId {
        match self {
            FillError::NotFound { field, .. }
            | FillError::Timeout { field, .. }
            | FillError::ValueNotOffered { field, .. }
            | FillError::ProtocolViolation { field, .. }
            | FillError::Driver { field, .. } => field,
        }
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            FillError::NotFound { .. } => "not_found",
            FillError::Timeout { .. } => "timeout",
            FillError::ValueNotOffered { .. } => "value_not_offered",
            FillError::ProtocolViolation { .. } => "protocol_violation",
            FillError::Driver { .. } => "driver",
        }
    }
}

/// Invalid policy, profile or task list.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PolicyError {
    #[error("wait profile {name}: stable delay {stable_delay_ms}ms must be shorter than timeout {timeout_ms}ms")]
    InvalidProfile {
        name: String,
        timeout_ms: u64,
        stable_delay_ms: u64,
    },
    #[error("poll interval must be positive")]
    ZeroPollInterval,
    #[error("task list is empty")]
    EmptyTaskList,
    #[error("field {0} appears more than once in the task list")]
    DuplicateTask(FieldId),
    #[error("reference field {0} has an empty column header")]
    EmptyColumn(FieldId),
    #[error("cannot parse task list: {0}")]
    Parse(String),
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum BuildError {
    #[error("a form driver is required")]
    MissingDriver,
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Malformed fill request payload.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid field key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: FieldIdError,
    },
    #[error("field {0} has a structured value; only strings, numbers and booleans are accepted")]
    UnsupportedValue(String),
    #[error("field {0} is supplied more than once")]
    DuplicateKey(FieldId),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
