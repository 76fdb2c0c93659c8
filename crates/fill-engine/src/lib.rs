//! Fill engine - one sequential pass of field fills over a foreign form
//!
//! Layers, leaf first:
//! - [`probes`]: readiness waits (element, load mask, grid settle, modal, row selection)
//! - [`fillers`]: plain, date and dropdown fields
//! - [`reference`]: the reference picker protocol
//! - [`runner`]: the orchestrator walking a [`TaskList`]
//! - [`aggregator`]: the [`FillTally`] that becomes the pass's [`FillOutcome`]
//!
//! [`FillEngineBuilder`] wires a [`form_driver::FormDriver`], a [`ReportSink`]
//! and a [`FillPolicy`] together.

pub mod aggregator;
pub mod api;
pub mod errors;
pub mod fillers;
pub mod model;
pub mod policy;
pub mod ports;
pub mod probes;
pub mod reference;
pub mod tasks;

mod runner;

pub use aggregator::{display_for, FillTally};
pub use api::{FillEngine, FillEngineBuilder};
pub use errors::{BuildError, FillError, Phase, PolicyError, ProbeError, RequestError};
pub use model::{
    CodedRecord, DisplayMessage, FieldKind, FieldReport, FieldStatus, FieldTask, FillOutcome,
    FillRequest, ProfileClass, SecondaryData, SummaryRecord, WaitProfile,
};
pub use policy::{FillPolicy, ProbeTimeouts, WaitProfiles};
pub use ports::{NullSink, ReportSink};
pub use probes::{detect_form, Presence};
pub use reference::{PickerState, ReferencePickerSession};
pub use tasks::TaskList;
