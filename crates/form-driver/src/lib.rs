//! Form driver - the engine's only window into the foreign document
//!
//! The fill engine never touches a DOM directly. Everything it needs is
//! expressed through [`FormDriver`]:
//! - `find` / `count` for semantic lookups ([`Query`])
//! - `state` for visibility and selection of a located element
//! - `set_value` / `dispatch` for mutation and synthetic events
//!
//! Two implementations ship with the crate: [`ScriptDriver`], which turns
//! every call into a self-contained script for a [`ScriptPort`] (a real
//! browser), and [`MemoryForm`], a scripted in-memory form used by tests and
//! dry runs.

pub mod contract;
pub mod errors;
pub mod memory;
pub mod model;
pub mod ports;
pub mod script;

pub use contract::UiContract;
pub use errors::DriverError;
pub use memory::{Catalog, DriverCall, FormFixture, MemoryForm, MemoryFormBuilder};
pub use model::{ElementRef, ElementState, Key, Query, Signal};
pub use ports::{FormDriver, ScriptPort};
pub use script::ScriptDriver;
