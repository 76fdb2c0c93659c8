use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DriverError;
use crate::model::{ElementRef, ElementState, Query, Signal};

/// Capability interface over the foreign document.
///
/// Callers must hold exclusive use of the document for the duration of a
/// pass; implementations do not lock.
#[async_trait]
pub trait FormDriver: Send + Sync {
    /// First element matching the query, if any.
    async fn find(&self, query: &Query) -> Result<Option<ElementRef>, DriverError>;

    /// Number of elements currently matching the query.
    async fn count(&self, query: &Query) -> Result<usize, DriverError>;

    async fn state(&self, element: &ElementRef) -> Result<ElementState, DriverError>;

    /// Focus the element and replace its value. Emits no events.
    async fn set_value(&self, element: &ElementRef, value: &str) -> Result<(), DriverError>;

    async fn dispatch(&self, element: &ElementRef, signal: Signal) -> Result<(), DriverError>;
}

/// Evaluates a self-contained script in the page hosting the form and
/// returns its JSON result.
#[async_trait]
pub trait ScriptPort: Send + Sync {
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;
}
