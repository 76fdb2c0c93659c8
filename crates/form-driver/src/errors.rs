//! Error types for form drivers

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DriverError {
    /// A previously located element is no longer in the document
    #[error("element detached: {0}")]
    Detached(String),

    /// The page raised while evaluating a generated script
    #[error("script raised: {0}")]
    Script(String),

    /// The script ran but returned something the driver cannot interpret
    #[error("unexpected script result: {0}")]
    Protocol(String),

    /// Browser connection or transport failure
    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}
