//! Chromium DevTools backend for [`form_driver::ScriptDriver`].
//!
//! The adapter attaches to an already running browser (the operator's own
//! session, where the hosted form is open) and evaluates generated scripts
//! in the first page whose URL matches the configured prefix.

pub mod adapter;

pub use adapter::ChromiumScriptPort;
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};

pub mod config {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    /// Connection settings for an existing Chromium instance.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        /// DevTools websocket (`ws://…/devtools/browser/…`)
        pub debugger_url: String,
        /// Pages whose URL starts with this prefix host the form
        pub page_url_prefix: String,
        pub connect_timeout_ms: u64,
        pub page_poll_interval_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                debugger_url: "ws://127.0.0.1:9222/devtools/browser".to_string(),
                page_url_prefix: "https://gisoms.ffoms.gov.ru/".to_string(),
                connect_timeout_ms: 10_000,
                page_poll_interval_ms: 250,
            }
        }
    }

    impl CdpConfig {
        pub fn connect_timeout(&self) -> Duration {
            Duration::from_millis(self.connect_timeout_ms)
        }

        pub fn page_poll_interval(&self) -> Duration {
            Duration::from_millis(self.page_poll_interval_ms.max(10))
        }

        pub fn matches_page(&self, url: &str) -> bool {
            url.starts_with(&self.page_url_prefix)
        }
    }
}

pub mod error {
    use form_driver::DriverError;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("cannot connect to browser")]
        Connect,
        #[error("no page hosts the form")]
        PageNotFound,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("page script raised")]
        ScriptException,
        #[error("internal error")]
        Internal,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }
    }

    impl From<AdapterError> for DriverError {
        fn from(err: AdapterError) -> Self {
            let message = err.to_string();
            match err.kind {
                AdapterErrorKind::ScriptException => DriverError::Script(message),
                AdapterErrorKind::Internal => DriverError::Internal(message),
                AdapterErrorKind::Connect
                | AdapterErrorKind::PageNotFound
                | AdapterErrorKind::CdpIo => DriverError::Transport(message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_driver::DriverError;

    #[test]
    fn config_defaults_target_hosted_form() {
        let config: CdpConfig =
            serde_yaml::from_str("debugger_url: ws://10.0.0.5:9222/devtools/browser/abc\n").unwrap();
        assert_eq!(config.page_url_prefix, "https://gisoms.ffoms.gov.ru/");
        assert!(config.matches_page("https://gisoms.ffoms.gov.ru/hospital/case/12"));
        assert!(!config.matches_page("https://example.org/"));
        assert_eq!(config.connect_timeout().as_millis(), 10_000);
    }

    #[test]
    fn adapter_errors_lift_into_driver_errors() {
        let err: DriverError = AdapterError::new(AdapterErrorKind::ScriptException)
            .with_hint("ReferenceError: x is not defined")
            .into();
        assert!(matches!(err, DriverError::Script(ref msg) if msg.contains("ReferenceError")));

        let err: DriverError = AdapterError::new(AdapterErrorKind::CdpIo).into();
        assert!(matches!(err, DriverError::Transport(_)));
    }
}
