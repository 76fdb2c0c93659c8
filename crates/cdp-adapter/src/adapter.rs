use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use form_driver::{DriverError, ScriptPort};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};

/// [`ScriptPort`] evaluating scripts in one page of a connected browser.
pub struct ChromiumScriptPort {
    _browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumScriptPort {
    /// Attach to the browser behind `config.debugger_url` and pick the page
    /// hosting the form, waiting up to the connect timeout for it to appear.
    pub async fn connect(config: &CdpConfig) -> Result<Self, AdapterError> {
        let (browser, mut handler) =
            timeout(config.connect_timeout(), Browser::connect(config.debugger_url.clone()))
                .await
                .map_err(|_| {
                    AdapterError::new(AdapterErrorKind::Connect)
                        .with_hint(format!("timed out connecting to {}", config.debugger_url))
                        .retriable(true)
                })?
                .map_err(|err| {
                    AdapterError::new(AdapterErrorKind::Connect)
                        .with_hint(format!("{}: {}", config.debugger_url, err))
                        .retriable(true)
                })?;
        info!(target: "cdp-adapter", url = %config.debugger_url, "connected to browser");

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", error = %err, "handler stopped");
                    break;
                }
            }
        });

        match find_page(&browser, config).await {
            Ok(page) => Ok(Self {
                _browser: browser,
                page,
                handler,
            }),
            Err(err) => {
                handler.abort();
                Err(err)
            }
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

impl Drop for ChromiumScriptPort {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn find_page(browser: &Browser, config: &CdpConfig) -> Result<Page, AdapterError> {
    let deadline = Instant::now() + config.connect_timeout();
    loop {
        let pages = browser.pages().await.map_err(io_error)?;
        for page in pages {
            match page.url().await {
                Ok(Some(url)) if config.matches_page(&url) => {
                    info!(target: "cdp-adapter", %url, "form page selected");
                    return Ok(page);
                }
                Ok(_) => {}
                Err(err) => warn!(target: "cdp-adapter", error = %err, "page url unavailable"),
            }
        }
        if Instant::now() >= deadline {
            return Err(AdapterError::new(AdapterErrorKind::PageNotFound)
                .with_hint(format!("no open page starts with {}", config.page_url_prefix)));
        }
        sleep(config.page_poll_interval()).await;
    }
}

fn io_error(err: CdpError) -> AdapterError {
    match err {
        CdpError::JavascriptException(details) => {
            AdapterError::new(AdapterErrorKind::ScriptException).with_hint(details.text.clone())
        }
        other => AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(other.to_string())
            .retriable(true),
    }
}

#[async_trait]
impl ScriptPort for ChromiumScriptPort {
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .await_promise(false)
            .build()
            .map_err(|err| {
                DriverError::from(AdapterError::new(AdapterErrorKind::Internal).with_hint(err))
            })?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|err| DriverError::from(io_error(err)))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}
