//! Chrome/Chromium backend over the DevTools protocol.

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    adapter::BrowserAdapter, config::BrowserConfig, error::AdapterError, metrics,
    selector::Selector, waiting::poll_until,
};

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

/// Live browser session. Dropped on close.
struct Session {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

/// Adapter backed by a real Chrome/Chromium process.
pub struct ChromiumAdapter {
    config: BrowserConfig,
    session: Mutex<Option<Session>>,
}

impl ChromiumAdapter {
    /// Launch a browser and open a blank page.
    pub async fn launch(config: BrowserConfig) -> Result<Self, AdapterError> {
        let mut builder = ChromeConfig::builder()
            .window_size(config.window.0, config.window.1)
            .launch_timeout(config.launch_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = config.resolve_executable() {
            builder = builder.chrome_executable(path);
        }
        for arg in &config.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let chrome_config = builder.build().map_err(AdapterError::Launch)?;

        info!(headless = config.headless, "launching chromium");
        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|err| AdapterError::Launch(err.to_string()))?;

        // The handler stream must be polled for any command to make progress.
        let handler = tokio::spawn(async move {
            while handler.next().await.is_some() {}
            debug!("cdp handler loop ended");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(AdapterError::Launch(format!("failed to open page: {}", err)));
            }
        };

        Ok(Self {
            config,
            session: Mutex::new(Some(Session {
                browser,
                page,
                handler,
            })),
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    async fn page(&self) -> Result<Page, AdapterError> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .map(|session| session.page.clone())
            .ok_or(AdapterError::SessionClosed)
    }

    /// Poll for the element until it appears or the configured wait expires.
    async fn await_element(&self, page: &Page, selector: &Selector) -> Result<Element, AdapterError> {
        let css = selector.to_css();
        let timeout = self.config.element_timeout();
        let waited = poll_until(timeout, self.config.poll_interval(), || {
            let page = page.clone();
            let css = css.clone();
            async move { page.find_element(css).await.is_ok() }
        })
        .await;

        match waited {
            Some(elapsed) => {
                debug!(%selector, waited_ms = elapsed.as_millis() as u64, "element present");
                page.find_element(css)
                    .await
                    .map_err(|err| AdapterError::Protocol(err.to_string()))
            }
            None => Err(AdapterError::element_not_found(
                selector,
                timeout.as_millis() as u64,
            )),
        }
    }
}

/// Run one adapter operation with metrics bookkeeping.
async fn instrumented<T, F>(op: &'static str, fut: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    metrics::record_op(op);
    let started = Instant::now();
    let result = fut.await;
    match &result {
        Ok(_) => metrics::record_op_success(op, started.elapsed()),
        Err(err) => {
            warn!(op, error = %err, "adapter operation failed");
            metrics::record_op_failure(op, err.kind());
        }
    }
    result
}

#[async_trait]
impl BrowserAdapter for ChromiumAdapter {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        instrumented("navigate", async {
            let page = self.page().await?;
            debug!(%url, "navigating");
            page.goto(url)
                .await
                .map_err(|err| AdapterError::navigation(url, err))?;
            Ok(())
        })
        .await
    }

    async fn await_and_fill(&self, selector: &Selector, value: &str) -> Result<(), AdapterError> {
        instrumented("fill", async {
            let page = self.page().await?;
            let element = self.await_element(&page, selector).await?;
            element
                .call_js_fn(CLEAR_VALUE_JS, false)
                .await
                .map_err(|err| AdapterError::Protocol(err.to_string()))?;
            element
                .focus()
                .await
                .map_err(|err| AdapterError::Protocol(err.to_string()))?;
            element
                .type_str(value)
                .await
                .map_err(|err| AdapterError::Protocol(err.to_string()))?;
            debug!(%selector, chars = value.len(), "filled field");
            Ok(())
        })
        .await
    }

    async fn await_and_click(&self, selector: &Selector) -> Result<(), AdapterError> {
        instrumented("click", async {
            let page = self.page().await?;
            let element = self.await_element(&page, selector).await?;
            element
                .click()
                .await
                .map_err(|err| AdapterError::Protocol(err.to_string()))?;
            debug!(%selector, "clicked");
            Ok(())
        })
        .await
    }

    async fn is_present(&self, selector: &Selector) -> Result<bool, AdapterError> {
        let page = self.page().await?;
        Ok(page.find_element(selector.to_css()).await.is_ok())
    }

    async fn current_title(&self) -> Result<String, AdapterError> {
        instrumented("title", async {
            let page = self.page().await?;
            let title = page
                .get_title()
                .await
                .map_err(|err| AdapterError::Protocol(err.to_string()))?;
            Ok(title.unwrap_or_default())
        })
        .await
    }

    async fn close(&self) {
        let session = self.session.lock().await.take();
        let Some(mut session) = session else {
            debug!("close on already closed session");
            return;
        };

        info!("shutting down chromium");
        if let Err(err) = session.browser.close().await {
            warn!(%err, "error closing browser");
        }
        if let Err(err) = session.browser.wait().await {
            warn!(%err, "error waiting for browser exit");
        }
        session.handler.abort();
    }
}
