use async_trait::async_trait;

use crate::{error::AdapterError, selector::Selector};

/// Intent-level browser operations consumed by the environment.
///
/// Implementations own the live session exclusively and never expose raw page
/// internals. None of the operations are idempotent at the network level: a
/// repeated click can submit a form twice.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    /// Issue a navigation. Does not verify that the page finished loading.
    async fn navigate(&self, url: &str) -> Result<(), AdapterError>;

    /// Wait (bounded) for an input, clear it, then type `value`.
    async fn await_and_fill(&self, selector: &Selector, value: &str) -> Result<(), AdapterError>;

    /// Wait (bounded) for a control, then click it.
    async fn await_and_click(&self, selector: &Selector) -> Result<(), AdapterError>;

    /// Single non-blocking presence probe.
    async fn is_present(&self, selector: &Selector) -> Result<bool, AdapterError>;

    /// Title of the currently loaded page (empty when the page has none).
    async fn current_title(&self) -> Result<String, AdapterError>;

    /// Release the session. Safe to call repeatedly; never fails.
    async fn close(&self);
}

#[async_trait]
impl<T: BrowserAdapter + ?Sized> BrowserAdapter for Box<T> {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        (**self).navigate(url).await
    }

    async fn await_and_fill(&self, selector: &Selector, value: &str) -> Result<(), AdapterError> {
        (**self).await_and_fill(selector, value).await
    }

    async fn await_and_click(&self, selector: &Selector) -> Result<(), AdapterError> {
        (**self).await_and_click(selector).await
    }

    async fn is_present(&self, selector: &Selector) -> Result<bool, AdapterError> {
        (**self).is_present(selector).await
    }

    async fn current_title(&self) -> Result<String, AdapterError> {
        (**self).current_title().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
