//! Browser automation adapter for the WebFlow environment.
//!
//! The adapter turns a handful of intents (navigate, fill, click, read title) into
//! browser operations against a page that may be slow or not yet rendered. Every
//! element lookup is a bounded wait; nothing here retries beyond that.
//!
//! Two backends are provided:
//! - [`ChromiumAdapter`] drives Chrome/Chromium over the DevTools protocol.
//! - [`StubAdapter`] simulates the demo application in-process for tests and dry runs.

use std::{env, path::PathBuf};

use chromiumoxide::detection::{default_executable, DetectionOptions};
use tracing::debug;

mod adapter;
mod chromium;
pub mod config;
pub mod error;
pub mod metrics;
mod selector;
pub mod stub;
mod waiting;

pub use adapter::BrowserAdapter;
pub use chromium::ChromiumAdapter;
pub use config::BrowserConfig;
pub use error::AdapterError;
pub use selector::Selector;
pub use stub::{StubAdapter, StubCall, StubPage};
pub use waiting::poll_until;

/// Locate a Chrome/Chromium executable.
///
/// An existing path in `WEBFLOW_CHROME` wins; otherwise chromiumoxide's own
/// detection (`CHROME` variable, `PATH`, OS install locations) is used.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Some(path) = chrome_override() {
        return Some(path);
    }
    match default_executable(DetectionOptions::default()) {
        Ok(path) => Some(path),
        Err(reason) => {
            debug!(%reason, "no chrome executable detected");
            None
        }
    }
}

fn chrome_override() -> Option<PathBuf> {
    let raw = env::var("WEBFLOW_CHROME").ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = PathBuf::from(trimmed);
    candidate.exists().then_some(candidate)
}
