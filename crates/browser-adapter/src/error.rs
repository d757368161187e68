//! Error types surfaced by the browser adapter.

use thiserror::Error;

/// Failures the adapter reports back to the environment.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The element did not appear before the wait budget expired.
    #[error("element not found: {selector} (waited {waited_ms}ms)")]
    ElementNotFound { selector: String, waited_ms: u64 },

    /// Network or navigation failure while loading a URL.
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailure { url: String, reason: String },

    /// The browser process could not be started.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// DevTools protocol or page-level failure outside the categories above.
    #[error("browser protocol error: {0}")]
    Protocol(String),

    /// The session has already been torn down.
    #[error("browser session closed")]
    SessionClosed,
}

impl AdapterError {
    pub fn element_not_found(selector: impl ToString, waited_ms: u64) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            waited_ms,
        }
    }

    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::NavigationFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::ElementNotFound { .. } => "element_not_found",
            AdapterError::NavigationFailure { .. } => "navigation_failure",
            AdapterError::Launch(_) => "launch",
            AdapterError::Protocol(_) => "protocol",
            AdapterError::SessionClosed => "session_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_selector_and_wait() {
        let err = AdapterError::element_not_found("name:username", 2000);
        assert_eq!(
            err.to_string(),
            "element not found: name:username (waited 2000ms)"
        );
        assert_eq!(err.kind(), "element_not_found");
    }

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(AdapterError::Launch("no chrome".into()).kind(), "launch");
        assert_eq!(AdapterError::SessionClosed.kind(), "session_closed");
        assert_eq!(
            AdapterError::navigation("http://x", "refused").kind(),
            "navigation_failure"
        );
    }
}
