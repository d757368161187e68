//! Pluggable login-success detection.

use async_trait::async_trait;
use browser_adapter::{AdapterError, BrowserAdapter, Selector};
use serde::{Deserialize, Serialize};

/// Decides whether the page reached after a submit counts as task success.
#[async_trait]
pub trait SuccessPredicate: Send + Sync {
    async fn check(&self, adapter: &dyn BrowserAdapter) -> Result<bool, AdapterError>;

    fn describe(&self) -> String;
}

/// Configurable success signals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessSpec {
    /// Page title contains the marker. The demo app exposes nothing more structured.
    TitleContains(String),
    /// A known element is present on the landing page.
    ElementPresent(Selector),
}

impl Default for SuccessSpec {
    fn default() -> Self {
        SuccessSpec::TitleContains("Dashboard".to_string())
    }
}

#[async_trait]
impl SuccessPredicate for SuccessSpec {
    async fn check(&self, adapter: &dyn BrowserAdapter) -> Result<bool, AdapterError> {
        match self {
            SuccessSpec::TitleContains(marker) => {
                let title = adapter.current_title().await?;
                Ok(title.contains(marker.as_str()))
            }
            SuccessSpec::ElementPresent(selector) => adapter.is_present(selector).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            SuccessSpec::TitleContains(marker) => format!("title contains '{}'", marker),
            SuccessSpec::ElementPresent(selector) => format!("element {} present", selector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_adapter::StubAdapter;

    #[tokio::test]
    async fn title_marker_matches_dashboard_only() {
        let stub = StubAdapter::new("http://127.0.0.1:5000").unwrap();
        let signal = SuccessSpec::default();
        stub.navigate("http://127.0.0.1:5000/login").await.unwrap();
        assert!(!signal.check(&stub).await.unwrap());
        stub.navigate("http://127.0.0.1:5000/dashboard").await.unwrap();
        assert!(signal.check(&stub).await.unwrap());
    }

    #[tokio::test]
    async fn element_signal_uses_presence_probe() {
        let stub = StubAdapter::new("http://127.0.0.1:5000").unwrap();
        let signal = SuccessSpec::ElementPresent(Selector::name("message"));
        stub.navigate("http://127.0.0.1:5000/contact").await.unwrap();
        assert!(signal.check(&stub).await.unwrap());
        assert_eq!(signal.describe(), "element name:message present");
    }
}
