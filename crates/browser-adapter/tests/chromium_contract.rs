//! Contract tests for the Chromium backend. Ignored by default because they need a
//! Chrome/Chromium binary on the host.

use std::env;

use browser_adapter::{AdapterError, BrowserAdapter, BrowserConfig, ChromiumAdapter, Selector};

fn contract_enabled() -> bool {
    env::var("WEBFLOW_CHROME_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

const FORM_PAGE: &str = "data:text/html,<html><head><title>Login</title></head><body>\
<form><input name='username' value='stale'><input name='password'><button type='button'>Go</button></form>\
</body></html>";

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set WEBFLOW_CHROME_CONTRACT=1"]
async fn contract_fill_click_and_title() {
    if !contract_enabled() {
        eprintln!("skipping chromium contract test (WEBFLOW_CHROME_CONTRACT not enabled)");
        return;
    }

    let adapter = ChromiumAdapter::launch(BrowserConfig::default())
        .await
        .expect("launch chromium");

    adapter.navigate(FORM_PAGE).await.expect("navigate");
    assert_eq!(adapter.current_title().await.expect("title"), "Login");

    adapter
        .await_and_fill(&Selector::name("username"), "admin")
        .await
        .expect("fill username");
    adapter
        .await_and_click(&Selector::tag("button"))
        .await
        .expect("click button");

    let err = adapter
        .await_and_click(&Selector::name("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::ElementNotFound { .. }));

    adapter.close().await;
    adapter.close().await;
    assert_eq!(
        adapter.current_title().await.unwrap_err(),
        AdapterError::SessionClosed
    );
}
