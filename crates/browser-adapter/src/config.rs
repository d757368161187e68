//! Launch and timing configuration for the adapter.

use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::detect_chrome_executable;

/// Configuration for launching and tuning a browser session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser binary; detected when absent.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub no_sandbox: bool,
    pub extra_args: Vec<String>,
    pub window: (u32, u32),
    /// Bounded wait for an element to appear before fill/click.
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub launch_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: resolve_headless_default(),
            no_sandbox: true,
            extra_args: default_args(),
            window: (1280, 800),
            element_timeout_ms: 2_000,
            poll_interval_ms: 100,
            launch_timeout_ms: 20_000,
        }
    }
}

impl BrowserConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    /// Configured executable if it exists, otherwise whatever detection finds.
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        match &self.executable {
            Some(path) if path.exists() => Some(path.clone()),
            _ => detect_chrome_executable(),
        }
    }
}

fn default_args() -> Vec<String> {
    [
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
        "--disable-infobars",
        "--start-maximized",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn resolve_headless_default() -> bool {
    // "0", "false", "no", "off" mean headful
    match env::var("WEBFLOW_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn headless_env_override() {
        env::set_var("WEBFLOW_HEADLESS", "off");
        assert!(!BrowserConfig::default().headless);
        env::set_var("WEBFLOW_HEADLESS", "1");
        assert!(BrowserConfig::default().headless);
        env::remove_var("WEBFLOW_HEADLESS");
        assert!(BrowserConfig::default().headless);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: BrowserConfig = serde_json::from_str(r#"{"element_timeout_ms": 5000}"#).unwrap();
        assert_eq!(cfg.element_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.poll_interval_ms, 100);
        assert!(cfg.extra_args.iter().any(|a| a == "--disable-gpu"));
    }
}
