//! Application configuration.
//!
//! Layering, lowest to highest: built-in defaults, the YAML file, `WEBFLOW_*`
//! environment variables, then command-line flags (applied by the binary).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use browser_adapter::BrowserConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use webflow_env::{EnvConfig, Persona};

/// Which policy drives the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Scripted,
    Random,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub episodes: u32,
    pub seed: Option<u64>,
    pub policy: PolicyKind,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            episodes: 5,
            seed: None,
            policy: PolicyKind::Scripted,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub env: EnvConfig,
    pub driver: DriverConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    InvalidOverride {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// `<config_dir>/webflow/config.yaml`, when the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("webflow");
    path.push("config.yaml");
    Some(path)
}

/// Load the configuration file, falling back to defaults when it does not exist.
pub async fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("No config directory on this platform, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(AppConfig::default())
    }
}

impl AppConfig {
    /// Apply `WEBFLOW_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WEBFLOW_BASE_URL") {
            info!(base_url = %value, "base url overridden from environment");
            self.env.base_url = value;
        }
        if let Some(value) = lookup("WEBFLOW_PERSONA") {
            self.env.persona = value
                .parse::<Persona>()
                .map_err(|reason| ConfigError::InvalidOverride {
                    var: "WEBFLOW_PERSONA",
                    value: value.clone(),
                    reason,
                })?;
        }
        if let Some(value) = lookup("WEBFLOW_HEADLESS") {
            self.browser.headless = parse_flag(&value).ok_or_else(|| ConfigError::InvalidOverride {
                var: "WEBFLOW_HEADLESS",
                value: value.clone(),
                reason: "expected a boolean".to_string(),
            })?;
        }
        if let Some(value) = lookup("WEBFLOW_MAX_STEPS") {
            self.env.max_steps = value
                .trim()
                .parse::<u32>()
                .map_err(|err| ConfigError::InvalidOverride {
                    var: "WEBFLOW_MAX_STEPS",
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.yaml")))
            .await
            .unwrap();
        assert_eq!(config.env.max_steps, 20);
        assert_eq!(config.driver.episodes, 5);
        assert_eq!(config.driver.policy, PolicyKind::Scripted);
    }

    #[tokio::test]
    async fn partial_yaml_merges_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "env:\n  persona: explorer\n  base_url: http://localhost:8080\ndriver:\n  policy: random\n  seed: 11\n"
        )
        .unwrap();
        let config = load_config(Some(file.path())).await.unwrap();
        assert_eq!(config.env.persona, Persona::Explorer);
        assert_eq!(config.env.login_url().unwrap(), "http://localhost:8080/login");
        assert_eq!(config.env.username, "admin");
        assert_eq!(config.driver.policy, PolicyKind::Random);
        assert_eq!(config.driver.seed, Some(11));
        assert_eq!(config.browser.element_timeout_ms, 2000);
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "env: [not, a, map").unwrap();
        assert!(load_config(Some(file.path())).await.is_err());
    }

    #[test]
    fn environment_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_overrides_from(lookup(&[
                ("WEBFLOW_BASE_URL", "http://10.0.0.2:5000"),
                ("WEBFLOW_PERSONA", "explorer"),
                ("WEBFLOW_HEADLESS", "off"),
                ("WEBFLOW_MAX_STEPS", "8"),
            ]))
            .unwrap();
        assert_eq!(config.env.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.env.persona, Persona::Explorer);
        assert!(!config.browser.headless);
        assert_eq!(config.env.max_steps, 8);
    }

    #[test]
    #[serial_test::serial]
    fn process_environment_is_read() {
        std::env::set_var("WEBFLOW_MAX_STEPS", "12");
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();
        std::env::remove_var("WEBFLOW_MAX_STEPS");
        result.unwrap();
        assert_eq!(config.env.max_steps, 12);
    }

    #[test]
    fn bad_override_names_the_variable() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides_from(lookup(&[("WEBFLOW_MAX_STEPS", "many")]))
            .unwrap_err();
        assert!(err.to_string().starts_with("WEBFLOW_MAX_STEPS="));

        let err = config
            .apply_overrides_from(lookup(&[("WEBFLOW_PERSONA", "tourist")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { var: "WEBFLOW_PERSONA", .. }
        ));
    }
}
