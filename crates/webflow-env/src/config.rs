//! Environment configuration.

use std::time::Duration;

use browser_adapter::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::EnvError, persona::Persona, persona::RewardTable, success::SuccessSpec};

/// How `reset` tolerates page-load latency after navigating to the start page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Blind sleep for a fixed delay.
    Settle { delay_ms: u64 },
    /// Poll for `selector` for at most `timeout_ms`. Expiry is logged, not fatal.
    Poll { selector: Selector, timeout_ms: u64 },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Poll {
            selector: Selector::name("username"),
            timeout_ms: 1_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Page paths resolve against this URL. A base served under a sub-path
    /// needs a trailing slash (`http://host/app/`).
    pub base_url: String,
    /// Relative to `base_url`. A leading `/` resolves from the host root.
    pub login_path: String,
    pub contact_path: String,
    pub username: String,
    pub password: String,
    pub username_field: Selector,
    pub password_field: Selector,
    pub submit_control: Selector,
    pub max_steps: u32,
    pub persona: Persona,
    /// Overrides the persona's default reward table when set.
    pub rewards: Option<RewardTable>,
    pub reset_readiness: Readiness,
    /// Settle delay between clicking submit and reading the success signal.
    pub submit_settle_ms: u64,
    pub success: SuccessSpec,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            login_path: "login".to_string(),
            contact_path: "contact".to_string(),
            username: "admin".to_string(),
            password: "123".to_string(),
            username_field: Selector::name("username"),
            password_field: Selector::name("password"),
            submit_control: Selector::tag("button"),
            max_steps: 20,
            persona: Persona::FormFiller,
            rewards: None,
            reset_readiness: Readiness::default(),
            submit_settle_ms: 200,
            success: SuccessSpec::default(),
        }
    }
}

impl EnvConfig {
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        if self.max_steps == 0 {
            return Err(EnvError::Config("max_steps must be greater than zero".into()));
        }
        self.login_url()?;
        self.contact_url()?;
        Ok(())
    }

    pub fn reward_table(&self) -> RewardTable {
        self.rewards
            .unwrap_or_else(|| RewardTable::for_persona(self.persona))
    }

    pub fn login_url(&self) -> Result<String, EnvError> {
        self.join(&self.login_path)
    }

    pub fn contact_url(&self) -> Result<String, EnvError> {
        self.join(&self.contact_path)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }

    fn join(&self, path: &str) -> Result<String, EnvError> {
        let base = Url::parse(&self.base_url)
            .map_err(|err| EnvError::Config(format!("base_url '{}': {}", self.base_url, err)))?;
        base.join(path)
            .map(String::from)
            .map_err(|err| EnvError::Config(format!("path '{}': {}", path, err)))
    }
}

/// Per-reset options.
#[derive(Clone, Debug, Default)]
pub struct ResetOptions {
    /// Reseeds the environment RNG used by `sample_action`.
    pub seed: Option<u64>,
    /// Start page for this episode only; defaults to the login page.
    pub start_url: Option<String>,
}

impl ResetOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}
