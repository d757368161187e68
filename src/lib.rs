//! WebFlow command-line library
//!
//! Exposes configuration, the episode driver and metrics wiring for the binary and
//! for integration testing.

pub mod config;
pub mod driver;
pub mod metrics;
pub mod output;

pub use config::{AppConfig, DriverConfig, PolicyKind};
pub use driver::{run_and_close, run_episode, run_episodes, EpisodeSummary, Policy, RandomPolicy, RunReport, ScriptedPolicy};
pub use output::OutputFormat;
