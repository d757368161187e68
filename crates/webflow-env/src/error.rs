//! Error types for the environment contract.
//!
//! Adapter failures inside `step` never reach this type: they are converted into a
//! reward penalty. Only caller contract violations and reset-time navigation
//! failures surface as errors.

use browser_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    /// Action value outside the discrete action space.
    #[error("invalid action {0}: expected an integer in [0, 3]")]
    InvalidAction(i64),

    /// The start page could not be loaded, so no initial observation exists.
    #[error("reset failed")]
    Reset(#[source] AdapterError),

    /// `step` called before the first `reset`.
    #[error("environment must be reset before stepping")]
    NotReset,

    /// `step` called on an episode that already terminated.
    #[error("episode already terminated; call reset")]
    EpisodeOver,

    /// `reset` or `step` called after `close`.
    #[error("environment is closed")]
    Closed,

    #[error("invalid environment configuration: {0}")]
    Config(String),
}
