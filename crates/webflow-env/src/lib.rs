//! WebFlow task environment.
//!
//! A reset/step/close environment that teaches an agent to log into a demo web
//! application (and optionally visit its contact page) through a real browser.
//! Raw browser interactions are reduced to four discrete actions; progress is
//! summarised as a three-flag observation; reward is shaped per sub-goal.
//!
//! The environment is single-threaded by contract: `reset`, `step` and `close`
//! take `&mut self` and must be serialized by the caller.

pub mod action;
pub mod config;
mod env;
pub mod episode;
pub mod error;
pub mod metrics;
pub mod persona;
pub mod success;

pub use action::{Action, ActionSpace, ObservationSpace};
pub use config::{EnvConfig, Readiness, ResetOptions};
pub use env::{Step, WebFlowEnv};
pub use episode::{Episode, Observation, StepInfo};
pub use error::EnvError;
pub use persona::{Persona, RewardEvent, RewardTable};
pub use success::{SuccessPredicate, SuccessSpec};
