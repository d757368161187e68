//! Personas and the reward-shaping table.
//!
//! Persona-specific behaviour lives entirely in [`RewardTable::for_persona`]; the
//! state machine only reports [`RewardEvent`]s and sums what the table returns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::episode::Episode;

/// Behavioural preset selected at environment construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    FormFiller,
    Explorer,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::FormFiller => "form_filler",
            Persona::Explorer => "explorer",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "form_filler" | "formfiller" => Ok(Persona::FormFiller),
            "explorer" => Ok(Persona::Explorer),
            other => Err(format!(
                "unknown persona '{}' (expected form_filler or explorer)",
                other
            )),
        }
    }
}

/// Something that happened during a step and carries reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardEvent {
    UsernameFilled,
    PasswordFilled,
    LoginSucceeded,
    SubmitRejected,
    ContactVisited,
    /// Any adapter failure caught at the step boundary.
    StepFailed,
}

/// Reward magnitudes for one persona.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    pub username_filled: f64,
    pub password_filled: f64,
    pub login_success: f64,
    pub failed_submit: f64,
    pub contact_visited: f64,
    /// Extra reward for a contact visit, granted only when `contact_visited` is set.
    pub contact_bonus: f64,
    pub step_failure: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self::for_persona(Persona::FormFiller)
    }
}

impl RewardTable {
    pub fn for_persona(persona: Persona) -> Self {
        let base = Self {
            username_filled: 0.3,
            password_filled: 0.3,
            login_success: 3.0,
            failed_submit: -0.3,
            contact_visited: 0.4,
            contact_bonus: 0.0,
            step_failure: -0.1,
        };
        match persona {
            Persona::FormFiller => base,
            Persona::Explorer => Self {
                contact_bonus: 0.3,
                ..base
            },
        }
    }

    /// Reward for `event` given the episode state after the event was applied.
    pub fn reward_for(&self, event: RewardEvent, episode: &Episode) -> f64 {
        match event {
            RewardEvent::UsernameFilled => self.username_filled,
            RewardEvent::PasswordFilled => self.password_filled,
            RewardEvent::LoginSucceeded => self.login_success,
            RewardEvent::SubmitRejected => self.failed_submit,
            RewardEvent::ContactVisited => {
                let bonus = if episode.contact_visited() {
                    self.contact_bonus
                } else {
                    0.0
                };
                self.contact_visited + bonus
            }
            RewardEvent::StepFailed => self.step_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_persona_names() {
        assert_eq!("form_filler".parse::<Persona>().unwrap(), Persona::FormFiller);
        assert_eq!("Form-Filler".parse::<Persona>().unwrap(), Persona::FormFiller);
        assert_eq!("explorer".parse::<Persona>().unwrap(), Persona::Explorer);
        assert!("speedrunner".parse::<Persona>().is_err());
    }

    #[test]
    fn explorer_bonus_requires_contact_flag() {
        let table = RewardTable::for_persona(Persona::Explorer);
        let mut episode = Episode::new(Persona::Explorer);
        assert_eq!(table.reward_for(RewardEvent::ContactVisited, &episode), 0.4);
        episode.mark_contact_visited();
        assert!((table.reward_for(RewardEvent::ContactVisited, &episode) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn form_filler_has_no_contact_bonus() {
        let table = RewardTable::for_persona(Persona::FormFiller);
        let mut episode = Episode::new(Persona::FormFiller);
        episode.mark_contact_visited();
        assert_eq!(table.reward_for(RewardEvent::ContactVisited, &episode), 0.4);
        assert_eq!(table.reward_for(RewardEvent::StepFailed, &episode), -0.1);
    }
}
