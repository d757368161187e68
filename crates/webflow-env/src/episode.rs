//! Episode state and the values derived from it.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persona::Persona;

/// Compact progress vector: `[username_entered, password_entered, login_succeeded]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f32; 3]);

impl Observation {
    pub const LEN: usize = 3;

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn username_entered(&self) -> bool {
        self.0[0] > 0.5
    }

    pub fn password_entered(&self) -> bool {
        self.0[1] > 0.5
    }

    pub fn login_succeeded(&self) -> bool {
        self.0[2] > 0.5
    }
}

/// Auxiliary per-step information handed to drivers and loggers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub steps: u32,
    pub visited_contact: bool,
    pub login_success: bool,
    /// Seconds since reset, rounded to two decimals.
    pub time_elapsed: f64,
}

/// One run of the task from a fresh navigation to termination.
///
/// Progress flags are write-once-true: the only mutators set them, nothing clears
/// them short of starting a new episode.
#[derive(Clone, Debug)]
pub struct Episode {
    id: Uuid,
    persona: Persona,
    steps: u32,
    username_entered: bool,
    password_entered: bool,
    login_succeeded: bool,
    contact_visited: bool,
    failures: u32,
    terminated: bool,
    started_at: Instant,
}

impl Episode {
    pub fn new(persona: Persona) -> Self {
        Self {
            id: Uuid::new_v4(),
            persona,
            steps: 0,
            username_entered: false,
            password_entered: false,
            login_succeeded: false,
            contact_visited: false,
            failures: 0,
            terminated: false,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn username_entered(&self) -> bool {
        self.username_entered
    }

    pub fn password_entered(&self) -> bool {
        self.password_entered
    }

    pub fn login_succeeded(&self) -> bool {
        self.login_succeeded
    }

    pub fn contact_visited(&self) -> bool {
        self.contact_visited
    }

    /// Adapter failures absorbed during this episode.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn begin_step(&mut self) -> u32 {
        self.steps = self.steps.saturating_add(1);
        self.steps
    }

    pub(crate) fn mark_username_entered(&mut self) {
        self.username_entered = true;
    }

    pub(crate) fn mark_password_entered(&mut self) {
        self.password_entered = true;
    }

    pub(crate) fn mark_login_succeeded(&mut self) {
        self.login_succeeded = true;
    }

    pub(crate) fn mark_contact_visited(&mut self) {
        self.contact_visited = true;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn observation(&self) -> Observation {
        let bit = |flag: bool| if flag { 1.0 } else { 0.0 };
        Observation([
            bit(self.username_entered),
            bit(self.password_entered),
            bit(self.login_succeeded),
        ])
    }

    pub fn info(&self) -> StepInfo {
        StepInfo {
            steps: self.steps,
            visited_contact: self.contact_visited,
            login_success: self.login_succeeded,
            time_elapsed: round2(self.elapsed().as_secs_f64()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_episode_is_zeroed() {
        let episode = Episode::new(Persona::FormFiller);
        assert_eq!(episode.observation(), Observation([0.0, 0.0, 0.0]));
        let info = episode.info();
        assert_eq!(info.steps, 0);
        assert!(!info.visited_contact);
        assert!(!info.login_success);
    }

    #[test]
    fn observation_tracks_flags() {
        let mut episode = Episode::new(Persona::FormFiller);
        episode.mark_password_entered();
        assert_eq!(episode.observation(), Observation([0.0, 1.0, 0.0]));
        episode.mark_username_entered();
        episode.mark_login_succeeded();
        let obs = episode.observation();
        assert!(obs.username_entered() && obs.password_entered() && obs.login_succeeded());
    }

    #[test]
    fn info_serializes_expected_fields() {
        let mut episode = Episode::new(Persona::Explorer);
        episode.begin_step();
        episode.mark_contact_visited();
        let value = serde_json::to_value(episode.info()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["login_success", "steps", "time_elapsed", "visited_contact"]);
        assert_eq!(obj["steps"], 1);
        assert_eq!(obj["visited_contact"], true);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(0.0), 0.0);
    }
}
