//! Discrete action set and the observation/action space descriptors.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{episode::Observation, error::EnvError};

/// The four intents available to the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    EnterUsername = 0,
    EnterPassword = 1,
    SubmitLogin = 2,
    NavigateToContact = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::EnterUsername,
        Action::EnterPassword,
        Action::SubmitLogin,
        Action::NavigateToContact,
    ];

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::EnterUsername => "enter_username",
            Action::EnterPassword => "enter_password",
            Action::SubmitLogin => "submit_login",
            Action::NavigateToContact => "navigate_to_contact",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for Action {
    type Error = EnvError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Action::ALL.get(idx).copied())
            .ok_or(EnvError::InvalidAction(value))
    }
}

/// Discrete action space, `Discrete(n)` in the usual RL vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpace {
    Discrete(usize),
}

impl ActionSpace {
    pub fn n(&self) -> usize {
        match self {
            ActionSpace::Discrete(n) => *n,
        }
    }

    pub fn contains(&self, action: i64) -> bool {
        action >= 0 && (action as u64) < self.n() as u64
    }

    /// Uniform sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action::ALL[rng.gen_range(0..self.n().min(Action::ALL.len()))]
    }
}

/// Box-shaped observation space with uniform bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub low: f32,
    pub high: f32,
    pub shape: usize,
}

impl ObservationSpace {
    pub fn contains(&self, obs: &Observation) -> bool {
        obs.as_slice().len() == self.shape
            && obs.as_slice().iter().all(|v| *v >= self.low && *v <= self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn converts_valid_indices() {
        for (idx, action) in Action::ALL.iter().enumerate() {
            assert_eq!(Action::try_from(idx as i64).unwrap(), *action);
            assert_eq!(action.index(), idx as i64);
        }
    }

    #[test]
    fn rejects_out_of_range_indices() {
        for bad in [-1, 4, 99, i64::MIN, i64::MAX] {
            assert!(matches!(
                Action::try_from(bad),
                Err(EnvError::InvalidAction(v)) if v == bad
            ));
        }
        assert!(!ActionSpace::Discrete(4).contains(4));
        assert!(ActionSpace::Discrete(4).contains(3));
    }

    #[test]
    fn sampling_is_reproducible() {
        let space = ActionSpace::Discrete(4);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let xs: Vec<_> = (0..16).map(|_| space.sample(&mut a)).collect();
        let ys: Vec<_> = (0..16).map(|_| space.sample(&mut b)).collect();
        assert_eq!(xs, ys);
    }
}
