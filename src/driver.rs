//! Episode driver: runs a policy against the environment and summarises results.

use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result};
use browser_adapter::BrowserAdapter;
use futures::FutureExt;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webflow_env::{Action, ActionSpace, Observation, ResetOptions, StepInfo, WebFlowEnv};

/// Chooses the next action from the current observation.
pub trait Policy: Send {
    fn name(&self) -> &'static str;

    fn act(&mut self, observation: &Observation) -> Action;
}

/// Fills whichever credential is missing, then submits.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptedPolicy;

impl Policy for ScriptedPolicy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn act(&mut self, observation: &Observation) -> Action {
        if !observation.username_entered() {
            Action::EnterUsername
        } else if !observation.password_entered() {
            Action::EnterPassword
        } else {
            Action::SubmitLogin
        }
    }
}

/// Uniform over the action space.
pub struct RandomPolicy {
    space: ActionSpace,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            space: ActionSpace::Discrete(Action::ALL.len()),
            rng,
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn act(&mut self, _observation: &Observation) -> Action {
        self.space.sample(&mut self.rng)
    }
}

/// One finished episode, built from the cumulative reward and the final step info.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub total_reward: f64,
    pub login_success: bool,
    pub visited_contact: bool,
    pub steps: u32,
    pub time_elapsed: f64,
}

impl EpisodeSummary {
    fn new(episode: u32, total_reward: f64, info: &StepInfo) -> Self {
        Self {
            episode,
            total_reward: round2(total_reward),
            login_success: info.login_success,
            visited_contact: info.visited_contact,
            steps: info.steps,
            time_elapsed: info.time_elapsed,
        }
    }
}

/// Aggregate over a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub policy: String,
    pub episodes: Vec<EpisodeSummary>,
    pub interrupted: bool,
    pub success_rate: f64,
    pub contact_rate: f64,
    pub mean_reward: f64,
    pub mean_steps: f64,
}

impl RunReport {
    pub fn new(policy: &str, episodes: Vec<EpisodeSummary>, interrupted: bool) -> Self {
        let n = episodes.len() as f64;
        let mean = |f: &dyn Fn(&EpisodeSummary) -> f64| {
            if episodes.is_empty() {
                0.0
            } else {
                round2(episodes.iter().map(f).sum::<f64>() / n)
            }
        };
        let success_rate = mean(&|e| if e.login_success { 1.0 } else { 0.0 });
        let contact_rate = mean(&|e| if e.visited_contact { 1.0 } else { 0.0 });
        let mean_reward = mean(&|e| e.total_reward);
        let mean_steps = mean(&|e| e.steps as f64);
        Self {
            policy: policy.to_string(),
            episodes,
            interrupted,
            success_rate,
            contact_rate,
            mean_reward,
            mean_steps,
        }
    }
}

/// Run one episode to termination.
///
/// Returns `None` when `cancel` fires; cancellation is only observed between steps.
pub async fn run_episode<A: BrowserAdapter>(
    env: &mut WebFlowEnv<A>,
    policy: &mut dyn Policy,
    index: u32,
    options: ResetOptions,
    cancel: &CancellationToken,
) -> Result<Option<EpisodeSummary>> {
    let (mut observation, mut info) = env
        .reset(options)
        .await
        .with_context(|| format!("Failed to reset environment for episode {}", index))?;
    let mut total_reward = 0.0;

    loop {
        if cancel.is_cancelled() {
            warn!(episode = index, steps = info.steps, "episode interrupted");
            return Ok(None);
        }
        let action = policy.act(&observation);
        let step = env
            .step_action(action)
            .await
            .with_context(|| format!("Step failed in episode {}", index))?;
        debug!(episode = index, action = %action, reward = step.reward, "policy step");
        total_reward += step.reward;
        observation = step.observation;
        info = step.info;
        if step.terminated || step.truncated {
            break;
        }
    }

    let summary = EpisodeSummary::new(index, total_reward, &info);
    info!(
        episode = summary.episode,
        total_reward = summary.total_reward,
        login_success = summary.login_success,
        visited_contact = summary.visited_contact,
        steps = summary.steps,
        "episode summary"
    );
    Ok(Some(summary))
}

/// Run up to `episodes` episodes, calling `on_episode` after each one.
///
/// Episode `i` is reset with `seed + i` when a seed is given. The caller owns the
/// environment and must close it whatever this returns.
pub async fn run_episodes<A, F>(
    env: &mut WebFlowEnv<A>,
    policy: &mut dyn Policy,
    episodes: u32,
    seed: Option<u64>,
    cancel: &CancellationToken,
    mut on_episode: F,
) -> Result<RunReport>
where
    A: BrowserAdapter,
    F: FnMut(&EpisodeSummary),
{
    let mut summaries = Vec::with_capacity(episodes as usize);
    let mut interrupted = false;

    for index in 1..=episodes {
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }
        let options = ResetOptions {
            seed: seed.map(|s| s.wrapping_add(u64::from(index))),
            ..ResetOptions::default()
        };
        match run_episode(env, policy, index, options, cancel).await? {
            Some(summary) => {
                on_episode(&summary);
                summaries.push(summary);
            }
            None => {
                interrupted = true;
                break;
            }
        }
    }

    let report = RunReport::new(policy.name(), summaries, interrupted);
    info!(
        policy = %report.policy,
        episodes = report.episodes.len(),
        success_rate = report.success_rate,
        mean_reward = report.mean_reward,
        interrupted = report.interrupted,
        "run finished"
    );
    Ok(report)
}

/// [`run_episodes`], then close the environment whether the run succeeded,
/// failed, was cancelled or panicked. A panic resumes after the close.
pub async fn run_and_close<A, F>(
    env: &mut WebFlowEnv<A>,
    policy: &mut dyn Policy,
    episodes: u32,
    seed: Option<u64>,
    cancel: &CancellationToken,
    on_episode: F,
) -> Result<RunReport>
where
    A: BrowserAdapter,
    F: FnMut(&EpisodeSummary),
{
    let outcome = AssertUnwindSafe(run_episodes(env, policy, episodes, seed, cancel, on_episode))
        .catch_unwind()
        .await;
    env.close().await;
    match outcome {
        Ok(result) => {
            if let Err(err) = &result {
                warn!(error = %format!("{:#}", err), "run aborted; environment closed");
            }
            result
        }
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_policy_follows_the_form() {
        let mut policy = ScriptedPolicy;
        assert_eq!(policy.act(&Observation([0.0, 0.0, 0.0])), Action::EnterUsername);
        assert_eq!(policy.act(&Observation([1.0, 0.0, 0.0])), Action::EnterPassword);
        assert_eq!(policy.act(&Observation([0.0, 1.0, 0.0])), Action::EnterUsername);
        assert_eq!(policy.act(&Observation([1.0, 1.0, 0.0])), Action::SubmitLogin);
    }

    #[test]
    fn random_policy_is_reproducible_with_seed() {
        let obs = Observation::default();
        let mut a = RandomPolicy::new(Some(3));
        let mut b = RandomPolicy::new(Some(3));
        let xs: Vec<_> = (0..16).map(|_| a.act(&obs)).collect();
        let ys: Vec<_> = (0..16).map(|_| b.act(&obs)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn report_aggregates() {
        let summary = |episode, total_reward, login_success, steps| EpisodeSummary {
            episode,
            total_reward,
            login_success,
            visited_contact: !login_success,
            steps,
            time_elapsed: 0.0,
        };
        let report = RunReport::new(
            "scripted",
            vec![summary(1, 3.6, true, 3), summary(2, -2.0, false, 20)],
            false,
        );
        assert_eq!(report.success_rate, 0.5);
        assert_eq!(report.contact_rate, 0.5);
        assert_eq!(report.mean_reward, 0.8);
        assert_eq!(report.mean_steps, 11.5);

        let empty = RunReport::new("random", Vec::new(), true);
        assert_eq!(empty.success_rate, 0.0);
        assert!(empty.interrupted);
    }
}
