//! The reset/step/close state machine.

use std::time::Duration;

use browser_adapter::{poll_until, AdapterError, BrowserAdapter};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    action::{Action, ActionSpace, ObservationSpace},
    config::{EnvConfig, Readiness, ResetOptions},
    episode::{Episode, Observation, StepInfo},
    error::EnvError,
    metrics,
    persona::{RewardEvent, RewardTable},
    success::SuccessPredicate,
};

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one `step`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    /// Always false: the step limit is reported through `terminated`.
    pub truncated: bool,
    pub info: StepInfo,
}

/// Login-flow environment over a browser adapter.
pub struct WebFlowEnv<A: BrowserAdapter> {
    adapter: A,
    config: EnvConfig,
    rewards: RewardTable,
    success: Box<dyn SuccessPredicate>,
    login_url: String,
    contact_url: String,
    episode: Option<Episode>,
    rng: StdRng,
    closed: bool,
}

impl<A: BrowserAdapter> WebFlowEnv<A> {
    pub fn new(adapter: A, config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let login_url = config.login_url()?;
        let contact_url = config.contact_url()?;
        Ok(Self {
            adapter,
            rewards: config.reward_table(),
            success: Box::new(config.success.clone()),
            login_url,
            contact_url,
            config,
            episode: None,
            rng: StdRng::from_entropy(),
            closed: false,
        })
    }

    /// Replace the configured success signal.
    pub fn with_success_predicate(mut self, predicate: impl SuccessPredicate + 'static) -> Self {
        self.success = Box::new(predicate);
        self
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(Action::ALL.len())
    }

    pub fn observation_space(&self) -> ObservationSpace {
        ObservationSpace {
            low: 0.0,
            high: 1.0,
            shape: Observation::LEN,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Current episode, if `reset` has succeeded at least once.
    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Uniform random action drawn from the environment RNG.
    pub fn sample_action(&mut self) -> Action {
        self.action_space().sample(&mut self.rng)
    }

    /// Start a new episode on a freshly navigated start page.
    ///
    /// A navigation failure here propagates: without the start page there is no
    /// valid initial observation. Readiness expiry only logs.
    pub async fn reset(&mut self, options: ResetOptions) -> Result<(Observation, StepInfo), EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        self.episode = None;
        if let Some(seed) = options.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        let start_url = options.start_url.as_deref().unwrap_or(&self.login_url);
        debug!(url = %start_url, "resetting environment");
        self.adapter
            .navigate(start_url)
            .await
            .map_err(EnvError::Reset)?;
        self.await_ready().await;

        let episode = Episode::new(self.config.persona);
        info!(
            episode = %episode.id(),
            persona = %episode.persona(),
            max_steps = self.config.max_steps,
            "episode started"
        );
        metrics::record_reset();
        let result = (episode.observation(), episode.info());
        self.episode = Some(episode);
        Ok(result)
    }

    /// Step with a raw action index. Out-of-range values fail before anything moves.
    pub async fn step(&mut self, action: i64) -> Result<Step, EnvError> {
        let action = Action::try_from(action)?;
        self.step_action(action).await
    }

    pub async fn step_action(&mut self, action: Action) -> Result<Step, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let episode = self.episode.as_mut().ok_or(EnvError::NotReset)?;
        if episode.is_terminated() {
            return Err(EnvError::EpisodeOver);
        }

        let step = episode.begin_step();
        metrics::record_step(action.as_str());

        let outcome = apply_action(
            &self.adapter,
            &self.config,
            self.success.as_ref(),
            &self.contact_url,
            episode,
            action,
        )
        .await;

        let reward = match outcome {
            Ok(event) => self.rewards.reward_for(event, episode),
            Err(err) => {
                warn!(
                    episode = %episode.id(),
                    step,
                    action = %action,
                    error = %err,
                    "action failed; applying step penalty"
                );
                episode.record_failure();
                metrics::record_step_failure(action.as_str(), err.kind());
                self.rewards.reward_for(RewardEvent::StepFailed, episode)
            }
        };

        let terminated = episode.login_succeeded() || step >= self.config.max_steps;
        if terminated {
            episode.terminate();
            let outcome = if episode.login_succeeded() {
                "success"
            } else {
                "step_limit"
            };
            metrics::record_episode(outcome);
            info!(
                episode = %episode.id(),
                steps = step,
                failures = episode.failures(),
                outcome,
                "episode finished"
            );
        }

        info!(
            episode = %episode.id(),
            step,
            action = %action,
            reward,
            terminated,
            "step"
        );

        Ok(Step {
            observation: episode.observation(),
            reward,
            terminated,
            truncated: false,
            info: episode.info(),
        })
    }

    /// Release the browser session and discard the episode. Idempotent and infallible.
    pub async fn close(&mut self) {
        if self.closed {
            debug!("environment already closed");
        }
        self.episode = None;
        self.adapter.close().await;
        self.closed = true;
    }

    async fn await_ready(&self) {
        match &self.config.reset_readiness {
            Readiness::Settle { delay_ms } => {
                sleep(Duration::from_millis(*delay_ms)).await;
            }
            Readiness::Poll { selector, timeout_ms } => {
                let timeout = Duration::from_millis(*timeout_ms);
                let adapter = &self.adapter;
                let ready = poll_until(timeout, READINESS_POLL_INTERVAL, || async move {
                    adapter.is_present(selector).await.unwrap_or(false)
                })
                .await;
                match ready {
                    Some(waited) => {
                        debug!(%selector, waited_ms = waited.as_millis() as u64, "start page ready")
                    }
                    None => warn!(%selector, timeout_ms, "start page not ready; continuing"),
                }
            }
        }
    }
}

/// Map one action onto adapter calls and set the flags it earns.
async fn apply_action<A: BrowserAdapter>(
    adapter: &A,
    config: &EnvConfig,
    success: &dyn SuccessPredicate,
    contact_url: &str,
    episode: &mut Episode,
    action: Action,
) -> Result<RewardEvent, AdapterError> {
    match action {
        Action::EnterUsername => {
            adapter
                .await_and_fill(&config.username_field, &config.username)
                .await?;
            episode.mark_username_entered();
            Ok(RewardEvent::UsernameFilled)
        }
        Action::EnterPassword => {
            adapter
                .await_and_fill(&config.password_field, &config.password)
                .await?;
            episode.mark_password_entered();
            Ok(RewardEvent::PasswordFilled)
        }
        Action::SubmitLogin => {
            adapter.await_and_click(&config.submit_control).await?;
            sleep(config.submit_settle()).await;
            if success.check(adapter).await? {
                episode.mark_login_succeeded();
                Ok(RewardEvent::LoginSucceeded)
            } else {
                debug!(signal = %success.describe(), "submit did not reach success page");
                Ok(RewardEvent::SubmitRejected)
            }
        }
        Action::NavigateToContact => {
            adapter.navigate(contact_url).await?;
            episode.mark_contact_visited();
            Ok(RewardEvent::ContactVisited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;
    use browser_adapter::{Selector, StubAdapter, StubCall};

    fn quick_config(persona: Persona) -> EnvConfig {
        EnvConfig {
            persona,
            submit_settle_ms: 0,
            reset_readiness: Readiness::Settle { delay_ms: 0 },
            ..EnvConfig::default()
        }
    }

    fn env(persona: Persona) -> WebFlowEnv<StubAdapter> {
        let stub = StubAdapter::new("http://127.0.0.1:5000").unwrap();
        WebFlowEnv::new(stub, quick_config(persona)).unwrap()
    }

    #[tokio::test]
    async fn step_before_reset_is_rejected() {
        let mut env = env(Persona::FormFiller);
        assert!(matches!(env.step(0).await, Err(EnvError::NotReset)));
    }

    #[tokio::test]
    async fn invalid_action_touches_nothing() {
        let mut env = env(Persona::FormFiller);
        env.reset(ResetOptions::default()).await.unwrap();
        env.adapter().clear_calls();
        assert!(matches!(env.step(7).await, Err(EnvError::InvalidAction(7))));
        assert!(matches!(env.step(-1).await, Err(EnvError::InvalidAction(-1))));
        assert!(env.adapter().calls().is_empty());
        assert_eq!(env.episode().unwrap().steps(), 0);
    }

    #[tokio::test]
    async fn reset_navigates_to_login_and_polls_readiness() {
        let stub = StubAdapter::new("http://127.0.0.1:5000").unwrap();
        let config = EnvConfig {
            submit_settle_ms: 0,
            ..EnvConfig::default()
        };
        let mut env = WebFlowEnv::new(stub, config).unwrap();
        let (obs, info) = env.reset(ResetOptions::default()).await.unwrap();
        assert_eq!(obs, Observation([0.0; 3]));
        assert_eq!(info.steps, 0);
        let calls = env.adapter().calls();
        assert_eq!(calls[0], StubCall::Navigate("http://127.0.0.1:5000/login".into()));
        assert_eq!(calls[1], StubCall::Probe(Selector::name("username")));
    }

    #[tokio::test]
    async fn reset_propagates_navigation_failure() {
        let mut env = env(Persona::FormFiller);
        env.adapter().fail_next_navigation("net::ERR_CONNECTION_REFUSED");
        let err = env.reset(ResetOptions::default()).await.unwrap_err();
        assert!(matches!(err, EnvError::Reset(AdapterError::NavigationFailure { .. })));
        assert!(env.episode().is_none());
    }

    #[tokio::test]
    async fn failed_action_costs_fixed_penalty() {
        let mut env = env(Persona::FormFiller);
        env.reset(ResetOptions::default()).await.unwrap();
        env.adapter().hide(Selector::name("username"));
        let step = env.step_action(Action::EnterUsername).await.unwrap();
        assert!((step.reward + 0.1).abs() < 1e-9);
        assert!(!step.terminated);
        assert_eq!(step.observation, Observation([0.0; 3]));
        assert_eq!(env.episode().unwrap().failures(), 1);
    }

    #[tokio::test]
    async fn stepping_after_termination_is_rejected() {
        let mut env = env(Persona::FormFiller);
        env.reset(ResetOptions::default()).await.unwrap();
        env.step_action(Action::EnterUsername).await.unwrap();
        env.step_action(Action::EnterPassword).await.unwrap();
        assert!(env.step_action(Action::SubmitLogin).await.unwrap().terminated);
        assert!(matches!(
            env.step_action(Action::SubmitLogin).await,
            Err(EnvError::EpisodeOver)
        ));
    }

    #[tokio::test]
    async fn seeded_reset_makes_sampling_reproducible() {
        let mut env = env(Persona::FormFiller);
        env.reset(ResetOptions::seeded(42)).await.unwrap();
        let first: Vec<_> = (0..10).map(|_| env.sample_action()).collect();
        env.reset(ResetOptions::seeded(42)).await.unwrap();
        let second: Vec<_> = (0..10).map(|_| env.sample_action()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_discards_episode() {
        let mut env = env(Persona::FormFiller);
        env.reset(ResetOptions::default()).await.unwrap();
        env.close().await;
        env.close().await;
        assert!(env.is_closed());
        assert!(env.episode().is_none());
        assert_eq!(env.adapter().close_count(), 2);
    }
}
