use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntCounterVec, Opts, Registry};
use tracing::error;

lazy_static! {
    static ref ENV_STEPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("webflow_env_steps_total", "Environment steps taken"),
        &["action"]
    )
    .unwrap();
    static ref ENV_STEP_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "webflow_env_step_failures_total",
            "Adapter failures absorbed at the step boundary"
        ),
        &["action", "kind"]
    )
    .unwrap();
    static ref ENV_EPISODES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("webflow_env_episodes_total", "Finished episodes by outcome"),
        &["outcome"]
    )
    .unwrap();
    static ref ENV_RESETS_TOTAL: IntCounter =
        IntCounter::new("webflow_env_resets_total", "Environment resets").unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register env metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, ENV_STEPS_TOTAL.clone());
    register(registry, ENV_STEP_FAILURES_TOTAL.clone());
    register(registry, ENV_EPISODES_TOTAL.clone());
    register(registry, ENV_RESETS_TOTAL.clone());
}

pub(crate) fn record_reset() {
    ENV_RESETS_TOTAL.inc();
}

pub(crate) fn record_step(action: &str) {
    ENV_STEPS_TOTAL.with_label_values(&[action]).inc();
}

pub(crate) fn record_step_failure(action: &str, kind: &str) {
    ENV_STEP_FAILURES_TOTAL
        .with_label_values(&[action, kind])
        .inc();
}

pub(crate) fn record_episode(outcome: &str) {
    ENV_EPISODES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn step_failures(action: &str, kind: &str) -> u64 {
    ENV_STEP_FAILURES_TOTAL
        .with_label_values(&[action, kind])
        .get()
}

pub fn episodes(outcome: &str) -> u64 {
    ENV_EPISODES_TOTAL.with_label_values(&[outcome]).get()
}
