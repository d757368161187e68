use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, histogram_opts, HistogramVec, IntCounterVec, Opts, Registry,
};
use tracing::error;

lazy_static! {
    static ref ADAPTER_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("webflow_adapter_ops_total", "Total adapter operations issued"),
        &["op"]
    )
    .unwrap();
    static ref ADAPTER_OP_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "webflow_adapter_op_failures_total",
            "Total adapter operation failures"
        ),
        &["op", "kind"]
    )
    .unwrap();
    static ref ADAPTER_OP_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "webflow_adapter_op_duration_seconds",
            "Adapter operation latency",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
        ),
        &["op"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register adapter metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, ADAPTER_OPS_TOTAL.clone());
    register(registry, ADAPTER_OP_FAILURES_TOTAL.clone());
    register(registry, ADAPTER_OP_DURATION.clone());
}

pub fn record_op(op: &str) {
    ADAPTER_OPS_TOTAL.with_label_values(&[op]).inc();
}

pub fn record_op_success(op: &str, duration: Duration) {
    ADAPTER_OP_DURATION
        .with_label_values(&[op])
        .observe(duration.as_secs_f64());
}

pub fn record_op_failure(op: &str, kind: &str) {
    ADAPTER_OP_FAILURES_TOTAL
        .with_label_values(&[op, kind])
        .inc();
}
