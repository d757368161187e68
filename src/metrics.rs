use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use browser_adapter::metrics as adapter_metrics;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};
use webflow_env::metrics as env_metrics;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        adapter_metrics::register_metrics(registry);
        env_metrics::register_metrics(registry);
    });
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Serve `/metrics` on `port`. Port 0 disables the server.
pub fn spawn_metrics_server(port: u16) -> Option<JoinHandle<()>> {
    if port == 0 {
        return None;
    }

    register_metrics();
    let registry = Arc::new(global_registry().clone());
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(%addr, "metrics server listening");
    Some(tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(?err, "metrics server exited with error");
                }
            }
            Err(err) => error!(?err, "failed to bind metrics listener"),
        }
    }))
}

/// Render every registered collector in the Prometheus text format.
pub fn render(registry: &Registry) -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|err| err.to_string())?;
    String::from_utf8(buffer).map_err(|err| err.to_string())
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    let content_type = HeaderValue::from_static(prometheus::TEXT_FORMAT);
    match render(&registry) {
        Ok(body) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(err) => {
            error!(%err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_port_spawns_nothing() {
        assert!(spawn_metrics_server(0).is_none());
    }

    #[test]
    fn registration_is_idempotent() {
        register_metrics();
        register_metrics();
        let text = render(global_registry()).unwrap();
        // Labelled families only appear once a child exists.
        assert!(text.contains("webflow_env_resets_total"));
    }
}
