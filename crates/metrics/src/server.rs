use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing, Router,
};
use prometheus::{proto::MetricFamily, Encoder, TextEncoder};
use snafu::{ensure, ResultExt};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{error, Error, Metrics};

/// Serve `metrics` on `telemetry_path` until `shutdown_signal` resolves.
///
/// # Errors
///
/// Returns an error if the telemetry path is invalid, the listener cannot be
/// bound or the server stops abnormally.
pub async fn start_metrics_server<M, ShutdownSignal>(
    listen_address: SocketAddr,
    telemetry_path: &str,
    metrics: M,
    shutdown_signal: ShutdownSignal,
) -> Result<(), Error>
where
    M: Metrics + 'static,
    ShutdownSignal: Future<Output = ()> + Send + 'static,
{
    let router = metrics_router(telemetry_path, metrics)?;

    let listener = TcpListener::bind(&listen_address)
        .await
        .context(error::BindTcpServerSnafu { listen_address })?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context(error::ServeHttpServerSnafu)
}

/// Build the router serving the landing page on `/` and the text exposition
/// on `telemetry_path`.
///
/// # Errors
///
/// Returns an error if `telemetry_path` does not start with `/` or is `/`.
pub fn metrics_router<M>(telemetry_path: &str, metrics: M) -> Result<Router, Error>
where
    M: Metrics + 'static,
{
    ensure!(
        telemetry_path.starts_with('/') && telemetry_path != "/",
        error::InvalidTelemetryPathSnafu { path: telemetry_path }
    );

    let state = ServerState { metrics, telemetry_path: Arc::from(telemetry_path) };

    Ok(Router::new()
        .route("/", routing::get(landing_page::<M>))
        .route(telemetry_path, routing::get(serve_metrics::<M>))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Encode metric families in the Prometheus text exposition format.
///
/// # Errors
///
/// Returns an error if a family cannot be encoded.
pub fn encode(families: &[MetricFamily]) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer).context(error::EncodeMetricsSnafu)?;
    Ok(buffer)
}

#[derive(Clone)]
struct ServerState<M> {
    metrics: M,
    telemetry_path: Arc<str>,
}

// SAFETY: `axum` handler must be async
#[allow(clippy::unused_async)]
async fn landing_page<M>(State(state): State<ServerState<M>>) -> Html<String> {
    Html(format!(
        "<html>
<head><title>SonarQube Exporter</title></head>
<body>
<h1>SonarQube Exporter</h1>
<p><a href='{}'>Metrics</a></p>
</body>
</html>",
        state.telemetry_path
    ))
}

async fn serve_metrics<M>(State(state): State<ServerState<M>>) -> Response
where
    M: Metrics,
{
    let families = state.metrics.gather().await;

    match encode(&families) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            tracing::error!("{err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use prometheus::{proto::MetricFamily, IntCounter, Registry};
    use tower::ServiceExt;

    use crate::{metrics_router, Error, Metrics};

    /// Counts how many times it has been gathered.
    #[derive(Clone)]
    struct CountingMetrics {
        registry: Registry,
        gathered: IntCounter,
    }

    impl CountingMetrics {
        fn new() -> Self {
            let registry = Registry::new();
            let gathered = IntCounter::new("test_gathered_total", "Times gathered").unwrap();
            registry.register(Box::new(gathered.clone())).unwrap();
            Self { registry, gathered }
        }
    }

    #[async_trait]
    impl Metrics for CountingMetrics {
        async fn gather(&self) -> Vec<MetricFamily> {
            self.gathered.inc();
            self.registry.gather()
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_landing_page_links_to_telemetry_path() {
        let router = metrics_router("/custom-metrics", CountingMetrics::new()).unwrap();

        let (status, _, body) = get(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href='/custom-metrics'>Metrics</a>"), "{body}");
    }

    #[tokio::test]
    async fn test_telemetry_path_gathers_on_every_request() {
        let metrics = CountingMetrics::new();
        let router = metrics_router("/metrics", metrics.clone()).unwrap();

        let (status, content_type, body) = get(router.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
        assert!(body.contains("test_gathered_total 1"), "{body}");

        let (_, _, body) = get(router, "/metrics").await;
        assert!(body.contains("test_gathered_total 2"), "{body}");
        assert_eq!(metrics.gathered.get(), 2);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let router = metrics_router("/metrics", CountingMetrics::new()).unwrap();

        let (status, _, _) = get(router, "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_telemetry_path() {
        for path in ["", "/", "metrics"] {
            let result = metrics_router(path, CountingMetrics::new());
            assert!(
                matches!(result, Err(Error::InvalidTelemetryPath { .. })),
                "path `{path}` should be rejected"
            );
        }
    }
}
