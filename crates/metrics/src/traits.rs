use async_trait::async_trait;

/// Source of the metric families served on the telemetry path.
///
/// `gather` is called once per scrape, so implementations may refresh their
/// values before returning them.
#[async_trait]
pub trait Metrics: Clone + Send + Sync {
    async fn gather(&self) -> Vec<prometheus::proto::MetricFamily>;
}
