pub mod error;

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::proto::MetricFamily;
use regex::Regex;
use snafu::ResultExt;
use tokio::sync::Mutex;

pub use self::error::{Error, Result};
use crate::{
    metrics::ExporterMetrics,
    normalizer::{MeasureKind, Normalizer},
    sonarqube_client::SonarqubeClient,
};

/// What a successful refresh cycle did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RefreshSummary {
    /// Metrics whose measures were requested
    pub requested_metrics: usize,

    /// Projects in the upstream catalog
    pub projects: usize,

    /// Projects matching the project filter
    pub scraped_projects: usize,

    pub recorded_measures: usize,

    pub discarded_measures: usize,
}

/// Refreshes the exposed measures from SonarQube each time it is gathered.
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<Inner>,
}

struct Inner {
    client: SonarqubeClient,

    normalizer: Normalizer,

    project_filter: Regex,

    metrics: ExporterMetrics,

    // Held for a whole cycle and while gathering, so that a scrape never
    // observes a half-written snapshot
    cycle: Mutex<()>,
}

impl Exporter {
    #[must_use]
    pub fn new(
        client: SonarqubeClient,
        normalizer: Normalizer,
        project_filter: Regex,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                normalizer,
                project_filter,
                metrics,
                cycle: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &ExporterMetrics { &self.inner.metrics }

    /// Run one refresh cycle.
    ///
    /// The scrape counter is incremented whatever the outcome. On failure the
    /// exporter is marked down and values recorded by earlier cycles are kept.
    ///
    /// # Errors
    ///
    /// Returns the error which aborted the cycle.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let _cycle = self.inner.cycle.lock().await;
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<RefreshSummary> {
        let metrics = &self.inner.metrics;
        metrics.inc_scrapes();

        let result = self.scrape().await;
        match result {
            Ok(ref summary) => {
                tracing::debug!(?summary, "Refresh cycle succeeded");
                metrics.set_up(true);
            }
            Err(ref error) => {
                tracing::error!(%error);
                metrics.set_up(false);
            }
        }
        result
    }

    #[tracing::instrument(skip(self))]
    async fn scrape(&self) -> Result<RefreshSummary> {
        let Inner { client, normalizer, project_filter, metrics, .. } = self.inner.as_ref();
        let mut summary = RefreshSummary::default();

        let definitions =
            client.fetch_all_metric_definitions().await.context(error::FetchMetricDefinitionsSnafu)?;
        tracing::debug!("Found {} metrics", definitions.len());

        let catalog = normalizer.build_catalog(definitions);
        let metric_keys = catalog.keys();
        summary.requested_metrics = metric_keys.len();

        let projects = client.fetch_all_projects().await.context(error::FetchProjectsSnafu)?;
        tracing::debug!("Found {} projects", projects.len());
        summary.projects = projects.len();

        for project in projects.iter().filter(|project| project_filter.is_match(&project.key)) {
            tracing::debug!("Requesting measures for `{}`", project.key);

            let measures = client
                .fetch_measures(&project.id, &metric_keys)
                .await
                .context(error::FetchMeasuresSnafu { project_id: project.id.clone() })?;
            summary.scraped_projects += 1;

            for measure in measures {
                // Only reached if the server answers with a metric that was not requested
                let unlisted;
                let kind = if let Some(kind) = catalog.kind_of(&measure.metric) {
                    kind
                } else {
                    unlisted = normalizer.classify(&measure.metric);
                    &unlisted
                };

                match kind.normalize(&measure.value) {
                    Ok(value) => {
                        metrics.set_measure(&project.key, &measure.metric, value);
                        summary.recorded_measures += 1;
                    }
                    Err(error) => {
                        if matches!(kind, MeasureKind::Numeric) {
                            tracing::debug!(
                                "Value of measure `{}` of `{}` could not be parsed: {error}",
                                measure.metric,
                                project.key
                            );
                        }
                        summary.discarded_measures += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl exporter_metrics::Metrics for Exporter {
    async fn gather(&self) -> Vec<MetricFamily> {
        let _cycle = self.inner.cycle.lock().await;

        // Failures are reported through the `up` gauge
        let _unused = self.run_cycle().await;

        self.inner.metrics.gather()
    }
}
