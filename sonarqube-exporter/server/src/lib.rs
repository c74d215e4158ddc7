mod error;
pub mod exporter;
pub mod metrics;
pub mod normalizer;
pub mod sonarqube_client;

use std::net::SocketAddr;

use futures::{future::BoxFuture, FutureExt};
use sigfinn::{ExitStatus, LifecycleManager, Shutdown};
use snafu::ResultExt;
use sonarqube_exporter_core::{
    config::{Config, MetricsConfig, SonarqubeConfig},
    ServerInfo, METRICS_NAMESPACE,
};

pub use self::{
    error::{Error, Result},
    exporter::{Exporter, RefreshSummary},
    metrics::ExporterMetrics,
    normalizer::Normalizer,
    sonarqube_client::SonarqubeClient,
};

/// # Errors
/// Returns errors when server fails to start
pub async fn serve_with_shutdown(config: Config, server_info: ServerInfo) -> Result<()> {
    let Config { metrics: MetricsConfig { listen_address, telemetry_path }, sonarqube } = config;

    tracing::info!(
        "Exporting SonarQube `{}` ({} {})",
        server_info.sonarqube_url,
        server_info.version,
        server_info.commit_hash
    );

    let exporter = initialize_exporter(&sonarqube)?;

    let lifecycle_manager = LifecycleManager::<Error>::new();

    let _handle = lifecycle_manager.spawn(
        "Metrics server",
        create_metrics_server_future(listen_address, telemetry_path, exporter),
    );

    if let Ok(Err(err)) = lifecycle_manager.serve().await {
        tracing::error!("{err}");
        Err(err)
    } else {
        Ok(())
    }
}

/// Build an exporter from the SonarQube configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the collectors
/// cannot be registered
#[tracing::instrument(
    skip(sonarqube),
    fields(
        url = %sonarqube.url,
        username = %sonarqube.username,
        project_filter = %sonarqube.project_filter
    )
)]
pub fn initialize_exporter(sonarqube: &SonarqubeConfig) -> Result<Exporter> {
    tracing::info!("Initializing SonarQube client");

    let SonarqubeConfig {
        url,
        username,
        password,
        project_filter,
        request_timeout,
        accepted_metric_types,
        enumerated_metrics,
    } = sonarqube;

    let client = SonarqubeClient::new(url.clone(), username, password, *request_timeout)
        .context(error::InitializeSonarqubeClientSnafu)?;

    let normalizer =
        Normalizer::new(accepted_metric_types.iter().cloned(), enumerated_metrics.clone());

    let metrics = ExporterMetrics::new(METRICS_NAMESPACE).context(error::RegisterMetricsSnafu)?;

    Ok(Exporter::new(client, normalizer, project_filter.clone(), metrics))
}

fn create_metrics_server_future(
    listen_address: SocketAddr,
    telemetry_path: String,
    exporter: Exporter,
) -> impl FnOnce(Shutdown) -> BoxFuture<'static, ExitStatus<Error>> {
    move |signal| {
        async move {
            tracing::info!("Listen metrics endpoint on {listen_address}{telemetry_path}");
            let result = exporter_metrics::start_metrics_server(
                listen_address,
                &telemetry_path,
                exporter,
                signal,
            )
            .await;
            match result {
                Ok(()) => {
                    tracing::info!("Metrics server is shut down gracefully");
                    ExitStatus::Success
                }
                Err(err) => ExitStatus::FatalError(Error::from(err)),
            }
        }
        .boxed()
    }
}
