use snafu::Snafu;

use crate::sonarqube_client;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Error occurs while creating SonarQube client, error: {source}"))]
    InitializeSonarqubeClient { source: sonarqube_client::Error },

    #[snafu(display("Failed to register exporter metrics, error: {source}"))]
    RegisterMetrics { source: prometheus::Error },

    #[snafu(display("{source}"))]
    Metrics { source: exporter_metrics::Error },
}

impl From<exporter_metrics::Error> for Error {
    fn from(source: exporter_metrics::Error) -> Self { Self::Metrics { source } }
}
