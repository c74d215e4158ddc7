use snafu::Snafu;

use crate::sonarqube_client;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure aborting a refresh cycle.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Finding all metrics: {source}"))]
    FetchMetricDefinitions { source: sonarqube_client::Error },

    #[snafu(display("Finding all projects: {source}"))]
    FetchProjects { source: sonarqube_client::Error },

    #[snafu(display("Finding measures for component `{project_id}`: {source}"))]
    FetchMeasures { project_id: String, source: sonarqube_client::Error },
}

impl Error {
    #[must_use]
    pub const fn client_error(&self) -> &sonarqube_client::Error {
        match self {
            Self::FetchMetricDefinitions { source }
            | Self::FetchProjects { source }
            | Self::FetchMeasures { source, .. } => source,
        }
    }
}
