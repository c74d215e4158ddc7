use std::{collections::BTreeMap, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use snafu::{ensure, ResultExt};
use sonarqube_exporter_core::model::{default_enumerated_metrics, EnumeratedValues, MetricType};
use url::Url;

use crate::config::{error, Error};

#[serde_as]
#[derive(Clone, Deserialize, Serialize)]
pub struct SonarqubeConfig {
    /// Base URL of the instance, may carry a path prefix
    #[serde(default = "SonarqubeConfig::default_url")]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Regular expression matched against project keys
    #[serde(default = "SonarqubeConfig::default_project_filter")]
    pub project_filter: String,

    #[serde(rename = "request_timeout_ms", default = "SonarqubeConfig::default_request_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,

    #[serde(default = "MetricType::default_accepted")]
    pub accepted_metric_types: Vec<MetricType>,

    /// Replaces the built-in tables as a whole when given
    #[serde(default = "default_enumerated_metrics")]
    pub enumerated_metrics: BTreeMap<String, EnumeratedValues>,
}

impl SonarqubeConfig {
    #[inline]
    pub fn default_url() -> String { sonarqube_exporter_core::DEFAULT_SONARQUBE_URL.to_string() }

    #[inline]
    pub fn default_project_filter() -> String {
        sonarqube_exporter_core::DEFAULT_PROJECT_FILTER.to_string()
    }

    #[inline]
    pub const fn default_request_timeout() -> Duration {
        Duration::from_millis(sonarqube_exporter_core::DEFAULT_REQUEST_TIMEOUT_MS)
    }
}

impl Default for SonarqubeConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            username: String::new(),
            password: String::new(),
            project_filter: Self::default_project_filter(),
            request_timeout: Self::default_request_timeout(),
            accepted_metric_types: MetricType::default_accepted(),
            enumerated_metrics: default_enumerated_metrics(),
        }
    }
}

impl std::fmt::Debug for SonarqubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarqubeConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("project_filter", &self.project_filter)
            .field("request_timeout", &self.request_timeout)
            .field("accepted_metric_types", &self.accepted_metric_types)
            .field("enumerated_metrics", &self.enumerated_metrics)
            .finish()
    }
}

impl TryFrom<SonarqubeConfig> for sonarqube_exporter_core::config::SonarqubeConfig {
    type Error = Error;

    fn try_from(source: SonarqubeConfig) -> Result<Self, Self::Error> {
        let SonarqubeConfig {
            url,
            username,
            password,
            project_filter,
            request_timeout,
            accepted_metric_types,
            enumerated_metrics,
        } = source;

        let url = Url::parse(&url).context(error::ParseSonarqubeUrlSnafu { url: url.clone() })?;
        ensure!(
            matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base(),
            error::InvalidSonarqubeUrlSnafu { url: url.to_string() }
        );

        let project_filter = Regex::new(&project_filter)
            .context(error::InvalidProjectFilterSnafu { filter: project_filter.clone() })?;

        Ok(Self {
            url,
            username,
            password,
            project_filter,
            request_timeout,
            accepted_metric_types,
            enumerated_metrics,
        })
    }
}
