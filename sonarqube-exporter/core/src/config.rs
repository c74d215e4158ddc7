use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    net::SocketAddr,
    time::Duration,
};

use regex::Regex;
use url::Url;

use crate::model::{EnumeratedValues, MetricType};

#[derive(Clone, Debug)]
pub struct Config {
    pub metrics: MetricsConfig,

    pub sonarqube: SonarqubeConfig,
}

#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub listen_address: SocketAddr,

    pub telemetry_path: String,
}

#[derive(Clone)]
pub struct SonarqubeConfig {
    pub url: Url,

    pub username: String,

    pub password: String,

    pub project_filter: Regex,

    pub request_timeout: Duration,

    pub accepted_metric_types: Vec<MetricType>,

    pub enumerated_metrics: BTreeMap<String, EnumeratedValues>,
}

impl Debug for SonarqubeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarqubeConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("project_filter", &self.project_filter.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("accepted_metric_types", &self.accepted_metric_types)
            .field("enumerated_metrics", &self.enumerated_metrics)
            .finish()
    }
}
