use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::config::{error, Error};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "MetricsConfig::default_host")]
    pub host: IpAddr,

    #[serde(default = "MetricsConfig::default_port")]
    pub port: u16,

    /// Path of the exposition endpoint, the landing page is served on `/`
    #[serde(default = "MetricsConfig::default_telemetry_path")]
    pub telemetry_path: String,
}

impl MetricsConfig {
    #[inline]
    pub const fn socket_address(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    #[inline]
    pub const fn default_host() -> IpAddr { sonarqube_exporter_core::DEFAULT_METRICS_HOST }

    #[inline]
    pub const fn default_port() -> u16 { sonarqube_exporter_core::DEFAULT_METRICS_PORT }

    #[inline]
    pub fn default_telemetry_path() -> String {
        sonarqube_exporter_core::DEFAULT_TELEMETRY_PATH.to_string()
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            telemetry_path: Self::default_telemetry_path(),
        }
    }
}

impl TryFrom<MetricsConfig> for sonarqube_exporter_core::config::MetricsConfig {
    type Error = Error;

    fn try_from(source: MetricsConfig) -> Result<Self, Self::Error> {
        let listen_address = source.socket_address();
        let MetricsConfig { telemetry_path, .. } = source;

        ensure!(
            telemetry_path.starts_with('/') && telemetry_path != "/",
            error::InvalidTelemetryPathSnafu { path: telemetry_path }
        );

        Ok(Self { listen_address, telemetry_path })
    }
}
