mod error;
mod metrics;
mod sonarqube;

use std::path::{Path, PathBuf};

use exporter_cli_common::config::LogConfig;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{error::Error, metrics::MetricsConfig, sonarqube::SonarqubeConfig};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub sonarqube: SonarqubeConfig,
}

impl Config {
    #[inline]
    pub fn default_path() -> PathBuf {
        [
            sonarqube_exporter_core::PROJECT_CONFIG_DIR.to_path_buf(),
            PathBuf::from(sonarqube_exporter_core::CONFIG_NAME),
        ]
        .into_iter()
        .collect()
    }

    /// Candidate configuration files, in order of preference.
    pub fn search_paths() -> Vec<PathBuf> {
        std::iter::once(Self::default_path())
            .chain(
                sonarqube_exporter_core::fallback_project_config_directories()
                    .into_iter()
                    .map(|dir| dir.join(sonarqube_exporter_core::CONFIG_NAME)),
            )
            .collect()
    }

    /// Load the first existing file of [`Config::search_paths`], or the
    /// built-in defaults if there is none.
    pub fn search() -> Result<Self, Error> {
        Self::search_paths()
            .into_iter()
            .find(|path| path.is_file())
            .map_or_else(|| Ok(Self::default()), Self::load)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = std::fs::read_to_string(&path)
            .context(error::OpenConfigSnafu { filename: path.as_ref().to_path_buf() })?;

        Self::from_yaml(&data)
            .context(error::ParseConfigSnafu { filename: path.as_ref().to_path_buf() })?
            .resolve_paths()
    }

    fn from_yaml(data: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document means defaults everywhere
        if data.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(data)
        }
    }

    fn resolve_paths(mut self) -> Result<Self, Error> {
        self.log.file_path = match self.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        Ok(self)
    }
}

/// Validate the configuration and turn it into what the server runs with.
#[inline]
pub fn load_server_config(
    Config { metrics, sonarqube, .. }: Config,
) -> Result<sonarqube_exporter_core::config::Config, Error> {
    Ok(sonarqube_exporter_core::config::Config {
        metrics: metrics.try_into()?,
        sonarqube: sonarqube.try_into()?,
    })
}
