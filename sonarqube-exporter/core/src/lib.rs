pub mod config;
pub mod model;

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const PROJECT_NAME: &str = "sonarqube-exporter";

pub const PROGRAM_NAME: &str = "sonarqube-exporter";
pub const CONFIG_NAME: &str = "sonarqube-exporter.yaml";

/// Prefix of every exposed metric name.
pub const METRICS_NAMESPACE: &str = "sonarqube";

pub const DEFAULT_METRICS_PORT: u16 = 9344;
pub const DEFAULT_METRICS_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

pub const DEFAULT_SONARQUBE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PROJECT_FILTER: &str = ".*";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

pub static PROJECT_CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.config_dir().to_path_buf())
});

#[must_use]
pub fn fallback_project_config_directories() -> Vec<PathBuf> {
    let Some(user_dirs) = directories::UserDirs::new() else {
        return Vec::new();
    };
    vec![
        [user_dirs.home_dir(), (Path::new(".config")), (Path::new(PROJECT_NAME))].iter().collect(),
        [user_dirs.home_dir(), (Path::new(&format!(".{PROJECT_NAME}")))].iter().collect(),
        [&Path::new("/"), &Path::new("etc"), &Path::new(PROJECT_NAME)].iter().collect(),
    ]
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub branch: String,
    pub commit_hash: String,
    pub sonarqube_url: String,
    pub start_time: DateTime<Utc>,
}
