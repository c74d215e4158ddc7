use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not open config from {}, error: {source}", filename.display()))]
    OpenConfig { filename: PathBuf, source: std::io::Error },

    #[snafu(display("Count not parse config from {}, error: {source}", filename.display()))]
    ParseConfig { filename: PathBuf, source: serde_yaml::Error },

    #[snafu(display("Could not resolve file path {}, error: {source}", file_path.display()))]
    ResolveFilePath { file_path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not parse SonarQube URL `{url}`, error: {source}"))]
    ParseSonarqubeUrl { url: String, source: url::ParseError },

    #[snafu(display("SonarQube URL `{url}` must be an absolute http(s) URL"))]
    InvalidSonarqubeUrl { url: String },

    #[snafu(display("Invalid project filter `{filter}`, error: {source}"))]
    InvalidProjectFilter { filter: String, source: regex::Error },

    #[snafu(display("Invalid telemetry path `{path}`, it must start with `/` and must not be `/`"))]
    InvalidTelemetryPath { path: String },
}
