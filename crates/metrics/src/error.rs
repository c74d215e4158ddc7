use std::net::SocketAddr;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display(
        "Error occurs while binding metrics server on {listen_address}, error: {source}"
    ))]
    BindTcpServer { listen_address: SocketAddr, source: std::io::Error },

    #[snafu(display("Error occurs while serving metrics server, error: {source}"))]
    ServeHttpServer { source: std::io::Error },

    #[snafu(display("Fail to encode metric families, error: {source}"))]
    EncodeMetrics { source: prometheus::Error },

    #[snafu(display("Invalid telemetry path `{path}`, it must start with `/` and must not be `/`"))]
    InvalidTelemetryPath { path: String },
}
