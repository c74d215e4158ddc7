use reqwest::StatusCode;
use snafu::{Location, Snafu};
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to build HTTP client: {source}, location: {location}"))]
    InitializeClient {
        #[snafu(implicit)]
        location: Location,
        source: reqwest::Error,
    },

    #[snafu(display("SonarQube URL `{url}` can not be used as a base URL, location: {location}"))]
    InvalidBaseUrl {
        #[snafu(implicit)]
        location: Location,
        url: String,
    },

    #[snafu(display("Failed to send request to `{url}`: {source}, location: {location}"))]
    SendRequest {
        #[snafu(implicit)]
        location: Location,
        url: Url,
        source: reqwest::Error,
    },

    #[snafu(display("Request to `{url}` failed with status {status}, location: {location}"))]
    UnexpectedStatus {
        #[snafu(implicit)]
        location: Location,
        url: Url,
        status: StatusCode,
    },

    #[snafu(display("Failed to read response of `{url}`: {source}, location: {location}"))]
    ReadResponse {
        #[snafu(implicit)]
        location: Location,
        url: Url,
        source: reqwest::Error,
    },

    #[snafu(display("Failed to decode response of `{url}`: {source}, location: {location}"))]
    DecodeResponse {
        #[snafu(implicit)]
        location: Location,
        url: Url,
        source: serde_json::Error,
    },
}

impl Error {
    /// The upstream could not be reached, timed out or answered with a
    /// non-success status.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::SendRequest { .. } | Self::UnexpectedStatus { .. } | Self::ReadResponse { .. }
        )
    }

    /// The upstream answered with a document of unexpected shape.
    #[must_use]
    pub const fn is_decode(&self) -> bool { matches!(self, Self::DecodeResponse { .. }) }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::SendRequest { source, .. } | Self::ReadResponse { source, .. } => {
                source.is_timeout()
            }
            _ => false,
        }
    }
}
