pub mod error;

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};
use snafu::{ensure, ResultExt};
use sonarqube_exporter_core::model::{MetricDefinition, ProjectDescriptor, RawMeasure};
use url::Url;

pub use self::error::{Error, Result};
use self::error::{
    DecodeResponseSnafu, InitializeClientSnafu, InvalidBaseUrlSnafu, ReadResponseSnafu,
    SendRequestSnafu, UnexpectedStatusSnafu,
};

/// Page size of the first request of a paginated search. Later requests use
/// the page size reported by the server.
const INITIAL_PAGE_SIZE: u64 = 100;

/// Component qualifier of projects.
const PROJECT_QUALIFIER: &str = "TRK";

/// Client of the SonarQube web API
#[derive(Clone)]
pub struct SonarqubeClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl SonarqubeClient {
    /// Create a new SonarQube client
    ///
    /// Requests carry HTTP basic credentials only when both `username` and
    /// `password` are non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` can not have paths appended to it or if
    /// the HTTP client cannot be built
    pub fn new(
        base_url: Url,
        username: &str,
        password: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        ensure!(!base_url.cannot_be_a_base(), InvalidBaseUrlSnafu { url: base_url.to_string() });

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context(InitializeClientSnafu)?;

        let credentials = (!username.is_empty() && !password.is_empty()).then(|| Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });

        Ok(Self { client, base_url, credentials })
    }

    /// Fetch every metric definition of the instance, following pagination
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be fetched or decoded
    pub async fn fetch_all_metric_definitions(&self) -> Result<Vec<MetricDefinition>> {
        let mut page = 1;
        let mut page_size = INITIAL_PAGE_SIZE;
        let mut definitions = Vec::new();

        loop {
            let mut url = self.endpoint(&["api", "metrics", "search"])?;
            url.query_pairs_mut()
                .append_pair("ps", &page_size.to_string())
                .append_pair("p", &page.to_string());

            let response: MetricsSearchResponse = self.request_json(url).await?;

            // The server may clamp the requested page size
            page_size = response.page_size;
            let received = response.metrics.len();
            definitions.extend(response.metrics);

            if is_last_page(page, page_size, response.total, received) {
                return Ok(definitions);
            }

            page += 1;
        }
    }

    /// Fetch every project of the instance, following pagination
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be fetched or decoded
    pub async fn fetch_all_projects(&self) -> Result<Vec<ProjectDescriptor>> {
        let mut page_index = 1;
        let mut page_size = INITIAL_PAGE_SIZE;
        let mut projects = Vec::new();

        loop {
            let mut url = self.endpoint(&["api", "components", "search"])?;
            url.query_pairs_mut()
                .append_pair("ps", &page_size.to_string())
                .append_pair("p", &page_index.to_string())
                .append_pair("qualifiers", PROJECT_QUALIFIER);

            let ComponentsSearchResponse { paging, components } = self.request_json(url).await?;

            page_size = paging.page_size;
            let received = components.len();
            projects.extend(components.into_iter().filter(|component| {
                if component.id.is_empty() {
                    tracing::warn!("Ignore project `{}` without identifier", component.key);
                    false
                } else {
                    true
                }
            }));

            if is_last_page(page_index, page_size, paging.total, received) {
                return Ok(projects);
            }

            // Follow the server, it may skip or repeat pages
            page_index = paging.page_index + 1;
        }
    }

    /// Fetch the measures of `metric_keys` for a single project
    ///
    /// The request is sent even if `metric_keys` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the measures cannot be fetched or decoded
    pub async fn fetch_measures(
        &self,
        project_id: &str,
        metric_keys: &[&str],
    ) -> Result<Vec<RawMeasure>> {
        let mut url = self.endpoint(&["api", "measures", "component"])?;
        url.query_pairs_mut()
            .append_pair("componentId", project_id)
            .append_pair("metricKeys", &metric_keys.join(","));

        let response: ComponentMeasuresResponse = self.request_json(url).await?;

        Ok(response.component.measures)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| InvalidBaseUrlSnafu { url: self.base_url.to_string() }.build())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        tracing::debug!("Sending request to `{url}`");

        let mut request = self.client.get(url.clone());
        if let Some(Credentials { username, password }) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.context(SendRequestSnafu { url: url.clone() })?;

        let status = response.status();
        ensure!(status.is_success(), UnexpectedStatusSnafu { url: url.clone(), status });

        let body = response.bytes().await.context(ReadResponseSnafu { url: url.clone() })?;

        serde_json::from_slice(&body).context(DecodeResponseSnafu { url })
    }
}

/// Whether the page just received is the last one.
///
/// The reported total is trusted as-is. A page size of zero or an empty page
/// also ends the iteration, otherwise an inconsistent server would keep the
/// client looping.
const fn is_last_page(page: u64, page_size: u64, total: u64, received: usize) -> bool {
    page_size == 0 || received == 0 || page.saturating_mul(page_size) >= total
}

#[derive(Debug, Deserialize)]
struct MetricsSearchResponse {
    #[serde(default)]
    metrics: Vec<MetricDefinition>,

    total: u64,

    #[serde(rename = "ps")]
    page_size: u64,
}

#[derive(Debug, Deserialize)]
struct ComponentsSearchResponse {
    paging: Paging,

    #[serde(default)]
    components: Vec<ProjectDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    page_index: u64,
    page_size: u64,
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ComponentMeasuresResponse {
    component: ComponentMeasures,
}

#[derive(Debug, Deserialize)]
struct ComponentMeasures {
    #[serde(default)]
    measures: Vec<RawMeasure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SonarqubeClient {
        SonarqubeClient::new(Url::parse(base_url).unwrap(), "", "", Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn test_is_last_page() {
        assert!(!is_last_page(1, 100, 250, 100));
        assert!(!is_last_page(2, 100, 250, 100));
        assert!(is_last_page(3, 100, 250, 50));
        assert!(is_last_page(1, 100, 100, 100));
        assert!(is_last_page(1, 100, 0, 0));
        assert!(is_last_page(4, 0, 250, 10));
        assert!(is_last_page(2, 100, 250, 0));
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        for base_url in ["http://localhost:9000", "http://localhost:9000/"] {
            let url = client(base_url).endpoint(&["api", "metrics", "search"]).unwrap();
            assert_eq!(url.as_str(), "http://localhost:9000/api/metrics/search");
        }

        for base_url in ["https://example.com/sonar", "https://example.com/sonar/"] {
            let url = client(base_url).endpoint(&["api", "measures", "component"]).unwrap();
            assert_eq!(url.as_str(), "https://example.com/sonar/api/measures/component");
        }
    }

    #[test]
    fn test_reject_url_which_is_not_a_base() {
        let result = SonarqubeClient::new(
            Url::parse("mailto:admin@example.com").unwrap(),
            "",
            "",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(Error::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let url = Url::parse("http://localhost:9000").unwrap();
        let timeout = Duration::from_secs(1);

        assert!(SonarqubeClient::new(url.clone(), "admin", "secret", timeout)
            .unwrap()
            .credentials
            .is_some());
        assert!(SonarqubeClient::new(url.clone(), "admin", "", timeout)
            .unwrap()
            .credentials
            .is_none());
        assert!(SonarqubeClient::new(url, "", "secret", timeout).unwrap().credentials.is_none());
    }

    #[test]
    fn test_decode_components_search_response() {
        let response: ComponentsSearchResponse = serde_json::from_str(
            r#"{
                "paging": {"pageIndex": 2, "pageSize": 50, "total": 120},
                "components": [{"id": "AV-1", "key": "my:project", "qualifier": "TRK"}]
            }"#,
        )
        .unwrap();
        assert_eq!(response.paging.page_index, 2);
        assert_eq!(response.paging.page_size, 50);
        assert_eq!(response.paging.total, 120);
        assert_eq!(
            response.components,
            vec![ProjectDescriptor { id: "AV-1".to_string(), key: "my:project".to_string() }]
        );
    }
}
