//! Sanity content lake access: connection settings, endpoint construction and
//! the error type shared by every remote call.

pub mod client;
pub mod image;

pub use self::client::{MutationResponse, Patch, SanityClient};
pub use self::image::ImageUrls;

use regex::Regex;
use reqwest::StatusCode;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2025-02-07";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to document store failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document store returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("invalid document store response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid document store configuration: {0}")]
    InvalidConfig(String),
    #[error("request cancelled")]
    Cancelled,
}

/// Connection settings for one project/dataset pair.
#[derive(Clone)]
pub struct Config {
    project_id: String,
    dataset: String,
    api_version: String,
    token: SecretString,
    api_host: Option<String>,
    timeout: Duration,
}

impl Config {
    /// # Errors
    /// Returns `StoreError::InvalidConfig` if the project id or dataset is malformed.
    pub fn new(project_id: &str, dataset: &str, token: SecretString) -> Result<Self, StoreError> {
        if !valid_resource_name(project_id) {
            return Err(StoreError::InvalidConfig(format!(
                "invalid project id: {project_id}"
            )));
        }
        if !valid_resource_name(dataset) {
            return Err(StoreError::InvalidConfig(format!(
                "invalid dataset: {dataset}"
            )));
        }

        Ok(Self {
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token,
            api_host: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    /// # Errors
    /// Returns `StoreError::InvalidConfig` unless the version is `YYYY-MM-DD`, `1` or `X`.
    pub fn with_api_version(mut self, version: &str) -> Result<Self, StoreError> {
        let version = version.trim().trim_start_matches('v');
        if !valid_api_version(version) {
            return Err(StoreError::InvalidConfig(format!(
                "invalid API version: {version}"
            )));
        }
        self.api_version = version.to_string();
        Ok(self)
    }

    /// Override `https://<project>.api.sanity.io`, mostly for proxies and tests.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidConfig` if the host is not an http(s) URL.
    pub fn with_api_host(mut self, host: &str) -> Result<Self, StoreError> {
        let parsed = Url::parse(host)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid API host {host}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidConfig(format!(
                "unsupported API host scheme: {}",
                parsed.scheme()
            )));
        }
        self.api_host = Some(host.trim_end_matches('/').to_string());
        Ok(self)
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn api_base(&self) -> String {
        self.api_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.api.sanity.io", self.project_id))
    }

    /// `GET` endpoint for a GROQ query against the dataset.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidConfig` if the resulting URL does not parse.
    #[instrument(skip(self))]
    pub fn query_url(&self, query: &str) -> Result<Url, StoreError> {
        let mut url = self.endpoint_url("query")?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }

    /// `POST` endpoint for mutations against the dataset.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidConfig` if the resulting URL does not parse.
    pub fn mutate_url(&self) -> Result<Url, StoreError> {
        let mut url = self.endpoint_url("mutate")?;
        url.query_pairs_mut().append_pair("returnIds", "true");
        Ok(url)
    }

    fn endpoint_url(&self, action: &str) -> Result<Url, StoreError> {
        let endpoint = format!(
            "{}/v{}/data/{action}/{}",
            self.api_base(),
            self.api_version,
            self.dataset
        );

        debug!("endpoint URL: {}", endpoint);

        Url::parse(&endpoint)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid endpoint {endpoint}: {e}")))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("token", &"***")
            .field("api_host", &self.api_host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Project ids and dataset names are lowercase alphanumerics, `_` and `-`.
#[must_use]
pub fn valid_resource_name(name: &str) -> bool {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").is_ok_and(|re| re.is_match(name))
}

#[must_use]
pub fn valid_api_version(version: &str) -> bool {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|1|X)$").is_ok_and(|re| re.is_match(version))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("abc123", "production", SecretString::from("sk-test".to_string())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.api_version(), DEFAULT_API_VERSION);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
    }

    #[test]
    fn query_url_is_encoded() {
        let url = config().query_url(r#"*[_type == "order"]"#).unwrap();
        assert_eq!(url.host_str(), Some("abc123.api.sanity.io"));
        assert_eq!(url.path(), "/v2025-02-07/data/query/production");
        let query = url
            .query_pairs()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.into_owned());
        assert_eq!(query.as_deref(), Some(r#"*[_type == "order"]"#));
    }

    #[test]
    fn mutate_url_uses_custom_host() {
        let url = config()
            .with_api_host("http://127.0.0.1:9999/")
            .unwrap()
            .with_api_version("v2021-06-07")
            .unwrap()
            .mutate_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9999/v2021-06-07/data/mutate/production?returnIds=true"
        );
    }

    #[test]
    fn rejects_bad_names() {
        let token = || SecretString::from("t".to_string());
        assert!(Config::new("", "production", token()).is_err());
        assert!(Config::new("abc", "Prod Data", token()).is_err());
        assert!(Config::new("abc/../x", "production", token()).is_err());
    }

    #[test]
    fn api_versions() {
        assert!(valid_api_version("2025-02-07"));
        assert!(valid_api_version("1"));
        assert!(valid_api_version("X"));
        assert!(!valid_api_version("latest"));
        assert!(config().with_api_version("2025-2-7").is_err());
    }

    #[test]
    fn rejects_non_http_host() {
        assert!(config().with_api_host("ftp://example.com").is_err());
        assert!(config().with_api_host("not a url").is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", config());
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("sk-test"));
    }
}
