//! Blocking HTTP transport shared by the provider clients.
//!
//! Only transport failures leave this module as errors: timeouts, connection
//! failures, non-success statuses and truncated bodies. Interpreting the body
//! is left to the caller so malformed payloads never count against a circuit
//! breaker.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use reserve_core::{ConfigError, ProviderError};
use thiserror::Error;

use super::runtime::BlockingRuntime;

/// Default user agent for upstream requests.
pub const DEFAULT_USER_AGENT: &str = "reserve-eta/0.1";

/// Error type for provider client construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A cache or breaker setting is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The configured base URL cannot be parsed.
    #[error("invalid base URL {url}: {source}")]
    BaseUrl {
        /// Rejected URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug)]
pub(crate) struct HttpTransport {
    client: Client,
    runtime: BlockingRuntime,
    timeout: Duration,
}

impl HttpTransport {
    pub(crate) fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = BlockingRuntime::new().map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            runtime,
            timeout,
        })
    }

    /// POST a form-encoded body and return the response text.
    pub(crate) fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<String, ProviderError> {
        let request = self.client.post(url).form(form);
        self.runtime.block_on(self.send(request, url))
    }

    /// GET `url` and return the response text.
    pub(crate) fn get(&self, url: &str) -> Result<String, ProviderError> {
        let request = self.client.get(url);
        self.runtime.block_on(self.send(request, url))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<String, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return ProviderError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        ProviderError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

/// Join a base URL and an endpoint name with exactly one slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
