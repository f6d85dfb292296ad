use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::error::{PartchainError, Result};
use crate::query::ResultFormat;

/// Query service the lookups run against (Driven Port)
///
/// Implementations own connection handling, credentials and any retry
/// policy. Lookups borrow a service for the duration of one call.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submit a tuple query and return the raw response body
    async fn tuples(&self, query: &str, format: ResultFormat) -> Result<String>;
}

/// Basic-auth credentials for the repository
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// HTTP client for a Fedora `risearch` endpoint
pub struct RiSearchClient {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

impl RiSearchClient {
    /// Create a client for the repository at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Repository root, e.g. `http://localhost:8080/fedora`
    /// * `credentials` - Optional basic-auth credentials
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: &Url,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PartchainError::Transport(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: risearch_endpoint(base_url)?,
            credentials,
        })
    }

    /// The resolved `risearch` URL
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn risearch_endpoint(base_url: &Url) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("risearch").map_err(|e| {
        PartchainError::Config(format!("Invalid repository URL {}: {}", base_url, e))
    })
}

#[async_trait]
impl QueryService for RiSearchClient {
    async fn tuples(&self, query: &str, format: ResultFormat) -> Result<String> {
        log::debug!("risearch ({}): {}", format.as_param(), query);
        let start = std::time::Instant::now();

        let mut request = self.client.post(self.endpoint.clone()).form(&[
            ("type", "tuples"),
            ("lang", "itql"),
            ("format", format.as_param()),
            ("query", query),
        ]);
        if let Some(ref creds) = self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PartchainError::Transport(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(PartchainError::Transport(format!(
                "risearch error {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PartchainError::Transport(format!("Failed to read response: {}", e)))?;

        log::debug!("risearch call took {:?}", start.elapsed());
        Ok(body)
    }
}
