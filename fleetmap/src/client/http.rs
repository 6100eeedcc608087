//! HTTP client abstraction for testability.

use std::time::Duration;

use super::ClientError;

/// Trait for HTTP client operations.
///
/// Lets the tile client run against a mock in tests.
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body, failing on non-success statuses.
    fn get(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

/// Blocking reqwest-backed client.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Client with a 30 second timeout.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ClientError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ClientError::Http(format!("Failed to read response: {}", e)))
    }
}
