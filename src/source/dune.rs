use crate::error::{DigestError, Result};
use crate::source::DataSource;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const DUNE_API_URL: &str = "https://api.dune.com";

/// Client for the Dune query results API
pub struct DuneClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl DuneClient {
    /// Create a new Dune API client
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            api_key,
            client,
            base_url: DUNE_API_URL.to_string(),
        })
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn results_url(&self, query_id: u64) -> String {
        format!("{}/api/v1/query/{}/results/csv", self.base_url, query_id)
    }
}

#[async_trait]
impl DataSource for DuneClient {
    async fn fetch(&self, query_id: u64, limit: u32) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.results_url(query_id))
            .header("X-Dune-API-Key", &self.api_key)
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DigestError::data_source(format!(
                "query {} rejected with status {}, check dune_api_key",
                query_id, status
            )));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(query_id, %status, error = %error_text, "Failed to fetch query results");
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            tracing::warn!(query_id, "Query returned no rows");
            return Ok(None);
        }

        tracing::debug!(query_id, bytes = body.len(), "Fetched query results");
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DuneClient::new("dune-key".to_string()).unwrap();
        assert_eq!(
            client.results_url(3_456_789),
            "https://api.dune.com/api/v1/query/3456789/results/csv"
        );
    }

    #[test]
    fn test_client_base_url() {
        let client = DuneClient::new("dune-key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000/".to_string());
        assert_eq!(client.results_url(1), "http://127.0.0.1:9000/api/v1/query/1/results/csv");
    }
}
