use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AnswerBackend, BackendError, BackendResult};

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    message: String,
}

/// HTTP client for the retrieval-augmented answer service
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ask_url(&self) -> String {
        format!("{}/ask", self.base_url)
    }

    /// Hit the service root, which reports a short status message
    pub async fn health(&self) -> BackendResult<String> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = parse_body(status, &bytes)?;

        let health: HealthResponse = serde_json::from_value(body)
            .map_err(|e| BackendError::InvalidBody(e.to_string()))?;
        Ok(health.message)
    }
}

#[async_trait]
impl AnswerBackend for InferenceClient {
    async fn ask(&self, query: &str) -> BackendResult<Value> {
        let url = self.ask_url();
        debug!(%url, "posting query");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { query })
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        parse_body(status, &bytes)
    }
}

/// Reject non-2xx statuses and bodies that are not JSON
fn parse_body(status: StatusCode, bytes: &[u8]) -> BackendResult<Value> {
    if !status.is_success() {
        return Err(BackendError::Status(status.as_u16()));
    }
    serde_json::from_slice(bytes).map_err(|e| BackendError::InvalidBody(e.to_string()))
}
