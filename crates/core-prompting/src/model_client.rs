//! HTTP-backed `Model` collaborator: a thin client wrapping a
//! `reqwest::Client`, grounded on the struct-wraps-a-client shape of
//! `orc2626-tech-sBot9999`'s `FundingRateMonitor`, with the timeout-wrapped
//! deadline carried over from `tirds-agents::claude_cli::invoke_claude`
//! (subprocess swapped for an HTTP POST per the Model collaborator's
//! contract in spec §6).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::Model;
use crate::error::PromptingError;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    name: String,
    temperature: f64,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(endpoint: impl Into<String>, name: impl Into<String>, temperature: f64, timeout_seconds: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            name: name.into(),
            temperature,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

#[async_trait]
impl Model for HttpModelClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, PromptingError> {
        let request = CompletionRequest {
            prompt,
            model: &self.name,
            temperature: self.temperature,
        };

        let send = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout);

        let response = tokio::time::timeout(self.timeout, send.send())
            .await
            .map_err(|_| PromptingError::Timeout(self.timeout.as_secs()))??;

        let body: CompletionResponse = response.json().await?;
        Ok(body.text)
    }
}
