//! HTTP runner: POSTs the dispatch request to a remote pipeline service.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::DispatchError;
use crate::pipeline::types::{DispatchRequest, PipelineResult, PipelineRunner};

/// Maximum response body kept in a failure description.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Runs the analysis pipeline behind an HTTP endpoint.
///
/// The request body is the JSON [`DispatchRequest`]; a 2xx response must
/// carry a JSON [`PipelineResult`].
pub struct HttpRunner {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl HttpRunner {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }
}

#[async_trait]
impl PipelineRunner for HttpRunner {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| DispatchError::Failed {
            runner: self.name().to_string(),
            reason: format!("Request to {} failed: {}", self.url, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(DispatchError::Failed {
                runner: self.name().to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        response
            .json::<PipelineResult>()
            .await
            .map_err(|e| DispatchError::InvalidResponse {
                runner: self.name().to_string(),
                reason: e.to_string(),
            })
    }
}
