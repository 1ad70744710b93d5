use crate::prelude::*;
use appforge_core::envelope::{parse_error_envelope, PromptRequest};
use appforge_core::jobs::JobKind;
use appforge_core::GenerationError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::future::Future;

/// Transport to the generation endpoints.
///
/// Returns the raw body of a successful response; interpreting it is up to the
/// responder that asked.
pub trait Upstream: Send + Sync {
    fn complete(
        &self,
        kind: JobKind,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Upstream reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Upstream for HttpUpstream {
    async fn complete(&self, kind: JobKind, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}{}", self.base_url, kind.endpoint());
        log::debug!("POST {url} ({} prompt bytes)", prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&PromptRequest::new(prompt))
            .send()
            .await
            .map_err(|e| GenerationError::NetworkFailure(format!("Failed to reach {url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::NetworkFailure(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let err = parse_error_envelope(status.as_u16(), &body);
            log::warn!("{kind} request failed with {status}: {err}");
            return Err(err);
        }

        Ok(body)
    }
}
