use crate::prelude::*;
use appforge_core::extract::{ExtractText, FieldText};
use appforge_core::jobs::JobKind;
use appforge_core::GenerationError;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::ollama;
use std::future::Future;

const CHAT_PREAMBLE: &str = "\
You are a friendly assistant helping a user build a React application.
Answer conversationally and keep it short. Never output code.";

const CODE_PREAMBLE: &str = "\
You are a React and Tailwind CSS code generator.
You output ONLY a single JSON document.

Rules:
- The document has a `files` object mapping absolute file paths to `{ \"code\": \"...\" }`.
- Output raw JSON only. No markdown fences. No explanations. No commentary.
- Every file you output replaces the file at that path completely.";

/// A text generation backend.
pub trait Model: Send + Sync {
    type Response: ExtractText + Send;

    fn send_message(
        &self,
        kind: JobKind,
        prompt: &str,
    ) -> impl Future<Output = Result<Self::Response, GenerationError>> + Send;
}

/// Local models served by Ollama.
pub struct OllamaModel {
    client: ollama::Client,
    chat_model: String,
    code_model: String,
}

impl OllamaModel {
    pub fn new(ollama_url: &str, chat_model: &str, code_model: &str) -> Result<Self> {
        use rig::client::Nothing;

        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(ollama_url)
            .build()
            .map_err(|e| eyre!("Failed to create Ollama client: {}", e))?;

        Ok(Self {
            client,
            chat_model: chat_model.to_string(),
            code_model: code_model.to_string(),
        })
    }
}

impl Model for OllamaModel {
    type Response = FieldText;

    async fn send_message(&self, kind: JobKind, prompt: &str) -> Result<FieldText, GenerationError> {
        let (model, preamble) = match kind {
            JobKind::Chat => (&self.chat_model, CHAT_PREAMBLE),
            JobKind::Code => (&self.code_model, CODE_PREAMBLE),
        };

        let agent = self.client.agent(model).preamble(preamble).build();
        let text = agent
            .prompt(prompt.to_string())
            .await
            .map_err(|e| GenerationError::NetworkFailure(format!("Model generation failed: {e}")))?;

        Ok(FieldText::new(text))
    }
}
