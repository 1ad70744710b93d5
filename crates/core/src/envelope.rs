//! Wire envelopes of the generation endpoints
//!
//! `POST /ai-chat` and `POST /gen-ai-code` both take `{prompt}`. Chat answers
//! `{result}`, code generation answers `{files}`, and failures answer
//! `{error, details?, kind?}` with a non-2xx status. The same types are used by
//! the server that produces these bodies and the client that consumes them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, GenerationError};
use crate::extract::files_from_value;
use crate::files::FileTree;

/// Request body of both endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }
}

/// Successful `/ai-chat` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub result: String,
}

/// Successful `/gen-ai-code` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReply {
    pub files: FileTree,
}

/// Failure body of both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Which failure the server hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            kind: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The error this reply reports, as seen by the client.
    ///
    /// Failures of the model output keep their kind. Everything else is a
    /// network failure carrying the status and the server message.
    pub fn into_error(self, status: u16) -> GenerationError {
        match self.kind {
            Some(ErrorKind::MissingInput) => GenerationError::MissingInput(self.error),
            Some(ErrorKind::UpstreamEmpty) => GenerationError::UpstreamEmpty,
            Some(ErrorKind::ParseError) => GenerationError::ParseError(self.error),
            Some(ErrorKind::SchemaError) => GenerationError::SchemaError(self.error),
            _ => GenerationError::NetworkFailure(format!("{status}: {}", self.error)),
        }
    }
}

/// Message returned when the request has no usable prompt.
pub const MISSING_PROMPT: &str = "Missing 'prompt' in request body";

/// Pull a non-empty prompt out of a raw request body.
pub fn prompt_from_body(body: &[u8]) -> Result<String, GenerationError> {
    let request: PromptRequest = serde_json::from_slice(body)
        .map_err(|_| GenerationError::MissingInput(MISSING_PROMPT.to_string()))?;

    match request.prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
        _ => Err(GenerationError::MissingInput(MISSING_PROMPT.to_string())),
    }
}

fn parse_body(body: &str) -> Result<Value, GenerationError> {
    serde_json::from_str(body)
        .map_err(|e| GenerationError::ParseError(format!("Invalid JSON from AI API: {e}")))
}

/// Extract the reply text of a successful `/ai-chat` body.
pub fn parse_chat_envelope(body: &str) -> Result<String, GenerationError> {
    let value = parse_body(body)?;

    match value.get("result").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(GenerationError::UpstreamEmpty),
    }
}

/// Extract the overlay of a successful `/gen-ai-code` body.
///
/// Accepts both `{files}` and `{result: {files}}`.
pub fn parse_code_envelope(body: &str) -> Result<FileTree, GenerationError> {
    let value = parse_body(body)?;

    if value.get("files").is_none() {
        if let Some(nested) = value.get("result").filter(|r| r.is_object()) {
            return files_from_value(nested);
        }
    }

    files_from_value(&value)
}

/// Turn a non-2xx response into the error it reports.
pub fn parse_error_envelope(status: u16, body: &str) -> GenerationError {
    match serde_json::from_str::<ErrorReply>(body) {
        Ok(reply) => reply.into_error(status),
        Err(_) => GenerationError::NetworkFailure(format!("{status}: {body}")),
    }
}
