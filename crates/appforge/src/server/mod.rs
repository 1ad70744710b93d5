use crate::prelude::{eprintln, *};
use appforge_core::envelope::{prompt_from_body, ChatReply, CodeReply, ErrorReply};
use appforge_core::extract::{parse_code_document, require_text};
use appforge_core::jobs::JobKind;
use appforge_core::GenerationError;
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

mod model;

pub use model::{Model, OllamaModel};

#[derive(Debug, clap::Parser)]
#[command(name = "serve")]
#[command(about = "Serve the chat and code generation endpoints")]
pub struct App {
    /// Host to bind to
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[clap(long, short, default_value = "3000")]
    pub port: u16,

    /// Ollama base URL
    #[clap(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Model answering chat messages
    #[clap(long, env = "APPFORGE_CHAT_MODEL", default_value = "llama3.1")]
    pub chat_model: String,

    /// Model generating code overlays
    #[clap(long, env = "APPFORGE_CODE_MODEL", default_value = "qwen2.5-coder")]
    pub code_model: String,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let model = OllamaModel::new(&app.ollama_url, &app.chat_model, &app.code_model)?;
    let addr = format!("{}:{}", app.host, app.port);

    if global.verbose {
        eprintln!("Ollama URL: {}", app.ollama_url);
        eprintln!("Chat model: {}", app.chat_model);
        eprintln!("Code model: {}", app.code_model);
        eprintln!("Listening on http://{}", addr);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Generation endpoints listening on http://{addr}");

    axum::serve(listener, router(Arc::new(model)))
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

/// Routes for both generation endpoints, backed by `model`.
pub fn router<M: Model + 'static>(model: Arc<M>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(JobKind::Chat.endpoint(), post(chat_handler::<M>))
        .route(JobKind::Code.endpoint(), post(code_handler::<M>))
        .layer(cors)
        .with_state(model)
}

async fn chat_handler<M: Model>(State(model): State<Arc<M>>, body: Bytes) -> (StatusCode, Json<Value>) {
    respond(JobKind::Chat, chat_reply(model.as_ref(), &body).await)
}

async fn code_handler<M: Model>(State(model): State<Arc<M>>, body: Bytes) -> (StatusCode, Json<Value>) {
    respond(JobKind::Code, code_reply(model.as_ref(), &body).await)
}

/// Answer a chat request body with the model's reply text.
pub async fn chat_reply<M: Model>(model: &M, body: &[u8]) -> Result<ChatReply, GenerationError> {
    let prompt = prompt_from_body(body)?;
    let response = model.send_message(JobKind::Chat, &prompt).await?;

    Ok(ChatReply {
        result: require_text(&response)?,
    })
}

/// Answer a code request body with the overlay the model produced.
pub async fn code_reply<M: Model>(model: &M, body: &[u8]) -> Result<CodeReply, GenerationError> {
    let prompt = prompt_from_body(body)?;
    let response = model.send_message(JobKind::Code, &prompt).await?;
    let text = require_text(&response)?;

    Ok(CodeReply {
        files: parse_code_document(&text)?,
    })
}

fn respond<T: Serialize>(kind: JobKind, result: Result<T, GenerationError>) -> (StatusCode, Json<Value>) {
    let (status, body) = match result {
        Ok(reply) => (StatusCode::OK, serde_json::to_value(reply)),
        Err(err) => {
            log::warn!("{kind} request failed: {err}");
            let (status, reply) = error_reply(&err);
            (status, serde_json::to_value(reply))
        }
    };

    (status, Json(body.unwrap_or(Value::Null)))
}

fn error_reply(err: &GenerationError) -> (StatusCode, ErrorReply) {
    let (status, reply) = match err {
        GenerationError::MissingInput(_) => (StatusCode::BAD_REQUEST, ErrorReply::new(err.detail())),
        GenerationError::UpstreamEmpty => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorReply::new("Model returned an empty response").with_details(Value::Null),
        ),
        GenerationError::ParseError(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorReply::new("Model did not return valid JSON")
                .with_details(Value::String(detail.clone())),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorReply::new(err.detail())),
    };

    (status, reply.with_kind(err.kind()))
}
