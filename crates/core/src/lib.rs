//! Core library for appforge
//!
//! This crate implements the **Functional Core** of the appforge application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The appforge project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`appforge_core`** (this crate): Pure transformation functions with zero I/O
//! - **`appforge`**: Persistence, HTTP, the generation orchestrator and the CLI (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Deterministic**: Behavior is predictable and reproducible
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Module Organization
//!
//! - [`ledger`]: Token cost estimation, admission check and debit arithmetic
//! - [`files`]: File trees, the base project skeleton and overlay merging
//! - [`transcript`]: Messages, workspaces, users and the shared view snapshot
//! - [`prompt`]: Prompt assembly from a transcript plus a prompt suffix
//! - [`extract`]: Text extraction from model responses and code document parsing
//! - [`envelope`]: Wire envelopes for the `/ai-chat` and `/gen-ai-code` endpoints
//! - [`jobs`]: Generation jobs, responder state machine and trigger deduplication
//! - [`commit`]: Planning the post-success state of a chat or code generation
//! - [`error`]: The generation error taxonomy
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use appforge_core::files::{default_skeleton, merge, FileContent, FileTree};
//!
//! let mut overlay = FileTree::new();
//! overlay.insert("/App.js".to_string(), FileContent::new("export default () => null;"));
//!
//! let tree = merge(&default_skeleton(), &overlay);
//!
//! assert!(tree.contains_key("/App.js"));
//! assert!(tree.contains_key("/public/index.html"));
//! ```

pub mod commit;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod files;
pub mod jobs;
pub mod ledger;
pub mod prompt;
pub mod transcript;

pub use error::{ErrorKind, GenerationError};
