use serde::{Deserialize, Serialize};

use crate::files::FileTree;
use crate::jobs::StartedJobs;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

/// One transcript entry. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// Persisted workspace record as returned by the store.
///
/// `file_data` holds only what generation produced; the base skeleton is merged
/// underneath at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub messages: Vec<Message>,
    #[serde(rename = "fileData")]
    pub file_data: FileTree,
    /// Job kinds already started for the transcript, by message index.
    #[serde(default)]
    pub started: StartedJobs,
}

/// Listing entry for a user's workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub created_at: String,
    pub message_count: usize,
    pub first_prompt: Option<String>,
}

/// Budget holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(rename = "tokenBalance")]
    pub token_balance: i64,
}

/// Immutable picture of the active workspace every view renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceSnapshot {
    pub workspace_id: Option<String>,
    pub messages: Vec<Message>,
    pub files: FileTree,
    pub token_balance: i64,
    pub chat_busy: bool,
    pub code_busy: bool,
}

/// Index of the last message when it is an unanswered user message.
///
/// This is the only transcript shape that makes a generation cycle eligible.
pub fn pending_user_index(messages: &[Message]) -> Option<usize> {
    match messages.last() {
        Some(last) if last.role == Role::User => Some(messages.len() - 1),
        _ => None,
    }
}

/// Content of the first user message, used as a workspace title.
pub fn first_prompt(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}
