//! Workspace persistence
//!
//! A thin contract over the persistence service. The orchestrator only ever
//! talks to the store through this trait; the backends decide how the data
//! is laid out.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use appforge_core::files::FileTree;
use appforge_core::jobs::StartedJobs;
use appforge_core::transcript::{Message, User, Workspace, WorkspaceSummary};
use std::future::Future;

pub trait WorkspaceStore: Send + Sync {
    /// Fetch a workspace. Unknown ids fail with [`StoreError::NotFound`].
    fn load(
        &self,
        workspace_id: &str,
    ) -> impl Future<Output = Result<Workspace, StoreError>> + Send;

    /// Replace the whole transcript with `messages`.
    fn save_messages(
        &self,
        workspace_id: &str,
        messages: &[Message],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply a generated overlay to the stored files.
    ///
    /// Only the overlay is sent; each path in it is upserted so the stored tree
    /// stays equal to every overlay applied so far, in order.
    fn save_files(
        &self,
        workspace_id: &str,
        overlay: &FileTree,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record which job kinds have started, so a later session does not start them again.
    fn save_started(
        &self,
        workspace_id: &str,
        started: StartedJobs,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite a user's balance. Last write wins.
    fn save_token_balance(
        &self,
        user_id: &str,
        balance: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_user(&self, email: &str) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn create_user(
        &self,
        email: &str,
        token_balance: i64,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn create_workspace(
        &self,
        user_id: &str,
        messages: &[Message],
    ) -> impl Future<Output = Result<Workspace, StoreError>> + Send;

    fn list_workspaces(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<WorkspaceSummary>, StoreError>> + Send;
}

/// Build a summary row from a stored transcript.
pub(crate) fn summarize(id: String, created_at: String, messages: &[Message]) -> WorkspaceSummary {
    WorkspaceSummary {
        id,
        created_at,
        message_count: messages.len(),
        first_prompt: appforge_core::transcript::first_prompt(messages).map(str::to_string),
    }
}
