use super::{summarize, WorkspaceStore};
use crate::error::StoreError;
use appforge_core::files::FileTree;
use appforge_core::jobs::StartedJobs;
use appforge_core::transcript::{Message, User, Workspace, WorkspaceSummary};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    workspaces: HashMap<String, StoredWorkspace>,
    sequence: u64,
}

#[derive(Debug, Clone)]
struct StoredWorkspace {
    workspace: Workspace,
    created_at: String,
    sequence: u64,
}

/// In-process store with the same semantics as the SQLite backend.
///
/// Backs ephemeral sessions. Writes can be switched off to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Backend`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("store is not accepting writes".to_string()))
        } else {
            Ok(())
        }
    }
}

impl WorkspaceStore for MemoryStore {
    async fn load(&self, workspace_id: &str) -> Result<Workspace, StoreError> {
        let state = self.state.lock().await;
        state
            .workspaces
            .get(workspace_id)
            .map(|stored| stored.workspace.clone())
            .ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))
    }

    async fn save_messages(&self, workspace_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let stored = state
            .workspaces
            .get_mut(workspace_id)
            .ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))?;
        stored.workspace.messages = messages.to_vec();
        Ok(())
    }

    async fn save_files(&self, workspace_id: &str, overlay: &FileTree) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let stored = state
            .workspaces
            .get_mut(workspace_id)
            .ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))?;
        stored
            .workspace
            .file_data
            .extend(overlay.iter().map(|(path, content)| (path.clone(), content.clone())));
        Ok(())
    }

    async fn save_started(&self, workspace_id: &str, started: StartedJobs) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let stored = state
            .workspaces
            .get_mut(workspace_id)
            .ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))?;
        stored.workspace.started = started;
        Ok(())
    }

    async fn save_token_balance(&self, user_id: &str, balance: i64) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.token_balance = balance;
        Ok(())
    }

    async fn get_user(&self, email: &str) -> Result<User, StoreError> {
        let state = self.state.lock().await;
        state
            .users
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {email}")))
    }

    async fn create_user(&self, email: &str, token_balance: i64) -> Result<User, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if state.users.values().any(|user| user.email == email) {
            return Err(StoreError::Conflict(format!("user {email}")));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            token_balance,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn create_workspace(&self, user_id: &str, messages: &[Message]) -> Result<Workspace, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if !state.users.contains_key(user_id) {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }

        state.sequence += 1;
        let workspace = Workspace {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            messages: messages.to_vec(),
            file_data: FileTree::new(),
            started: StartedJobs::default(),
        };
        let stored = StoredWorkspace {
            workspace: workspace.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            sequence: state.sequence,
        };
        state.workspaces.insert(workspace.id.clone(), stored);
        Ok(workspace)
    }

    async fn list_workspaces(&self, user_id: &str) -> Result<Vec<WorkspaceSummary>, StoreError> {
        let state = self.state.lock().await;
        let mut owned: Vec<&StoredWorkspace> = state
            .workspaces
            .values()
            .filter(|stored| stored.workspace.user_id == user_id)
            .collect();
        owned.sort_by_key(|stored| stored.sequence);

        Ok(owned
            .into_iter()
            .map(|stored| {
                summarize(
                    stored.workspace.id.clone(),
                    stored.created_at.clone(),
                    &stored.workspace.messages,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appforge_core::files::FileContent;

    fn overlay(entries: &[(&str, &str)]) -> FileTree {
        entries
            .iter()
            .map(|(path, code)| (path.to_string(), FileContent::new(*code)))
            .collect()
    }

    #[tokio::test]
    async fn test_load_unknown_workspace() {
        let store = MemoryStore::new();
        let err = store.load("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_files_upserts_overlays() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();
        let workspace = store.create_workspace(&user.id, &[]).await.unwrap();

        store
            .save_files(&workspace.id, &overlay(&[("/App.js", "v1"), ("/Button.js", "b")]))
            .await
            .unwrap();
        store
            .save_files(&workspace.id, &overlay(&[("/App.js", "v2")]))
            .await
            .unwrap();

        let loaded = store.load(&workspace.id).await.unwrap();
        assert_eq!(loaded.file_data["/App.js"], FileContent::new("v2"));
        assert_eq!(loaded.file_data["/Button.js"], FileContent::new("b"));
        assert_eq!(loaded.file_data.len(), 2);
    }

    #[tokio::test]
    async fn test_save_messages_replaces_transcript() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();
        let workspace = store
            .create_workspace(&user.id, &[Message::user("first")])
            .await
            .unwrap();

        let messages = vec![Message::user("first"), Message::ai("reply")];
        store.save_messages(&workspace.id, &messages).await.unwrap();

        assert_eq!(store.load(&workspace.id).await.unwrap().messages, messages);
    }

    #[tokio::test]
    async fn test_save_started_is_loaded_back() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();
        let workspace = store.create_workspace(&user.id, &[]).await.unwrap();

        let started = StartedJobs {
            chat: Some(0),
            code: Some(0),
        };
        store.save_started(&workspace.id, started).await.unwrap();

        assert_eq!(store.load(&workspace.id).await.unwrap().started, started);
    }

    #[tokio::test]
    async fn test_token_balance_last_write_wins() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();

        store.save_token_balance(&user.id, 40).await.unwrap();
        store.save_token_balance(&user.id, -3).await.unwrap();

        assert_eq!(store.get_user("a@b.c").await.unwrap().token_balance, -3);
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let store = MemoryStore::new();
        store.create_user("a@b.c", 50).await.unwrap();
        let err = store.create_user("a@b.c", 10).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();
        store.fail_writes(true);

        let err = store.save_token_balance(&user.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.get_user("a@b.c").await.unwrap().token_balance, 50);
    }

    #[tokio::test]
    async fn test_list_workspaces_in_creation_order() {
        let store = MemoryStore::new();
        let user = store.create_user("a@b.c", 50).await.unwrap();
        let other = store.create_user("x@y.z", 50).await.unwrap();

        let first = store
            .create_workspace(&user.id, &[Message::user("a todo app")])
            .await
            .unwrap();
        let second = store.create_workspace(&user.id, &[]).await.unwrap();
        store.create_workspace(&other.id, &[]).await.unwrap();

        let listed = store.list_workspaces(&user.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[0].first_prompt.as_deref(), Some("a todo app"));
        assert_eq!(listed[1].id, second.id);
        assert_eq!(listed[1].message_count, 0);
    }
}
