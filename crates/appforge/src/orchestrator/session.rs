use appforge_core::files::{default_skeleton, merge, FileTree};
use appforge_core::jobs::GenerationJob;
use appforge_core::transcript::{Message, User, Workspace, WorkspaceSnapshot};

/// Cached copy of the active workspace.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub workspace_id: String,
    pub epoch: u64,
    pub user: User,
    pub messages: Vec<Message>,
    /// Rendered tree: skeleton with every stored overlay on top.
    pub files: FileTree,
}

impl Session {
    pub fn open(workspace: Workspace, user: User, epoch: u64) -> Self {
        Self {
            files: merge(&default_skeleton(), &workspace.file_data),
            workspace_id: workspace.id,
            epoch,
            user,
            messages: workspace.messages,
        }
    }

    /// Whether the result of `job` belongs to this session.
    pub fn accepts(&self, job: &GenerationJob) -> bool {
        job.matches(&self.workspace_id, self.epoch, self.messages.len())
    }

    pub fn snapshot(&self, chat_busy: bool, code_busy: bool) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            workspace_id: Some(self.workspace_id.clone()),
            messages: self.messages.clone(),
            files: self.files.clone(),
            token_balance: self.user.token_balance,
            chat_busy,
            code_busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appforge_core::files::FileContent;
    use appforge_core::jobs::{JobKind, TriggerTracker};

    fn workspace() -> Workspace {
        let mut file_data = FileTree::new();
        file_data.insert("/App.js".to_string(), FileContent::new("app"));
        Workspace {
            id: "w1".to_string(),
            user_id: "u1".to_string(),
            messages: vec![Message::user("hello")],
            file_data,
            started: Default::default(),
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.c".to_string(),
            token_balance: 42,
        }
    }

    #[test]
    fn test_open_renders_skeleton_under_stored_files() {
        let session = Session::open(workspace(), user(), 1);

        assert_eq!(session.files["/App.js"].code, "app");
        for path in default_skeleton().keys() {
            assert!(session.files.contains_key(path));
        }
    }

    #[test]
    fn test_accepts_only_matching_context() {
        let session = Session::open(workspace(), user(), 3);
        let mut tracker = TriggerTracker::new();

        let current = tracker.claim("w1", 3, 0, JobKind::Chat).unwrap();
        let old_epoch = tracker.claim("w1", 2, 0, JobKind::Code).unwrap();
        let other = tracker.claim("w2", 3, 0, JobKind::Chat).unwrap();

        assert!(session.accepts(&current));
        assert!(!session.accepts(&old_epoch));
        assert!(!session.accepts(&other));
    }

    #[test]
    fn test_snapshot() {
        let snapshot = Session::open(workspace(), user(), 1).snapshot(true, false);

        assert_eq!(snapshot.workspace_id.as_deref(), Some("w1"));
        assert_eq!(snapshot.token_balance, 42);
        assert_eq!(snapshot.messages.len(), 1);
        assert!(snapshot.chat_busy);
        assert!(!snapshot.code_busy);
    }
}
