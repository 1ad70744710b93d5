use super::{summarize, WorkspaceStore};
use crate::error::StoreError;
use appforge_core::files::{FileContent, FileTree};
use appforge_core::jobs::StartedJobs;
use appforge_core::transcript::{Message, User, Workspace, WorkspaceSummary};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        token_balance INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS workspaces (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        messages TEXT NOT NULL,
        chat_started INTEGER,
        code_started INTEGER,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS workspace_files (
        workspace_id TEXT NOT NULL REFERENCES workspaces(id),
        path TEXT NOT NULL,
        code TEXT NOT NULL,
        PRIMARY KEY (workspace_id, path)
    );
";

/// Workspace store backed by a single SQLite file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        log::debug!("Opening workspace database at {}", path.display());
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("database connection lock poisoned".to_string()))
    }
}

fn read_files(conn: &Connection, workspace_id: &str) -> Result<FileTree, StoreError> {
    let mut stmt =
        conn.prepare("SELECT path, code FROM workspace_files WHERE workspace_id = ?1")?;
    let rows = stmt.query_map(params![workspace_id], |row| {
        let path: String = row.get(0)?;
        let code: String = row.get(1)?;
        Ok((path, FileContent { code }))
    })?;

    Ok(rows.collect::<Result<FileTree, _>>()?)
}

fn ensure_workspace(conn: &Connection, workspace_id: &str) -> Result<(), StoreError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT id FROM workspaces WHERE id = ?1",
            params![workspace_id],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(format!("workspace {workspace_id}"))),
    }
}

impl WorkspaceStore for SqliteStore {
    async fn load(&self, workspace_id: &str) -> Result<Workspace, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, String, StartedJobs)> = conn
            .query_row(
                "SELECT user_id, messages, chat_started, code_started FROM workspaces WHERE id = ?1",
                params![workspace_id],
                |row| {
                    let started = StartedJobs {
                        chat: row.get(2)?,
                        code: row.get(3)?,
                    };
                    Ok((row.get(0)?, row.get(1)?, started))
                },
            )
            .optional()?;

        let (user_id, messages, started) =
            row.ok_or_else(|| StoreError::NotFound(format!("workspace {workspace_id}")))?;

        Ok(Workspace {
            id: workspace_id.to_string(),
            user_id,
            messages: serde_json::from_str(&messages)?,
            file_data: read_files(&conn, workspace_id)?,
            started,
        })
    }

    async fn save_messages(&self, workspace_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(messages)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE workspaces SET messages = ?1 WHERE id = ?2",
            params![encoded, workspace_id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("workspace {workspace_id}")));
        }
        Ok(())
    }

    async fn save_files(&self, workspace_id: &str, overlay: &FileTree) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        ensure_workspace(&conn, workspace_id)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO workspace_files (workspace_id, path, code) VALUES (?1, ?2, ?3)
                 ON CONFLICT (workspace_id, path) DO UPDATE SET code = excluded.code",
            )?;
            for (path, content) in overlay {
                stmt.execute(params![workspace_id, path, content.code])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn save_started(&self, workspace_id: &str, started: StartedJobs) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE workspaces SET chat_started = ?1, code_started = ?2 WHERE id = ?3",
            params![started.chat, started.code, workspace_id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("workspace {workspace_id}")));
        }
        Ok(())
    }

    async fn save_token_balance(&self, user_id: &str, balance: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET token_balance = ?1 WHERE id = ?2",
            params![balance, user_id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn get_user(&self, email: &str) -> Result<User, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, email, token_balance FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    token_balance: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("user {email}")))
    }

    async fn create_user(&self, email: &str, token_balance: i64) -> Result<User, StoreError> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", params![email], |row| {
                row.get(0)
            })
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!("user {email}")));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            token_balance,
        };
        conn.execute(
            "INSERT INTO users (id, email, token_balance) VALUES (?1, ?2, ?3)",
            params![user.id, user.email, user.token_balance],
        )?;
        Ok(user)
    }

    async fn create_workspace(&self, user_id: &str, messages: &[Message]) -> Result<Workspace, StoreError> {
        let encoded = serde_json::to_string(messages)?;
        let conn = self.conn()?;
        let owner: Option<String> = conn
            .query_row("SELECT id FROM users WHERE id = ?1", params![user_id], |row| {
                row.get(0)
            })
            .optional()?;
        if owner.is_none() {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }

        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO workspaces (id, user_id, messages, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, user_id, encoded, chrono::Utc::now().to_rfc3339()],
        )?;

        Ok(Workspace {
            id,
            user_id: user_id.to_string(),
            messages: messages.to_vec(),
            file_data: FileTree::new(),
            started: StartedJobs::default(),
        })
    }

    async fn list_workspaces(&self, user_id: &str) -> Result<Vec<WorkspaceSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, messages FROM workspaces
             WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let id: String = row.get(0)?;
            let created_at: String = row.get(1)?;
            let messages: String = row.get(2)?;
            Ok((id, created_at, messages))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, created_at, messages) = row?;
            let messages: Vec<Message> = serde_json::from_str(&messages)?;
            summaries.push(summarize(id, created_at, &messages));
        }
        Ok(summaries)
    }
}
