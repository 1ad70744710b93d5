use crate::config::EngineConfig;
use crate::prelude::{println, *};
use crate::render::{render_chat_view, render_code_view};
use crate::store::{SqliteStore, WorkspaceStore};
use appforge_core::files::{default_skeleton, merge};
use appforge_core::transcript::{Message, User, Workspace, WorkspaceSnapshot, WorkspaceSummary};
use colored::Colorize;

#[derive(Debug, clap::Parser)]
#[command(name = "workspace")]
#[command(about = "Create, list and inspect workspaces")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Create a workspace, optionally seeded with the first message
    #[clap(name = "create")]
    Create(CreateOptions),

    /// List the workspaces of a user
    #[clap(name = "list")]
    List(ListOptions),

    /// Show the transcript and rendered files of a workspace
    #[clap(name = "show")]
    Show(ShowOptions),
}

#[derive(Debug, clap::Args)]
pub struct CreateOptions {
    /// Owner of the workspace
    #[arg(long, env = "APPFORGE_USER")]
    pub user: String,

    /// First user message
    pub prompt: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct ListOptions {
    /// Owner of the workspaces
    #[arg(long, env = "APPFORGE_USER")]
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ShowOptions {
    /// Workspace ID
    pub id: String,

    /// Owner of the workspace
    #[arg(long, env = "APPFORGE_USER")]
    pub user: String,

    /// Print file contents, not just paths
    #[arg(long)]
    pub full: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = EngineConfig::from_global(&global)?;

    if global.verbose {
        println!("Database: {}", config.database.display());
    }

    let store = SqliteStore::open(&config.database)?;

    match app.command {
        Commands::Create(options) => create(&store, options).await,
        Commands::List(options) => list(&store, options).await,
        Commands::Show(options) => show(&store, options).await,
    }
}

async fn create(store: &SqliteStore, options: CreateOptions) -> Result<()> {
    let user = store.get_user(&options.user).await?;
    let messages: Vec<Message> = options
        .prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .map(Message::user)
        .into_iter()
        .collect();

    let workspace = store.create_workspace(&user.id, &messages).await?;
    println!("{}: {}", "Workspace".green(), workspace.id.bright_white().bold());

    Ok(())
}

async fn list(store: &SqliteStore, options: ListOptions) -> Result<()> {
    let user = store.get_user(&options.user).await?;
    let summaries = store.list_workspaces(&user.id).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No workspaces for {}", user.email);
        return Ok(());
    }

    println!("{}", summary_table(&summaries));
    Ok(())
}

fn summary_table(summaries: &[WorkspaceSummary]) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "CREATED", "MESSAGES", "FIRST PROMPT"]);

    for summary in summaries {
        let title = summary.first_prompt.as_deref().unwrap_or("(empty)");
        table.add_row(prettytable::row![
            summary.id,
            summary.created_at,
            summary.message_count,
            truncate(title, 50)
        ]);
    }

    table
}

async fn show(store: &SqliteStore, options: ShowOptions) -> Result<()> {
    let user = store.get_user(&options.user).await?;
    let workspace = store.load(&options.id).await?;
    if workspace.user_id != user.id {
        return Err(eyre!("Workspace {} does not belong to {}", options.id, user.email));
    }

    let snapshot = rendered_snapshot(workspace, &user);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", render_chat_view(&snapshot));
    println!("{}", render_code_view(&snapshot, options.full));
    Ok(())
}

/// What a session opened on `workspace` would render.
fn rendered_snapshot(workspace: Workspace, user: &User) -> WorkspaceSnapshot {
    WorkspaceSnapshot {
        files: merge(&default_skeleton(), &workspace.file_data),
        workspace_id: Some(workspace.id),
        messages: workspace.messages,
        token_balance: user.token_balance,
        chat_busy: false,
        code_busy: false,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use appforge_core::files::{FileContent, FileTree};

    #[test]
    fn test_rendered_snapshot_merges_skeleton() {
        let mut file_data = FileTree::new();
        file_data.insert("/App.css".to_string(), FileContent::new("body {}"));
        let workspace = Workspace {
            id: "w1".to_string(),
            user_id: "u1".to_string(),
            messages: vec![Message::user("hi")],
            file_data,
            started: Default::default(),
        };
        let user = User {
            id: "u1".to_string(),
            email: "a@b.c".to_string(),
            token_balance: 12,
        };

        let snapshot = rendered_snapshot(workspace, &user);

        assert_eq!(snapshot.files["/App.css"].code, "body {}");
        assert!(snapshot.files.contains_key("/public/index.html"));
        assert_eq!(snapshot.token_balance, 12);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long first prompt", 10), "a very ...");
    }
}
