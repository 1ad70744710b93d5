use crate::config::EngineConfig;
use crate::orchestrator::Orchestrator;
use crate::prelude::{eprintln, println, *};
use crate::render::{render_chat_view, render_code_view, render_notification};
use crate::store::{MemoryStore, SqliteStore, WorkspaceStore};
use crate::upstream::{HttpUpstream, Upstream};
use appforge_core::jobs::Notification;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, clap::Parser)]
#[command(name = "chat")]
#[command(about = "Chat with a workspace and watch its files being generated")]
pub struct App {
    /// Workspace ID (not needed with --ephemeral)
    pub workspace: Option<String>,

    /// Email of the workspace owner
    #[clap(long, env = "APPFORGE_USER")]
    pub user: String,

    /// Keep everything in memory instead of the workspace database
    #[clap(long)]
    pub ephemeral: bool,

    /// Starting balance of the in-memory user
    #[clap(long, default_value = "100")]
    pub tokens: i64,

    /// Print file contents, not just paths
    #[clap(long)]
    pub full: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = EngineConfig::from_global(&global)?;
    let upstream = Arc::new(HttpUpstream::new(&config.upstream_url)?);

    if global.verbose {
        eprintln!("Upstream: {}", config.upstream_url);
        eprintln!("Minimum balance: {}", config.min_balance);
    }

    if app.ephemeral {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user(&app.user, app.tokens).await?;
        let workspace = store.create_workspace(&user.id, &[]).await?;
        return session(store, upstream, &config, &workspace.id, &app).await;
    }

    let workspace = app
        .workspace
        .clone()
        .ok_or_eyre("A workspace ID is required unless --ephemeral is set")?;

    if global.verbose {
        eprintln!("Database: {}", config.database.display());
    }

    let store = Arc::new(SqliteStore::open(&config.database)?);
    session(store, upstream, &config, &workspace, &app).await
}

async fn session<S: WorkspaceStore>(
    store: Arc<S>,
    upstream: Arc<HttpUpstream>,
    config: &EngineConfig,
    workspace_id: &str,
    app: &App,
) -> Result<()> {
    let (orchestrator, mut notices) =
        Orchestrator::new(store, upstream, config.prompts.clone(), config.min_balance);
    let mut updates = orchestrator.subscribe();

    let snapshot = orchestrator.open(workspace_id, &app.user).await?;
    println!("{}", render_chat_view(&snapshot));
    println!("{}", render_code_view(&snapshot, app.full));

    if orchestrator.has_pending_jobs().await {
        println!("{}", "Resuming the last unanswered message...".bright_black());
        orchestrator.observe().await;
        show(&orchestrator, &mut notices, app.full);
    }

    println!(
        "{}",
        "Type a message, /files for file contents, /balance, or /quit.".bright_black()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        anstream::print!("{} ", ">".bright_cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/files" => println!("{}", render_code_view(&orchestrator.snapshot(), true)),
            "/balance" => println!(
                "{} {}",
                "tokens left:".green(),
                orchestrator.snapshot().token_balance.to_string().bright_yellow()
            ),
            text => {
                let _ = updates.borrow_and_update();
                let cycle = orchestrator.submit(text);
                tokio::pin!(cycle);

                loop {
                    tokio::select! {
                        result = &mut cycle => {
                            if let Err(err) = result {
                                eprintln!("{}", err.notice().red());
                            }
                            break;
                        }
                        Ok(()) = updates.changed() => {
                            let current = updates.borrow_and_update().clone();
                            if current.chat_busy {
                                println!("{}", "Generating response...".bright_black());
                            }
                            if current.code_busy {
                                println!("{}", "Generating your files...".bright_black());
                            }
                        }
                    }
                }

                show(&orchestrator, &mut notices, app.full);
            }
        }
    }

    orchestrator.close().await;
    Ok(())
}

fn show<S: WorkspaceStore, U: Upstream>(
    orchestrator: &Orchestrator<S, U>,
    notices: &mut UnboundedReceiver<Notification>,
    full: bool,
) {
    while let Ok(notification) = notices.try_recv() {
        eprintln!("{}", render_notification(&notification));
    }

    let snapshot = orchestrator.snapshot();
    println!("{}", render_chat_view(&snapshot));
    println!("{}", render_code_view(&snapshot, full));
}
