#![allow(unused)]

use crate::prelude::*;
use clap::Parser;
use std::path::PathBuf;

mod chat;
mod config;
mod error;
mod orchestrator;
mod prelude;
mod render;
mod server;
mod store;
mod upstream;
mod user;
mod workspace;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Describe an app in plain language and iterate on it: chat replies, generated files and a token budget kept in sync per workspace"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Base URL of the generation endpoints
    #[clap(
        long,
        env = "APPFORGE_UPSTREAM_URL",
        global = true,
        default_value = config::DEFAULT_UPSTREAM_URL
    )]
    upstream_url: String,

    /// Path of the workspace database
    #[clap(long, env = "APPFORGE_DB", global = true)]
    db: Option<PathBuf>,

    /// Balance a user needs before any generation starts
    #[clap(
        long,
        env = "APPFORGE_MIN_BALANCE",
        global = true,
        default_value_t = appforge_core::ledger::MIN_BALANCE
    )]
    min_balance: i64,

    /// TOML file overriding the chat and code prompt suffixes
    #[clap(long, env = "APPFORGE_PROMPTS", global = true)]
    prompts: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "APPFORGE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Serve the chat and code generation endpoints
    Serve(crate::server::App),

    /// Chat with a workspace
    Chat(crate::chat::App),

    /// Workspace management
    Workspace(crate::workspace::App),

    /// User and token balance management
    User(crate::user::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Serve(sub_app) => crate::server::run(sub_app, app.global).await,
        SubCommands::Chat(sub_app) => crate::chat::run(sub_app, app.global).await,
        SubCommands::Workspace(sub_app) => crate::workspace::run(sub_app, app.global).await,
        SubCommands::User(sub_app) => crate::user::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
