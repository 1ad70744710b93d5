use crate::config::EngineConfig;
use crate::prelude::{println, *};
use crate::store::{SqliteStore, WorkspaceStore};
use appforge_core::transcript::User;
use colored::Colorize;

#[derive(Debug, clap::Parser)]
#[command(name = "user")]
#[command(about = "Manage users and their token balances")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Create a user with a starting token balance
    #[clap(name = "create")]
    Create(CreateOptions),

    /// Show a user and its balance
    #[clap(name = "show")]
    Show(ShowOptions),

    /// Overwrite the token balance of a user
    #[clap(name = "set-tokens")]
    SetTokens(SetTokensOptions),
}

#[derive(Debug, clap::Args)]
pub struct CreateOptions {
    /// Email identifying the user
    pub email: String,

    /// Starting token balance
    #[arg(long, default_value = "100")]
    pub tokens: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ShowOptions {
    /// Email identifying the user
    pub email: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct SetTokensOptions {
    /// Email identifying the user
    pub email: String,

    /// New balance
    #[arg(allow_hyphen_values = true)]
    pub tokens: i64,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = EngineConfig::from_global(&global)?;

    if global.verbose {
        println!("Database: {}", config.database.display());
    }

    let store = SqliteStore::open(&config.database)?;

    match app.command {
        Commands::Create(options) => {
            let user = store.create_user(&options.email, options.tokens).await?;
            print_user(&user, options.json)
        }
        Commands::Show(options) => {
            let user = store.get_user(&options.email).await?;
            print_user(&user, options.json)
        }
        Commands::SetTokens(options) => {
            let user = store.get_user(&options.email).await?;
            store.save_token_balance(&user.id, options.tokens).await?;
            println!(
                "{} {} {}",
                user.email.bright_white(),
                "now has".green(),
                options.tokens.to_string().bright_yellow()
            );
            Ok(())
        }
    }
}

fn print_user(user: &User, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", user.id]);
    table.add_row(prettytable::row!["Email", user.email]);
    table.add_row(prettytable::row!["Tokens", user.token_balance]);
    table.printstd();

    Ok(())
}
