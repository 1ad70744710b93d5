use crate::prelude::*;
use appforge_core::prompt::PromptTemplates;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the generation endpoints live unless told otherwise.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:3000";

/// Engine configuration resolved from global flags and environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub upstream_url: String,
    pub database: PathBuf,
    pub min_balance: i64,
    pub prompts: PromptTemplates,
}

impl EngineConfig {
    /// Resolve the configuration from the global CLI options.
    ///
    /// Every option already falls back to its environment variable through clap;
    /// here we only fill in the defaults that need I/O.
    pub fn from_global(global: &crate::Global) -> Result<Self> {
        let database = match &global.db {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };

        let prompts = match &global.prompts {
            Some(path) => load_prompts(path)?,
            None => PromptTemplates::default(),
        };

        Ok(Self {
            upstream_url: global.upstream_url.clone(),
            database,
            min_balance: global.min_balance,
            prompts,
        })
    }
}

/// Get the data directory for the workspace database
fn default_database_path() -> Result<PathBuf> {
    let data_dir = dirs_next::data_dir()
        .ok_or_else(|| eyre!("Unable to determine data directory"))?
        .join("appforge");

    fs::create_dir_all(&data_dir).map_err(|e| eyre!("Failed to create data directory: {}", e))?;

    Ok(data_dir.join("appforge.db"))
}

/// Load prompt suffix overrides from a TOML file
pub fn load_prompts(path: &Path) -> Result<PromptTemplates> {
    let source = fs::read_to_string(path)
        .with_context(|| f!("Failed to read prompt templates from {}", path.display()))?;

    PromptTemplates::from_toml_str(&source).map_err(|e| eyre!("{}: {}", path.display(), e))
}
