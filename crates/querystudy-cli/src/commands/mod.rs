pub mod query;
pub mod seed;

use clap::Args;
use querystudy_store::StoreConfig;
use std::path::PathBuf;

/// Database selection shared by every command
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// SQLite database file; overrides the config file and QUERYSTUDY_DB
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// TOML store configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl StoreArgs {
    /// Config file (or defaults), then environment, then `--db`
    pub fn store_config(&self) -> Result<StoreConfig, Box<dyn std::error::Error>> {
        let base = match &self.config {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default(),
        };
        let mut config = base.with_overrides(|key| std::env::var(key).ok())?;
        if let Some(db) = &self.db {
            config.path = Some(db.clone());
        }
        if config.path.is_none() {
            return Err("no database given; pass --db or set QUERYSTUDY_DB".into());
        }
        Ok(config)
    }
}
