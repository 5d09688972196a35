//! Fixture import command
//!
//! Usage: querystudy seed --db <PATH> <FIXTURE>

use super::StoreArgs;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Path to fixture YAML file
    pub fixture: PathBuf,
}

/// Execute seed command
pub fn execute(args: SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.store.store_config()?;
    let mut conn = config.open()?;

    println!("Importing {}...", args.fixture.display());
    let report = querystudy_store::fixture::import_fixture_file(&args.fixture, &mut conn)?;

    for (name, id) in &report.teams {
        println!("team {} -> {}", name, id);
    }
    for (username, id) in &report.members {
        println!("member {} -> {}", username.as_deref().unwrap_or("<unnamed>"), id);
    }
    println!(
        "Imported {} teams, {} members",
        report.teams.len(),
        report.members.len()
    );

    Ok(())
}
