//! querystudy CLI
//!
//! Seeds a database from a YAML fixture and runs textual queries against it

use clap::{Parser, Subcommand};
use querystudy_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "querystudy")]
#[command(about = "querystudy - typed queries over members and teams", long_about = None)]
struct Cli {
    /// Logging profile: development or production
    #[arg(long, global = true, default_value = "development")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a fixture of teams and members
    Seed(commands::seed::SeedArgs),
    /// Run a textual query and print rows as JSON
    Query(commands::query::QueryArgs),
}

fn main() {
    let cli = Cli::parse();
    init(cli.log_profile);

    let result = match cli.command {
        Commands::Seed(args) => commands::seed::execute(args),
        Commands::Query(args) => commands::query::execute(args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
