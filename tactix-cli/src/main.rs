//! TACTIX CLI - Command-line interface
//!
//! Commands:
//! - selfplay: Play engine-vs-engine games and report statistics

use clap::{Parser, Subcommand};

mod selfplay;

#[derive(Parser)]
#[command(name = "tactix")]
#[command(about = "Monte Carlo tree search tic-tac-toe harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play engine-vs-engine games and report statistics
    Selfplay(selfplay::SelfplayArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Selfplay(args) => selfplay::run(args),
    }
}
