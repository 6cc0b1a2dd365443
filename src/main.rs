use anyhow::Result;
use clap::{Parser, Subcommand};
use rusearch::cmd;

#[derive(Parser)]
#[command(name = "rusearch")]
#[command(version = "0.1.0")]
#[command(about = "A miniaturized USEARCH-style sequence similarity search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query sequences against a reference database
    Search(cmd::SearchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => {
            cmd::search::run(args)?;
        }
    }
    Ok(())
}
