mod assembler;
mod chapters;
mod cli;
mod commands;
mod error;
mod extractor;
mod logging;
mod mcp;
mod pdf;
mod pipeline;
mod scratch;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Mcp => {
            mcp::run_server().await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Chapters { chapters } => {
            commands::chapters::run(&chapters)?;
        }
        Commands::Split {
            path,
            chapters,
            output_dir,
            scratch_dir,
        } => {
            commands::split::run(&path, &chapters, &output_dir, scratch_dir).await?;
        }
    }

    Ok(())
}
