use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chapsplit")]
#[command(about = "Split a PDF into chapter files from a plain-text chapter table")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server
    Mcp,

    /// Display page count and metadata of a PDF
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Show how a chapter table will be interpreted
    Chapters {
        /// Chapter table: "<number> <title...> <start> <end>" per line
        chapters: PathBuf,
    },

    /// Write one PDF per chapter listed in the chapter table
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        /// Chapter table: "<number> <title...> <start> <end>" per line
        chapters: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Directory in which to create the temporary page area
        #[arg(long)]
        scratch_dir: Option<PathBuf>,
    },
}
