use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Keep a personal EPUB library deduplicated and searchable.
#[derive(Debug, Parser)]
#[command(name = "libris", author, version, about)]
pub struct Args {
    /// Configuration file, merged over the user configuration directory
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest new books from the import directory once
    Refresh,
    /// Ingest new books periodically until interrupted
    Watch,
    /// Search the library; an empty query lists the most recent books
    Search {
        /// Terms, or `field:value` filters such as `author:dan brown`
        query: Vec<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Search author, title and description text instead of match keys
        #[arg(long)]
        full_text: bool,
    },
    /// Show the book count and recent refresh history
    Stats {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Bulk import book records from a JSON array
    Import { file: PathBuf },
}
