//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Rebuild an ActivityWatch timeline.
///
/// Merges the window, AFK and browser watchers of one host into a single
/// gap-free activity timeline and writes it to a destination server.
#[derive(Debug, Parser)]
#[command(name = "awm", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reset the destination and write the merged timeline to it (default).
    Migrate(MigrateArgs),

    /// List source buckets and the role each one feeds.
    Buckets,
}

#[derive(Debug, Default, Args)]
pub struct MigrateArgs {
    /// Run the sweep without touching the destination.
    #[arg(long)]
    pub dry_run: bool,
}
