//! Import subcommand for taskpoet CLI
//!
//! Loads a TaskWarrior export (`task export`) into the current namespace.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the TaskWarrior export: a JSON array or one object per line,
    /// optionally gzipped
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Parse and report what would be imported without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    /// Check if this is a gzipped file based on extension
    pub fn is_gzipped(&self) -> bool {
        self.file.extension().is_some_and(|ext| ext == "gz")
    }
}
