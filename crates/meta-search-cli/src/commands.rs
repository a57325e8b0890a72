use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "meta-search")]
#[command(
    about = "Search PNG generation parameters with OR/AND wildcard expressions",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a folder for images whose parameters match an expression
    Search(SearchArgs),
    /// Print the parsed parameters of a single image
    Inspect {
        /// PNG file to read
        file: PathBuf,
    },
    /// Normalize an expression and show how it was cleaned
    Check {
        /// Raw expression, e.g. "cat && dog || bird"
        expression: String,
    },
    /// Print configuration values
    PrintConfig,
}

/// Flags override the saved configuration; anything left unset falls back
/// to `MetaSearch.toml` / `META_SEARCH__*`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search expression
    pub term: Option<String>,

    /// Folder to scan
    #[arg(short, long)]
    pub folder: Option<PathBuf>,

    /// Files matching any branch of this expression are skipped
    #[arg(short, long)]
    pub ignore: Option<String>,

    /// Regex that must also match some metadata field
    #[arg(long)]
    pub filter: Option<String>,

    /// Copy matches under this folder
    #[arg(long)]
    pub copy_to: Option<PathBuf>,

    /// Move matches under this folder
    #[arg(long)]
    pub move_to: Option<PathBuf>,

    /// Only scan the top level of the folder
    #[arg(long)]
    pub no_recursive: bool,

    #[arg(long)]
    pub case_sensitive: bool,

    /// Search the positive prompt
    #[arg(long)]
    pub positive: bool,

    /// Search the negative prompt
    #[arg(long)]
    pub negative: bool,

    /// Search every parsed field
    #[arg(long, conflicts_with_all = ["positive", "negative"])]
    pub all_fields: bool,

    /// Place files in one folder per matched OR branch
    #[arg(long)]
    pub group_by_branch: bool,

    /// Put every file directly in the destination folder
    #[arg(long)]
    pub flatten: bool,

    /// Glob of paths to skip; may be repeated
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Write the report to a timestamped file
    #[arg(long)]
    pub log: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Worker threads for matching
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Don't ask before moving files
    #[arg(short, long)]
    pub yes: bool,
}
