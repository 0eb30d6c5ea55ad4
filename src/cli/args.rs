//! CLI argument structs for all subcommands.

use clap::Parser;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Repository to serve (must contain a .git directory)
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// History cache entry lifetime in milliseconds
    #[arg(long, default_value = "60000")]
    pub cache_timeout_ms: u64,

    /// Disable the in-memory history cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Debounce window for the git change monitor, in milliseconds
    #[arg(long, default_value = "500")]
    pub debounce_ms: u64,

    /// Override the durable storage base directory
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Repository to query
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Comma-separated branch names (default: all branches)
    #[arg(short, long)]
    pub branches: Option<String>,

    /// Filter by author substring
    #[arg(short, long)]
    pub author: Option<String>,

    /// Search term: message grep, or a direct lookup for hash-shaped input
    #[arg(short, long)]
    pub search: Option<String>,

    /// 1-based page number
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Commits per page
    #[arg(long, default_value = "45")]
    pub page_size: usize,

    /// Also print the branch color assignments to stderr
    #[arg(long)]
    pub colors: bool,
}

#[derive(Parser, Debug)]
pub struct BranchesArgs {
    /// Repository to query
    #[arg(short, long, default_value = ".")]
    pub dir: String,
}

#[derive(Parser, Debug)]
pub struct AuthorsArgs {
    /// Repository to query
    #[arg(short, long, default_value = ".")]
    pub dir: String,
}

#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Override the durable storage base directory
    #[arg(long)]
    pub storage_dir: Option<String>,
}
