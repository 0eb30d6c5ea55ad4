//! CLI layer: argument parsing, command dispatch, and one-shot subcommands.

pub mod args;
mod serve;

pub use args::*;

use clap::{Parser, Subcommand};

use git_panel::Filter;

use crate::cache::HistoryCache;
use crate::error::Result;
use crate::git::{GitLogClient, GitSource};
use crate::graph::classify::branch_color;
use crate::history::HistoryService;
use crate::store::{storage_base, CommitStore};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Git history panel backend — commit graph reconstruction and caching over the git CLI
#[derive(Parser, Debug)]
#[command(name = "git-panel", version, about, after_help = "\
Run 'git-panel <COMMAND> --help' for detailed options.\n\
'serve' speaks line-oriented JSON on stdin/stdout; the one-shot commands print JSON.")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the panel message loop over stdio
    Serve(ServeArgs),

    /// One-shot history query, JSON to stdout
    History(HistoryArgs),

    /// List local branches
    Branches(BranchesArgs),

    /// List commit authors
    Authors(AuthorsArgs),

    /// Delete stale projects from the durable store
    Cleanup(CleanupArgs),

    /// Show durable storage info
    Info,
}

pub fn run() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve::cmd_serve(args),
        Commands::History(args) => cmd_history(args),
        Commands::Branches(args) => cmd_branches(args),
        Commands::Authors(args) => cmd_authors(args),
        Commands::Cleanup(args) => cmd_cleanup(args),
        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

// ─── One-shot commands ──────────────────────────────────────────────

fn parse_branch_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|b| {
        b.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .filter(|b: &Vec<String>| !b.is_empty())
}

fn cmd_history(args: HistoryArgs) -> Result<()> {
    let filter = Filter {
        branches: parse_branch_list(args.branches),
        author: args.author,
        search: args.search,
        page: args.page,
        page_size: args.page_size,
    };

    // One-shot invocation — nothing to cache between calls.
    let client = GitLogClient::new(&args.dir);
    let mut service = HistoryService::new(client, HistoryCache::new(0, false));
    let graph = service.get_history(&filter, false)?;

    if args.colors {
        for branch in &graph.branches {
            eprintln!("{branch}: {}", branch_color(branch));
        }
    }

    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

fn cmd_branches(args: BranchesArgs) -> Result<()> {
    let client = GitLogClient::new(&args.dir);
    let branches = client.list_branches()?;
    println!("{}", serde_json::to_string_pretty(&branches)?);
    Ok(())
}

fn cmd_authors(args: AuthorsArgs) -> Result<()> {
    let client = GitLogClient::new(&args.dir);
    let authors = client.list_authors()?;
    println!("{}", serde_json::to_string_pretty(&authors)?);
    Ok(())
}

fn cmd_cleanup(args: CleanupArgs) -> Result<()> {
    let base = args
        .storage_dir
        .map(std::path::PathBuf::from)
        .unwrap_or_else(storage_base);
    let before_base = base.clone();
    let mut store = CommitStore::open(base, None, ".");
    let before = store.project_count();
    store.cleanup();
    println!(
        "{}",
        serde_json::json!({
            "storageBase": before_base.display().to_string(),
            "projectsBefore": before,
            "projectsAfter": store.project_count(),
        })
    );
    Ok(())
}

fn cmd_info() -> Result<()> {
    let base = storage_base();
    let store = CommitStore::open(base.clone(), None, ".");
    println!(
        "{}",
        serde_json::json!({
            "storageBase": base.display().to_string(),
            "projects": store.project_count(),
            "hotCacheSize": store.config().hot_cache_size,
            "maxProjects": store.config().max_projects,
        })
    );
    Ok(())
}
