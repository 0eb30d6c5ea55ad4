//! Panel server startup: logging, storage, change monitor, message loop.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::cache::HistoryCache;
use crate::error::{GitPanelError, Result};
use crate::git::{GitLogClient, GitSource};
use crate::history::HistoryService;
use crate::panel::{run_panel, PanelContext};
use crate::store::{storage_base, CommitStore};
use crate::watcher::spawn_git_monitor_with_retry;

use super::args::ServeArgs;

pub fn cmd_serve(args: ServeArgs) -> Result<()> {
    let log_level = match args.log_level.as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    // stdout carries the message channel — logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let repo_path = PathBuf::from(&args.dir);
    if !repo_path.join(".git").exists() {
        // Without a repository there is nothing to serve.
        return Err(GitPanelError::NoWorkspace);
    }

    info!(dir = %args.dir, "Starting panel server");

    let client = GitLogClient::new(&repo_path);
    let remote_url = client.remote_url();
    let local_path = fs::canonicalize(&repo_path)
        .unwrap_or_else(|_| repo_path.clone())
        .to_string_lossy()
        .to_string();

    let base = args
        .storage_dir
        .map(PathBuf::from)
        .unwrap_or_else(storage_base);
    let mut store = CommitStore::open(base, remote_url.as_deref(), &local_path);
    store.cleanup();
    info!(project = %store.project_key(), projects = store.project_count(), "Commit store ready");

    let cache = HistoryCache::new(args.cache_timeout_ms, !args.no_cache);
    let history = HistoryService::new(client, cache);
    let mut ctx = PanelContext::new(history, store);

    spawn_git_monitor_with_retry(repo_path, ctx.dirty_flag(), args.debounce_ms);

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("interrupted, shutting down");
        std::process::exit(0);
    }) {
        warn!(error = %e, "Failed to install ctrl-c handler");
    }

    run_panel(&mut ctx);
    Ok(())
}
