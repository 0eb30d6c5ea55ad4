//! Git history panel backend — binary entry point. All CLI logic is in the
//! `cli` module.

// mimalloc aggressively returns freed pages to the OS, which matters for a
// long-lived panel process holding large warm-tier graphs.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Re-export core types from the library crate
pub use git_panel::{
    branch_candidates, is_hash_like, normalize_ref, short_hash, stable_hash, Commit, CommitFile,
    CommitGraph, CommitStats, FileStatus, Filter, LogResult, Operation, OperationKind,
};

mod cache;
mod cli;
mod error;
mod git;
mod graph;
mod history;
mod panel;
mod store;
mod watcher;

pub use error::GitPanelError;
pub use git::{GitLogClient, GitSource};
pub use graph::{build_graph, classify::branch_color, classify::classify, BuiltGraph};
pub use history::HistoryService;
pub use store::CommitStore;

fn main() {
    cli::run();
}
