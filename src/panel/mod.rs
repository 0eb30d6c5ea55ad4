//! Panel server — the message loop between the UI and the history engine.
//!
//! Runs line-oriented JSON over stdio: one inbound message per line, zero or
//! more outbound messages per request. A malformed or failing request turns
//! into an `error` message on the channel, never a crash.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use git_panel::{decoration, CommitFile};

use crate::error::Result;
use crate::git::GitSource;
use crate::history::HistoryService;
use crate::store::CommitStore;

pub mod protocol;

use protocol::{InboundMessage, OutboundMessage};

/// One commit of the current selection, driving the file-change tree.
pub struct SelectedCommit {
    pub hash: String,
    pub files: Vec<CommitFile>,
}

impl SelectedCommit {
    /// Virtual URIs for this commit's file nodes.
    pub fn file_uris(&self) -> Vec<String> {
        self.files.iter().map(decoration::encode_file_uri).collect()
    }
}

/// Everything one panel session owns. Constructed once at the composition
/// root; all mutation happens on the single request-handling thread.
pub struct PanelContext<S: GitSource> {
    history: HistoryService<S>,
    store: CommitStore,
    /// Hydrated file lists keyed by hash — each commit is hydrated once.
    file_cache: HashMap<String, Vec<CommitFile>>,
    selected: Vec<SelectedCommit>,
    /// Raised by the git change monitor; consumed on the next history query.
    repo_dirty: Arc<AtomicBool>,
}

impl<S: GitSource> PanelContext<S> {
    pub fn new(history: HistoryService<S>, store: CommitStore) -> Self {
        Self {
            history,
            store,
            file_cache: HashMap::new(),
            selected: Vec::new(),
            repo_dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag for the change monitor to raise.
    pub fn dirty_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.repo_dirty)
    }

    /// The commits currently selected for the changes tree.
    pub fn selected(&self) -> &[SelectedCommit] {
        &self.selected
    }

    /// Handle one raw inbound line and produce the outbound messages.
    pub fn handle_message(&mut self, line: &str) -> Vec<OutboundMessage> {
        let message: InboundMessage = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Failed to parse inbound message");
                return vec![OutboundMessage::Error {
                    message: format!("malformed message: {e}"),
                }];
            }
        };

        match self.dispatch(message) {
            Ok(out) => out,
            Err(e) => vec![OutboundMessage::Error {
                message: e.to_string(),
            }],
        }
    }

    fn dispatch(&mut self, message: InboundMessage) -> Result<Vec<OutboundMessage>> {
        match message {
            InboundMessage::GetHistory { filter, force_refresh } => {
                if self.repo_dirty.swap(false, Ordering::AcqRel) {
                    debug!("Repository changed on disk, dropping cached history");
                    self.history.invalidate();
                }

                // The durable store only pre-seeds the plain first page;
                // anything narrower always goes through the live pipeline.
                if !force_refresh && filter.is_default() {
                    let stored = self.store.get_commits();
                    if !stored.is_empty() {
                        debug!("Serving history from commit store");
                        return Ok(vec![OutboundMessage::History { commits: stored }]);
                    }
                }

                let graph = self.history.get_history(&filter, force_refresh)?;
                if !graph.is_empty() {
                    self.store.save_commits(&graph);
                }
                Ok(vec![OutboundMessage::History { commits: graph }])
            }

            InboundMessage::GetAllBranches => {
                let branches = self.history.source().list_branches()?;
                Ok(vec![OutboundMessage::Branches { branches }])
            }

            InboundMessage::GetAllAuthors => {
                let authors = self.history.source().list_authors()?;
                Ok(vec![OutboundMessage::Authors { authors }])
            }

            InboundMessage::ShowCommitDetails { commit_hashes } => {
                let hashes: Vec<String> = serde_json::from_str(&commit_hashes)?;
                // Results keep the caller's hash order regardless of how the
                // individual lookups complete.
                let mut selected = Vec::with_capacity(hashes.len());
                for hash in &hashes {
                    let files = self.commit_files_cached(hash)?;
                    selected.push(SelectedCommit { hash: hash.clone(), files });
                }
                self.selected = selected;
                Ok(Vec::new())
            }

            InboundMessage::ShowChangesPanel => Ok(vec![OutboundMessage::ClearSelected]),

            InboundMessage::ClearHistory => {
                self.store.clear_commits();
                self.history.invalidate();
                self.file_cache.clear();
                self.selected.clear();
                Ok(Vec::new())
            }
        }
    }

    /// Hydrate a commit's file list once, then serve the cached copy.
    fn commit_files_cached(&mut self, hash: &str) -> Result<Vec<CommitFile>> {
        if let Some(files) = self.file_cache.get(hash) {
            return Ok(files.clone());
        }
        let files = self.history.source().commit_files(hash)?;
        self.file_cache.insert(hash.to_string(), files.clone());
        Ok(files)
    }
}

/// Run the message loop until stdin closes.
pub fn run_panel<S: GitSource>(ctx: &mut PanelContext<S>) {
    let stdin = io::stdin();
    let reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    info!("Panel server ready, waiting for messages on stdin");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "Error reading stdin");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!(request = %line, "Inbound message");
        for outbound in ctx.handle_message(line) {
            match serde_json::to_string(&outbound) {
                Ok(json) => {
                    let _ = writeln!(writer, "{json}");
                }
                Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
            }
        }
        let _ = writer.flush();
    }

    info!("stdin closed, shutting down");
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use tempfile::tempdir;

    use git_panel::{FileStatus, Filter};

    use super::*;
    use crate::cache::HistoryCache;
    use crate::error::GitPanelError;

    struct FakeSource {
        log_calls: Cell<usize>,
        file_calls: Cell<usize>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                log_calls: Cell::new(0),
                file_calls: Cell::new(0),
            }
        }
    }

    impl GitSource for FakeSource {
        fn fetch_log(&self, _filter: &Filter) -> Result<Option<String>> {
            self.log_calls.set(self.log_calls.get() + 1);
            let s = '\u{1}';
            Ok(Some(format!(
                "bbbbbbb{s}aaaaaaa{s}Alice{s}a@x{s}date{s}Second{s} (HEAD -> refs/heads/main){s}\n\
                 aaaaaaa{s}{s}Alice{s}a@x{s}date{s}First{s}{s}"
            )))
        }

        fn fetch_parent_edges(&self, _filter: &Filter) -> Result<HashMap<String, Vec<String>>> {
            Ok(HashMap::new())
        }

        fn commit_files(&self, hash: &str) -> Result<Vec<CommitFile>> {
            self.file_calls.set(self.file_calls.get() + 1);
            Ok(vec![CommitFile {
                path: format!("src/{hash}.rs"),
                status: FileStatus::Modified,
                old_path: None,
                similarity: None,
            }])
        }

        fn parent_commit(&self, _hash: &str) -> Result<Option<String>> {
            Ok(Some("aaaaaaa".to_string()))
        }

        fn list_branches(&self) -> Result<Vec<String>> {
            Ok(vec!["main".into(), "feature".into()])
        }

        fn list_authors(&self) -> Result<Vec<String>> {
            Ok(vec!["Alice <a@x>".into()])
        }

        fn remote_url(&self) -> Option<String> {
            None
        }
    }

    fn make_ctx(dir: &std::path::Path) -> PanelContext<FakeSource> {
        let history = HistoryService::new(FakeSource::new(), HistoryCache::new(60_000, true));
        let store = CommitStore::open(dir.to_path_buf(), None, "/ws");
        PanelContext::new(history, store)
    }

    fn log_calls(ctx: &PanelContext<FakeSource>) -> usize {
        ctx.history.source().log_calls.get()
    }

    #[test]
    fn test_get_history_returns_graph() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(r#"{"command":"get-history"}"#);
        assert_eq!(out.len(), 1);
        match &out[0] {
            OutboundMessage::History { commits } => {
                assert_eq!(commits.log_result.total, 2);
                assert_eq!(commits.branches, vec!["main"]);
            }
            other => panic!("expected history, got {other:?}"),
        }
    }

    #[test]
    fn test_second_default_request_served_from_store() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        ctx.handle_message(r#"{"command":"get-history"}"#);
        let out = ctx.handle_message(r#"{"command":"get-history"}"#);
        assert_eq!(log_calls(&ctx), 1, "store pre-seeds the default page");
        assert!(matches!(out[0], OutboundMessage::History { .. }));
    }

    #[test]
    fn test_force_refresh_issues_two_subprocess_calls() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        ctx.handle_message(r#"{"command":"get-history"}"#);
        ctx.handle_message(r#"{"command":"get-history","forceRefresh":true}"#);
        assert_eq!(log_calls(&ctx), 2);
    }

    #[test]
    fn test_filtered_request_bypasses_store() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        ctx.handle_message(r#"{"command":"get-history"}"#);
        ctx.handle_message(r#"{"command":"get-history","filter":{"author":"alice"}}"#);
        assert_eq!(log_calls(&ctx), 2, "a narrowed query must hit the pipeline");
    }

    #[test]
    fn test_dirty_flag_invalidates_cached_history() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let filter_req = r#"{"command":"get-history","filter":{"author":"alice"}}"#;
        ctx.handle_message(filter_req);
        ctx.handle_message(filter_req);
        assert_eq!(log_calls(&ctx), 1, "second filtered query hits the memory cache");

        ctx.dirty_flag().store(true, Ordering::Release);
        ctx.handle_message(filter_req);
        assert_eq!(log_calls(&ctx), 2, "repo change must force a requery");
    }

    #[test]
    fn test_malformed_json_yields_error_message() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message("{nonsense");
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], OutboundMessage::Error { .. }));
    }

    #[test]
    fn test_unknown_command_yields_error_message() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(r#"{"command":"self-destruct"}"#);
        assert!(matches!(out[0], OutboundMessage::Error { .. }));
    }

    #[test]
    fn test_get_all_branches() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(r#"{"command":"get-all-branches"}"#);
        match &out[0] {
            OutboundMessage::Branches { branches } => {
                assert_eq!(branches, &["main".to_string(), "feature".to_string()]);
            }
            other => panic!("expected branches, got {other:?}"),
        }
    }

    #[test]
    fn test_get_all_authors() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(r#"{"command":"get-all-authors"}"#);
        match &out[0] {
            OutboundMessage::Authors { authors } => assert_eq!(authors.len(), 1),
            other => panic!("expected authors, got {other:?}"),
        }
    }

    #[test]
    fn test_show_commit_details_keeps_request_order() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(
            r#"{"command":"show-commit-details","commitHashes":"[\"bbbbbbb\",\"aaaaaaa\"]"}"#,
        );
        assert!(out.is_empty());
        let hashes: Vec<&str> = ctx.selected().iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["bbbbbbb", "aaaaaaa"]);
        assert!(ctx.selected()[0].file_uris()[0].starts_with("git-panel-file:"));
    }

    #[test]
    fn test_commit_details_hydrate_once_per_hash() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let req = r#"{"command":"show-commit-details","commitHashes":"[\"bbbbbbb\"]"}"#;
        ctx.handle_message(req);
        ctx.handle_message(req);
        assert_eq!(ctx.history.source().file_calls.get(), 1);
    }

    #[test]
    fn test_show_changes_panel_clears_selection_marker() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        let out = ctx.handle_message(r#"{"command":"show-changes-panel"}"#);
        assert!(matches!(out[0], OutboundMessage::ClearSelected));
    }

    #[test]
    fn test_clear_history_empties_store_and_selection() {
        let dir = tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        ctx.handle_message(r#"{"command":"get-history"}"#);
        ctx.handle_message(
            r#"{"command":"show-commit-details","commitHashes":"[\"bbbbbbb\"]"}"#,
        );
        ctx.handle_message(r#"{"command":"clear-history"}"#);

        assert!(ctx.selected().is_empty());
        // Next default request must requery git, not the store.
        ctx.handle_message(r#"{"command":"get-history"}"#);
        assert_eq!(log_calls(&ctx), 2);
    }
}
