//! History service — the composition of log client, graph builder, topology
//! classifier, and the in-memory cache into one query pipeline.

use git_panel::{CommitGraph, Filter, LogResult};

use crate::cache::HistoryCache;
use crate::error::Result;
use crate::git::{parse_log, GitSource};
use crate::graph::{build_graph, classify::classify};

pub struct HistoryService<S: GitSource> {
    source: S,
    cache: HistoryCache,
}

impl<S: GitSource> HistoryService<S> {
    pub fn new(source: S, cache: HistoryCache) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drop every cached result — called when the repository changes on disk.
    pub fn invalidate(&mut self) {
        self.cache.invalidate_all();
    }

    /// Run a history query.
    ///
    /// `force_refresh` bypasses the cache read but still writes the fresh
    /// result back. A query git rejects with a missing-revision error
    /// resolves to the empty graph instead of failing — an invalid search
    /// term is not a crash.
    pub fn get_history(&mut self, filter: &Filter, force_refresh: bool) -> Result<CommitGraph> {
        if !force_refresh {
            if let Some(cached) = self.cache.get(filter) {
                return Ok(cached);
            }
        }

        let graph = match self.source.fetch_log(filter)? {
            None => CommitGraph::empty(),
            Some(raw) => {
                let commits = parse_log(&raw);
                let edges = self.source.fetch_parent_edges(filter)?;
                let built = build_graph(commits, &edges);
                let operations = classify(&built.commits);
                let total = built.commits.len();
                CommitGraph {
                    operations,
                    branches: built.branches,
                    log_result: LogResult {
                        commits: built.commits,
                        total,
                    },
                }
            }
        };

        self.cache.put(filter, &graph);
        Ok(graph)
    }
}
