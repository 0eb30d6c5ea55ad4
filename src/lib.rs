//! # git-panel — Git history panel backend
//!
//! Commit-graph reconstruction with best-effort branch inference, topology
//! classification for rendering, and two cache tiers (in-memory query cache +
//! durable hot/warm commit store) over the `git` CLI.
//!
//! ## Library usage
//!
//! This crate is primarily a panel server binary, but the core data model and
//! the pure helpers (ref normalization, filter cache keys) are exposed as a
//! library for benchmarking and integration testing.

use serde::{Deserialize, Serialize};

pub mod decoration;

/// Default page size for history queries.
pub const DEFAULT_PAGE_SIZE: usize = 45;

/// Branch label used when no ref decoration exists anywhere in a result set.
pub const FALLBACK_BRANCH: &str = "main";

// ─── Stable hashing ─────────────────────────────────────────────────

/// Stable FNV-1a hash (deterministic across Rust versions, unlike `DefaultHasher`).
///
/// Accepts multiple byte slices that are fed into the hash sequentially,
/// allowing callers to combine a workspace path + a discriminator, etc.
#[must_use]
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &byte in *part {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Abbreviate a commit hash to the conventional 7 characters.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(7)]
}

/// Heuristic for "this search term is a commit hash": 7-40 hex digits.
///
/// Used to route a search either to a direct hash lookup or to `--grep`.
#[must_use]
pub fn is_hash_like(term: &str) -> bool {
    (7..=40).contains(&term.len()) && term.chars().all(|c| c.is_ascii_hexdigit())
}

// ─── File status ─────────────────────────────────────────────────────

/// Per-file change status as reported by `git show --name-status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Ignored,
}

impl FileStatus {
    /// Map a git name-status letter to a status. `T` (type change) is folded
    /// into `Modified`; unknown letters return `None` and the line is skipped.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'M' | 'T' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::Untracked),
            'I' => Some(Self::Ignored),
            _ => None,
        }
    }

    /// The single-letter code used on the wire and in virtual URIs.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Untracked => 'U',
            Self::Ignored => 'I',
        }
    }
}

// ─── Core commit model ───────────────────────────────────────────────

/// A single changed file within a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFile {
    pub path: String,
    pub status: FileStatus,
    /// Previous path for renames/copies.
    pub old_path: Option<String>,
    /// Rename/copy similarity percentage (the digits in `R86`).
    pub similarity: Option<u8>,
}

/// Aggregate change counts from the `--stat` summary line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub files: usize,
    pub insertions: usize,
    pub deletions: usize,
}

/// One commit record. Immutable once fetched, except for the derived fields
/// computed by the graph builder (`child_hashes`, `is_merge`,
/// `resolved_branch`) and the lazily hydrated `files` list.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    /// Ordered parent hashes. Empty for root commits; length > 1 for merges.
    pub parent_hashes: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
    /// Subject line.
    pub message: String,
    /// Remaining body text, may be empty.
    pub body: String,
    /// Raw ref decoration as printed by `%d`, may be empty.
    pub refs: String,
    pub stats: Option<CommitStats>,
    /// Changed files, hydrated lazily via `git show --name-status`.
    pub files: Option<Vec<CommitFile>>,
    /// Back-references, populated by the graph builder.
    pub child_hashes: Vec<String>,
    pub is_merge: bool,
    /// Inferred branch; set by the builder for every commit in a built graph.
    pub resolved_branch: Option<String>,
}

impl Commit {
    /// A commit with only identity fields set — used by parsers and tests.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            parent_hashes: Vec::new(),
            author_name: String::new(),
            author_email: String::new(),
            date: String::new(),
            message: String::new(),
            body: String::new(),
            refs: String::new(),
            stats: None,
            files: None,
            child_hashes: Vec::new(),
            is_merge: false,
            resolved_branch: None,
        }
    }
}

// ─── View-model types ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Commit,
    Merge,
}

/// Rendering-oriented projection of a commit — one per commit in a graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub branch: String,
    pub hash: String,
    pub message: String,
    /// True when the commit has no parents, or any parent resolved to a
    /// different branch.
    pub branch_changed: bool,
    /// Merge only: resolved branches of all parents after the first.
    pub source_branches: Option<Vec<String>>,
    pub target_branch: Option<String>,
}

/// Paged log payload inside a [`CommitGraph`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResult {
    pub commits: Vec<Commit>,
    pub total: usize,
}

/// The externally visible result of a history query.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitGraph {
    pub operations: Vec<Operation>,
    pub branches: Vec<String>,
    pub log_result: LogResult,
}

impl CommitGraph {
    /// The empty graph returned for recovered "bad revision" queries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.log_result.commits.is_empty()
    }
}

// ─── Query filter ────────────────────────────────────────────────────

/// History query parameters. Doubles as the cache key via [`Filter::cache_key`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    pub branches: Option<Vec<String>>,
    pub author: Option<String>,
    pub search: Option<String>,
    /// 1-based page number; 0 is normalized to 1.
    pub page: usize,
    /// 0 is normalized to [`DEFAULT_PAGE_SIZE`].
    pub page_size: usize,
}

impl Filter {
    /// Canonical form: sorted branch list, trimmed author/search with empty
    /// strings dropped, page/page_size clamped to their documented defaults.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let branches = self.branches.clone().and_then(|mut b| {
            b.retain(|s| !s.trim().is_empty());
            if b.is_empty() {
                None
            } else {
                b.sort();
                Some(b)
            }
        });
        let author = self
            .author
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        Self {
            branches,
            author,
            search,
            page: self.page.max(1),
            page_size: if self.page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                self.page_size
            },
        }
    }

    /// Deterministic cache-key string for this filter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let n = self.normalized();
        let branches = n
            .branches
            .as_ref()
            .map_or_else(|| "all".to_string(), |b| b.join("+"));
        format!(
            "{}|{}|{}|{}|{}",
            branches,
            n.author.as_deref().unwrap_or("any"),
            n.search.as_deref().unwrap_or(""),
            n.page,
            n.page_size
        )
    }

    /// True when nothing narrows the query beyond the first default page —
    /// the only shape the durable store is allowed to pre-seed.
    #[must_use]
    pub fn is_default(&self) -> bool {
        let n = self.normalized();
        n.branches.is_none() && n.author.is_none() && n.search.is_none() && n.page == 1
    }
}

// ─── Ref decoration normalization ────────────────────────────────────

/// One round of marker stripping; see [`normalize_ref`].
fn normalize_ref_once(s: &str) -> &str {
    let mut s = s.trim_matches(|c: char| c == ',' || c == '(' || c == ')' || c.is_whitespace());
    if let Some(rest) = s.strip_prefix("HEAD -> ") {
        s = rest;
    }
    if let Some(rest) = s.strip_prefix("ref:") {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_prefix("refs/heads/") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("refs/remotes/") {
        // Drop the remote name, keep the branch path after it.
        s = rest.split_once('/').map_or(rest, |(_, branch)| branch);
    }
    s
}

/// Normalize one ref-decoration segment to a canonical branch name.
///
/// Strips enclosing parentheses, stray commas, the `HEAD -> ` marker, the
/// `ref: ` marker, `refs/heads/`, and `refs/remotes/<remote>/` (the remote
/// segment is dropped, the rest kept). Stripping runs to a fixpoint, so the
/// function is idempotent for any input.
#[must_use]
pub fn normalize_ref(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let next = normalize_ref_once(current);
        if next == current {
            return next.to_string();
        }
        current = next;
    }
}

/// Extract branch candidates from a comma-joined decoration list.
///
/// Tag refs (`tag:` segments) and the bare `HEAD` marker are excluded;
/// order follows the decoration, duplicates are dropped.
#[must_use]
pub fn branch_candidates(decoration: &str) -> Vec<String> {
    let inner = decoration.trim();
    let inner = if inner.starts_with('(') && inner.ends_with(')') && inner.len() >= 2 {
        &inner[1..inner.len() - 1]
    } else {
        inner
    };

    let mut seen = Vec::new();
    for segment in inner.split(',') {
        let segment = segment.trim();
        if segment.is_empty() || segment.contains("tag:") {
            continue;
        }
        let name = normalize_ref(segment);
        if name.is_empty() || name == "HEAD" {
            continue;
        }
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

// ─── Tests ───────────────────────────────────────────────────────────


// ─── Property-based tests (proptest) ─────────────────────────────────

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// normalize_ref is idempotent for arbitrary input.
        #[test]
        fn normalize_ref_idempotent(input in "\\PC{0,120}") {
            let once = normalize_ref(&input);
            let twice = normalize_ref(&once);
            prop_assert_eq!(once, twice);
        }

        /// Normalized refs never keep the stripped markers at the front.
        #[test]
        fn normalize_ref_strips_markers(input in "\\PC{0,120}") {
            let out = normalize_ref(&input);
            prop_assert!(!out.starts_with("refs/heads/"));
            prop_assert!(!out.starts_with("HEAD -> "));
        }

        /// Cache keys are deterministic and insensitive to branch order.
        #[test]
        fn cache_key_branch_order_insensitive(
            mut branches in proptest::collection::vec("[a-z][a-z0-9/-]{0,15}", 1..6),
            page in 1usize..100,
        ) {
            let a = Filter { branches: Some(branches.clone()), page, ..Filter::default() };
            branches.reverse();
            let b = Filter { branches: Some(branches), page, ..Filter::default() };
            prop_assert_eq!(a.cache_key(), b.cache_key());
        }

        /// Candidates never contain tag refs or empty names.
        #[test]
        fn branch_candidates_clean(input in "\\PC{0,200}") {
            for name in branch_candidates(&input) {
                prop_assert!(!name.is_empty());
                prop_assert!(!name.contains("tag:"));
            }
        }

        /// Filter normalization is idempotent.
        #[test]
        fn filter_normalized_idempotent(
            page in 0usize..50,
            page_size in 0usize..100,
            author in proptest::option::of("[ a-zA-Z]{0,12}"),
        ) {
            let f = Filter { page, page_size, author, ..Filter::default() };
            let once = f.normalized();
            prop_assert_eq!(once.normalized(), once);
        }
    }
}
