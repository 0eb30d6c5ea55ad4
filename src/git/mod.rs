//! Git log client — calls the `git` CLI and parses its text output.
//!
//! All queries are read-only. The log format uses a 0x01 control byte as the
//! intra-record field separator, which cannot appear in commit text, so
//! records split unambiguously even though bodies and stat blocks contain
//! embedded newlines. Output parsing is defensive throughout: unmatched lines
//! are skipped and missing numeric fields default to zero, never panicking on
//! unexpected shapes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use git_panel::{is_hash_like, Commit, CommitFile, CommitStats, FileStatus, Filter};

use crate::error::{GitPanelError, Result};

/// Intra-record field separator in the log pretty format.
pub const FIELD_SEP: char = '\u{1}';

/// Floor for the wide parent-edge query span.
const EDGE_QUERY_FLOOR: usize = 100;

fn hash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{7,40}$").expect("static regex"))
}

fn stat_summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?")
            .expect("static regex")
    })
}

fn stat_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\S.*\s\|\s+(\d+|Bin)(\s.*)?$").expect("static regex")
    })
}

fn name_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z])(\d*)\t(.+)$").expect("static regex"))
}

// ─── Source seam ────────────────────────────────────────────────────

/// The git queries the history pipeline depends on. A trait so tests can
/// substitute a canned source for the subprocess-backed client.
pub trait GitSource {
    /// Paged, filtered log text. `Ok(None)` means git reported a missing
    /// revision — recovered locally as an empty result, not an error.
    fn fetch_log(&self, filter: &Filter) -> Result<Option<String>>;

    /// Parent edges over a superset of the visible page, so lineage does not
    /// dead-end at page boundaries.
    fn fetch_parent_edges(&self, filter: &Filter) -> Result<HashMap<String, Vec<String>>>;

    /// Changed-file list for one commit (`git show --name-status`).
    fn commit_files(&self, hash: &str) -> Result<Vec<CommitFile>>;

    /// First parent of a commit, `None` for roots.
    fn parent_commit(&self, hash: &str) -> Result<Option<String>>;

    fn list_branches(&self) -> Result<Vec<String>>;

    fn list_authors(&self) -> Result<Vec<String>>;

    /// Configured origin URL, if any.
    fn remote_url(&self) -> Option<String>;
}

// ─── Client ─────────────────────────────────────────────────────────

/// Subprocess-backed [`GitSource`] rooted at one repository.
pub struct GitLogClient {
    repo_path: PathBuf,
}

impl GitLogClient {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn run_git(&self, args: &[String]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| {
                GitPanelError::GitInvocation(format!(
                    "failed to execute git: {e}. Is git installed and in PATH?"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitPanelError::GitInvocation(stderr));
        }

        Ok(String::from_utf8(output.stdout)?)
    }

    /// Like [`run_git`], but a missing-revision failure becomes `Ok(None)`.
    fn run_git_recoverable(&self, args: &[String]) -> Result<Option<String>> {
        match self.run_git(args) {
            Ok(out) => Ok(Some(out)),
            Err(GitPanelError::GitInvocation(msg)) if is_missing_revision(&msg) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// True when stderr indicates the query target does not exist — the common
/// case of an invalid search term, recovered as an empty result.
pub fn is_missing_revision(stderr: &str) -> bool {
    stderr.contains("bad revision")
        || stderr.contains("unknown revision")
        || stderr.starts_with("fatal:")
}

// ─── Argument building ──────────────────────────────────────────────

fn pretty_format() -> String {
    let s = FIELD_SEP;
    format!("--pretty=format:%H{s}%P{s}%an{s}%ae{s}%ad{s}%s{s}%d{s}%b")
}

/// Build the `git log` argument list for a history page.
///
/// A hash-shaped search term (>= 7 hex digits) becomes a direct revision
/// lookup with `--max-count=1`; anything else routes to a case-insensitive
/// `--grep`. `--all` is used only when no branch filter and no hash lookup
/// narrow the scope.
pub fn log_args(filter: &Filter) -> Vec<String> {
    let f = filter.normalized();
    let mut args: Vec<String> = vec!["log".into()];

    let search = f.search.as_deref();
    let hash_lookup = search.is_some_and(is_hash_like);

    if hash_lookup {
        // search is present by construction when hash_lookup is true
        if let Some(hash) = search {
            args.push(hash.to_string());
        }
        args.push("--max-count=1".into());
    } else {
        match &f.branches {
            Some(branches) => args.extend(branches.iter().cloned()),
            None => args.push("--all".into()),
        }
        if let Some(author) = &f.author {
            args.push(format!("--author={author}"));
        }
        args.push(format!("--skip={}", (f.page - 1) * f.page_size));
        args.push(format!("--max-count={}", f.page_size));
        if let Some(s) = search {
            args.push(format!("--grep={s}"));
            args.push("--regexp-ignore-case".into());
        }
    }

    args.push("--decorate=full".into());
    args.push(pretty_format());
    args.push("--stat".into());
    args
}

/// Build the wide parent-edge query: `%H %P` over a superset of the page.
pub fn edge_args(filter: &Filter) -> Vec<String> {
    let f = filter.normalized();
    let mut args: Vec<String> = vec!["log".into(), "--pretty=format:%H %P".into()];

    let hash_lookup = f.search.as_deref().is_some_and(is_hash_like);
    match &f.branches {
        Some(branches) if !hash_lookup => args.extend(branches.iter().cloned()),
        _ => args.push("--all".into()),
    }

    let span = ((f.page + 1) * f.page_size).max(EDGE_QUERY_FLOOR);
    args.push(format!("--max-count={span}"));
    args
}

// ─── Log output parsing ─────────────────────────────────────────────

/// A line starts a new commit record iff splitting on the control byte yields
/// more than one field and the first field is a 7-40 char hex hash. This
/// disambiguates hash-looking tokens inside a message body from real headers.
fn parse_record_header(line: &str) -> Option<Commit> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 2 || !hash_re().is_match(fields[0]) {
        return None;
    }

    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let mut commit = Commit::new(fields[0]);
    commit.parent_hashes = field(1).split_whitespace().map(String::from).collect();
    commit.author_name = field(2).trim().to_string();
    commit.author_email = field(3).trim().to_string();
    commit.date = field(4).trim().to_string();
    commit.message = field(5).trim().to_string();
    commit.refs = field(6).trim().to_string();
    // Body is the last field — rejoin in case the separator appeared in it
    commit.body = match fields.get(7..) {
        Some(rest) if !rest.is_empty() => rest.join("\u{1}"),
        _ => String::new(),
    };
    commit.is_merge = commit.parent_hashes.len() > 1;
    Some(commit)
}

fn finalize_record(mut commit: Commit, trailing: &[&str]) -> Commit {
    let mut body_lines: Vec<&str> = Vec::new();
    let mut files: Vec<CommitFile> = Vec::new();

    for &line in trailing {
        if let Some(stats) = parse_stat_summary(line) {
            commit.stats = Some(stats);
        } else if let Some(file) = parse_name_status_line(line) {
            files.push(file);
        } else if stat_file_re().is_match(line) {
            // per-file histogram line — the summary carries the counts
        } else {
            body_lines.push(line);
        }
    }

    if !files.is_empty() {
        commit.files = Some(files);
    }

    let mut body = commit.body.clone();
    if !body_lines.is_empty() {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&body_lines.join("\n"));
    }
    commit.body = body.trim().to_string();
    commit
}

/// Parse raw `git log` output (control-byte format + `--stat`) into commits.
///
/// Non-header lines accumulate into the previous record's trailing blob; the
/// stat summary and any name-status lines are extracted from it, everything
/// else is body text. Lines before the first header are discarded.
pub fn parse_log(raw: &str) -> Vec<Commit> {
    let mut commits: Vec<Commit> = Vec::new();
    let mut current: Option<(Commit, Vec<&str>)> = None;

    for line in raw.lines() {
        if let Some(commit) = parse_record_header(line) {
            if let Some((prev, trailing)) = current.take() {
                commits.push(finalize_record(prev, &trailing));
            }
            current = Some((commit, Vec::new()));
        } else if let Some((_, trailing)) = current.as_mut() {
            trailing.push(line);
        }
    }
    if let Some((prev, trailing)) = current.take() {
        commits.push(finalize_record(prev, &trailing));
    }
    commits
}

/// Extract `N files changed, X insertions(+), Y deletions(-)` — tolerant of
/// singular/plural and of either clause being absent (absent counts are 0).
pub fn parse_stat_summary(line: &str) -> Option<CommitStats> {
    let caps = stat_summary_re().captures(line)?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(0)
    };
    Some(CommitStats {
        files: num(1),
        insertions: num(2),
        deletions: num(3),
    })
}

/// Parse one `--name-status` line: status letter, optional similarity digits,
/// then tab-separated path(s). Renames/copies carry `old<TAB>new`.
pub fn parse_name_status_line(line: &str) -> Option<CommitFile> {
    let caps = name_status_re().captures(line)?;
    let letter = caps.get(1)?.as_str().chars().next()?;
    let status = FileStatus::from_letter(letter)?;
    let similarity = caps
        .get(2)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<u8>().ok());

    let rest = caps.get(3)?.as_str();
    let (old_path, path) = match (status, rest.split_once('\t')) {
        (FileStatus::Renamed | FileStatus::Copied, Some((old, new))) => {
            (Some(old.to_string()), new.to_string())
        }
        _ => (None, rest.to_string()),
    };

    Some(CommitFile { path, status, old_path, similarity })
}

/// Parse full `--name-status` output into a file list, skipping anything
/// that does not match the grammar.
pub fn parse_name_status(output: &str) -> Vec<CommitFile> {
    output.lines().filter_map(parse_name_status_line).collect()
}

/// Parse `%H %P` lines into a hash → parents map.
pub fn parse_parent_edges(raw: &str) -> HashMap<String, Vec<String>> {
    let mut edges = HashMap::new();
    for line in raw.lines() {
        let mut tokens = line.split_whitespace();
        if let Some(hash) = tokens.next() {
            if hash_re().is_match(hash) {
                edges.insert(hash.to_string(), tokens.map(String::from).collect());
            }
        }
    }
    edges
}

// ─── GitSource implementation ───────────────────────────────────────

impl GitSource for GitLogClient {
    fn fetch_log(&self, filter: &Filter) -> Result<Option<String>> {
        self.run_git_recoverable(&log_args(filter))
    }

    fn fetch_parent_edges(&self, filter: &Filter) -> Result<HashMap<String, Vec<String>>> {
        let raw = self.run_git_recoverable(&edge_args(filter))?;
        Ok(raw.map(|r| parse_parent_edges(&r)).unwrap_or_default())
    }

    fn commit_files(&self, hash: &str) -> Result<Vec<CommitFile>> {
        let args: Vec<String> = [
            "show",
            "--name-status",
            "--pretty=format:",
            "-M",
            "-C",
            hash,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Ok(parse_name_status(&self.run_git(&args)?))
    }

    fn parent_commit(&self, hash: &str) -> Result<Option<String>> {
        let args: Vec<String> = ["rev-list", "--parents", "-n", "1", hash]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = self.run_git(&args)?;
        Ok(out
            .split_whitespace()
            .nth(1)
            .map(String::from))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let out = self.run_git(&["branch".to_string()])?;
        Ok(out
            .lines()
            .map(|l| l.trim_start_matches('*').trim())
            .filter(|l| !l.is_empty() && !l.starts_with('('))
            .map(String::from)
            .collect())
    }

    fn list_authors(&self) -> Result<Vec<String>> {
        let args = vec!["log".to_string(), "--format=%an <%ae>".to_string()];
        let out = self.run_git(&args)?;
        let mut seen = Vec::new();
        for line in out.lines() {
            let line = line.trim();
            if !line.is_empty() && !seen.iter().any(|s: &String| s == line) {
                seen.push(line.to_string());
            }
        }
        Ok(seen)
    }

    fn remote_url(&self) -> Option<String> {
        let args: Vec<String> = ["config", "--get", "remote.origin.url"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.run_git(&args)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
