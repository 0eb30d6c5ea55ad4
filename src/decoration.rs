//! Virtual URI scheme and decoration metadata for file-change tree nodes.
//!
//! A tree node is correlated with its decoration through a query-encoded
//! URI — `git-panel-file:<path>?status=<code>&oldPath=<...>` — so the
//! decoration lookup needs no side channel.

use crate::{CommitFile, FileStatus};

/// Scheme for decorated file nodes.
pub const URI_SCHEME: &str = "git-panel-file";

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(component: &str) -> String {
    component
        .replace("%3F", "?")
        .replace("%26", "&")
        .replace("%3D", "=")
        .replace("%25", "%")
}

/// Encode a changed file as a virtual URI.
#[must_use]
pub fn encode_file_uri(file: &CommitFile) -> String {
    let mut uri = format!(
        "{URI_SCHEME}:{}?status={}",
        escape(&file.path),
        file.status.letter()
    );
    if let Some(old) = &file.old_path {
        uri.push_str("&oldPath=");
        uri.push_str(&escape(old));
    }
    uri
}

/// Decode a virtual URI back into path, status, and optional old path.
/// Returns `None` for foreign schemes or malformed queries.
#[must_use]
pub fn decode_file_uri(uri: &str) -> Option<(String, FileStatus, Option<String>)> {
    let rest = uri.strip_prefix(URI_SCHEME)?.strip_prefix(':')?;
    let (path, query) = rest.split_once('?')?;

    let mut status = None;
    let mut old_path = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("status", v)) => {
                status = v.chars().next().and_then(FileStatus::from_letter);
            }
            Some(("oldPath", v)) => old_path = Some(unescape(v)),
            _ => {}
        }
    }
    Some((unescape(path), status?, old_path))
}

/// Single-character badge shown on the tree node.
#[must_use]
pub fn badge(status: FileStatus) -> char {
    status.letter()
}

/// Host theme color id for a status.
#[must_use]
pub fn theme_color(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Modified => "gitDecoration.modifiedResourceForeground",
        FileStatus::Added => "gitDecoration.addedResourceForeground",
        FileStatus::Deleted => "gitDecoration.deletedResourceForeground",
        FileStatus::Renamed | FileStatus::Copied => "gitDecoration.renamedResourceForeground",
        FileStatus::Untracked => "gitDecoration.untrackedResourceForeground",
        FileStatus::Ignored => "gitDecoration.ignoredResourceForeground",
    }
}

/// Human-readable tooltip. Renames and copies name both paths so the old
/// path is never lost in the UI.
#[must_use]
pub fn tooltip(file: &CommitFile) -> String {
    let label = match file.status {
        FileStatus::Modified => "Modified",
        FileStatus::Added => "Added",
        FileStatus::Deleted => "Deleted",
        FileStatus::Renamed => "Renamed",
        FileStatus::Copied => "Copied",
        FileStatus::Untracked => "Untracked",
        FileStatus::Ignored => "Ignored",
    };
    match &file.old_path {
        Some(old) => format!("{label}: {old} to {}", file.path),
        None => format!("{label}: {}", file.path),
    }
}
