//! Topology classification — projects built commits into rendering
//! operations, plus deterministic branch color assignment for the
//! visualization layer (kept separate from the graph logic).

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use git_panel::{Commit, Operation, OperationKind, FALLBACK_BRANCH};

/// Classify every commit of a built graph into an [`Operation`].
///
/// `branch_changed` is true for root commits and for commits where any
/// in-set parent resolved to a different branch. Merges report the resolved
/// branches of all parents after the first as `source_branches` and their own
/// branch as `target_branch`; a non-merge commit whose branch diverged from
/// its first parent's reports that parent's branch as `target_branch` so the
/// renderer can draw a branch-switch marker.
pub fn classify(commits: &[Commit]) -> Vec<Operation> {
    let branch_of: HashMap<&str, &str> = commits
        .iter()
        .filter_map(|c| c.resolved_branch.as_deref().map(|b| (c.hash.as_str(), b)))
        .collect();

    commits
        .iter()
        .map(|commit| {
            let own = commit.resolved_branch.as_deref().unwrap_or(FALLBACK_BRANCH);

            let branch_changed = commit.parent_hashes.is_empty()
                || commit
                    .parent_hashes
                    .iter()
                    .any(|p| branch_of.get(p.as_str()).is_some_and(|b| *b != own));

            if commit.is_merge {
                let mut sources: Vec<String> = Vec::new();
                for parent in commit.parent_hashes.iter().skip(1) {
                    if let Some(&b) = branch_of.get(parent.as_str()) {
                        if !sources.iter().any(|s| s == b) {
                            sources.push(b.to_string());
                        }
                    }
                }
                Operation {
                    kind: OperationKind::Merge,
                    branch: own.to_string(),
                    hash: commit.hash.clone(),
                    message: commit.message.clone(),
                    branch_changed,
                    source_branches: Some(sources),
                    target_branch: Some(own.to_string()),
                }
            } else {
                let target_branch = if branch_changed {
                    commit
                        .parent_hashes
                        .first()
                        .and_then(|p| branch_of.get(p.as_str()))
                        .map(|b| (*b).to_string())
                } else {
                    None
                };
                Operation {
                    kind: OperationKind::Commit,
                    branch: own.to_string(),
                    hash: commit.hash.clone(),
                    message: commit.message.clone(),
                    branch_changed,
                    source_branches: None,
                    target_branch,
                }
            }
        })
        .collect()
}

// ─── Branch colors ──────────────────────────────────────────────────

const GOLDEN_RATIO: f64 = 0.618033988749895;

struct ColorState {
    colors: HashMap<String, String>,
    counter: u64,
}

fn color_state() -> &'static Mutex<ColorState> {
    static STATE: OnceLock<Mutex<ColorState>> = OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(ColorState {
            colors: HashMap::new(),
            counter: 0,
        })
    })
}

/// Stable HSL color for a branch name.
///
/// Base hue comes from a content hash of the name; a golden-ratio counter
/// increment spreads sequentially first-seen branches apart on the hue wheel.
/// Assignments are cached for the process lifetime, so repeated lookups are
/// idempotent and colors stay stable across refreshes.
pub fn branch_color(name: &str) -> String {
    let mut state = color_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(color) = state.colors.get(name) {
        return color.clone();
    }

    let mut hash: i32 = 0;
    for ch in name.chars() {
        hash = (ch as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    let base_hue = (hash.unsigned_abs() % 360) as f64;
    let hue = (base_hue + state.counter as f64 * GOLDEN_RATIO * 360.0) % 360.0;
    state.counter += 1;

    let color = format!("hsl({}, 75%, 50%)", hue.round() as u32);
    state.colors.insert(name.to_string(), color.clone());
    color
}
