//! Commit graph builder — DAG assembly and best-effort branch inference.
//!
//! Ref decorations only exist on a minority of commits (branch tips), so a
//! coherent visualization needs a branch label painted across intermediate
//! commits. The builder seeds labels from decorations and propagates them to
//! a fixed point along DAG edges. This is a heuristic, not ground truth —
//! Git does not record which branch a commit belonged to once merged.

use std::collections::HashMap;

use git_panel::{branch_candidates, Commit, FALLBACK_BRANCH};

pub mod classify;

/// Seeding tie-break when one commit carries several branch decorations.
pub const PRIORITY_BRANCHES: [&str; 3] = ["master", "main", "develop"];

/// Result of [`build_graph`]: commits with derived fields populated, plus the
/// deduplicated branch list in first-observed order.
pub struct BuiltGraph {
    pub commits: Vec<Commit>,
    pub branches: Vec<String>,
}

/// Pick one branch from a commit's decoration candidates: a priority branch
/// if present (checked in fixed order), else the first in decoration order.
fn pick_candidate(candidates: &[String]) -> String {
    for priority in PRIORITY_BRANCHES {
        if let Some(hit) = candidates.iter().find(|c| c.as_str() == priority) {
            return hit.clone();
        }
    }
    candidates
        .first()
        .cloned()
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string())
}

/// Build the commit DAG and infer a branch label for every commit.
///
/// `parent_edges` comes from the wide `%H %P` query and takes precedence over
/// the parents parsed from the page itself; a commit absent from the edge map
/// keeps its parsed parents so a failed edge query degrades gracefully.
///
/// After this returns, every commit has `resolved_branch` set and the branch
/// list is non-empty (seeded with [`FALLBACK_BRANCH`] when no decoration was
/// observed anywhere).
pub fn build_graph(
    mut commits: Vec<Commit>,
    parent_edges: &HashMap<String, Vec<String>>,
) -> BuiltGraph {
    let index: HashMap<String, usize> = commits
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash.clone(), i))
        .collect();

    // Attach lineage and reset derived fields.
    for commit in commits.iter_mut() {
        if let Some(parents) = parent_edges.get(&commit.hash) {
            commit.parent_hashes = parents.clone();
        }
        commit.is_merge = commit.parent_hashes.len() > 1;
        commit.child_hashes.clear();
        commit.resolved_branch = None;
    }

    // Second pass: child back-references, deduplicated.
    for i in 0..commits.len() {
        let child_hash = commits[i].hash.clone();
        let parents = commits[i].parent_hashes.clone();
        for parent in &parents {
            if let Some(&pi) = index.get(parent) {
                let children = &mut commits[pi].child_hashes;
                if !children.contains(&child_hash) {
                    children.push(child_hash.clone());
                }
            }
        }
    }

    // Seed branch labels from ref decorations; collect the global branch set.
    let mut branches: Vec<String> = Vec::new();
    for commit in commits.iter_mut() {
        let candidates = branch_candidates(&commit.refs);
        for name in &candidates {
            if !branches.contains(name) {
                branches.push(name.clone());
            }
        }
        if !candidates.is_empty() {
            commit.resolved_branch = Some(pick_candidate(&candidates));
        }
    }
    if branches.is_empty() {
        branches.push(FALLBACK_BRANCH.to_string());
    }

    // Fixed-point propagation: an unresolved commit inherits its first
    // resolved child's branch, else its first resolved parent's. The pass
    // count is capped by the commit count so termination holds even if the
    // monotonic-progress assumption ever breaks.
    let max_passes = commits.len();
    for _ in 0..max_passes {
        let mut changed = false;
        for i in 0..commits.len() {
            if commits[i].resolved_branch.is_some() {
                continue;
            }
            let inherited = commits[i]
                .child_hashes
                .iter()
                .filter_map(|h| index.get(h))
                .find_map(|&j| commits[j].resolved_branch.clone())
                .or_else(|| {
                    commits[i]
                        .parent_hashes
                        .iter()
                        .filter_map(|h| index.get(h))
                        .find_map(|&j| commits[j].resolved_branch.clone())
                });
            if let Some(branch) = inherited {
                commits[i].resolved_branch = Some(branch);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Disconnected fragments get the first global branch — attribution may be
    // wrong, but every commit must carry a label for rendering.
    for commit in commits.iter_mut() {
        if commit.resolved_branch.is_none() {
            commit.resolved_branch = Some(branches[0].clone());
        }
    }

    BuiltGraph { commits, branches }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
