//! Multi-tier commit store — durable hot/warm snapshots keyed by project
//! identity, persisting history across sessions.
//!
//! The hot tier holds the newest page slice and is only trusted for an hour;
//! the warm tier holds the full last-fetched page set and is served as-is
//! until replaced. Storage failures are logged and degrade to the next tier
//! (ultimately the empty graph) — they never block the git-backed path.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use git_panel::{stable_hash, Commit, CommitGraph, LogResult, Operation};

use crate::cache::now_ms;
use crate::error::{GitPanelError, Result};

/// Magic bytes identifying LZ4-compressed blobs.
pub const STORAGE_MAGIC: &[u8; 4] = b"GPLZ";

const PROJECT_INDEX_FILE: &str = "project-index.json";
const GLOBAL_CONFIG_FILE: &str = "global-config.json";
const HOT_FILE: &str = "hot-cache.bin";
const WARM_FILE: &str = "warm-cache.bin";

/// Hot-tier freshness window — coarser than the in-memory query cache.
const HOT_MAX_AGE_MS: u64 = 60 * 60 * 1000;

/// Projects untouched this long are deleted by `cleanup()`.
const STALE_PROJECT_MS: u64 = 30 * 24 * 60 * 60 * 1000;

// ─── Config ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub hot_cache_size: usize,
    pub warm_cache_size: usize,
    pub max_projects: usize,
    pub cleanup_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hot_cache_size: 50,
            warm_cache_size: 1000,
            max_projects: 10,
            cleanup_interval_ms: 60 * 60 * 1000,
        }
    }
}

/// One entry of the project index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub key: String,
    pub local_path: String,
    pub last_accessed: u64,
    pub total_commits: usize,
}

/// Hot-tier payload: the newest slice of the last fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotData {
    pub recent_commits: Vec<Commit>,
    pub active_branches: Vec<String>,
    pub operations: Vec<Operation>,
    pub last_updated: u64,
}

// ─── Project identity ───────────────────────────────────────────────

fn cred_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^(https?)://[^@/]+@").expect("static regex"))
}

fn ssh_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^git@([^:]+):").expect("static regex"))
}

/// Normalize a remote URL into a filesystem-safe project key: credentials
/// stripped, SSH form converted to https, `.git` dropped, lowercased,
/// non-alphanumeric runs collapsed to `-`.
#[must_use]
pub fn normalize_git_url(url: &str) -> String {
    let url = url.trim();
    let url = cred_re().replace(url, "$1://");
    let url = ssh_re().replace(&url, "https://$1/");
    let url = url.strip_suffix(".git").unwrap_or(&url).to_lowercase();

    let mut key = String::with_capacity(url.len());
    let mut last_dash = true; // suppress a leading dash
    for c in url.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c);
            last_dash = false;
        } else if !last_dash {
            key.push('-');
            last_dash = true;
        }
    }
    while key.ends_with('-') {
        key.pop();
    }
    key
}

/// Stable project key: the normalized remote URL when one is configured,
/// else a content hash of the local path.
#[must_use]
pub fn project_key_for(remote_url: Option<&str>, local_path: &str) -> String {
    match remote_url {
        Some(url) if !url.trim().is_empty() => normalize_git_url(url),
        _ => format!("{:016x}", stable_hash(&[local_path.as_bytes()])),
    }
}

/// Default storage base directory.
#[must_use]
pub fn storage_base() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("git-panel")
}

// ─── Compressed blob helpers ────────────────────────────────────────

/// Save a serializable value as magic bytes + LZ4-compressed bincode.
/// Atomic: writes to a temp file, then renames over the target.
pub fn save_compressed<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));
    {
        let file = fs::File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(STORAGE_MAGIC)?;
        let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
        bincode::serialize_into(&mut encoder, data)?;
        let mut writer = encoder
            .finish()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a value written by [`save_compressed`]. Any failure (absent file,
/// bad magic, corrupt payload) is a [`GitPanelError::StorageLoad`] — callers
/// treat it as a miss.
pub fn load_compressed<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let path_str = path.display().to_string();
    let storage_err = |message: String| GitPanelError::StorageLoad {
        path: path_str.clone(),
        message,
    };

    let file = fs::File::open(path).map_err(|e| storage_err(format!("cannot open: {e}")))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| storage_err(format!("read error (magic bytes): {e}")))?;
    if &magic != STORAGE_MAGIC {
        return Err(storage_err("unrecognized blob format".to_string()));
    }

    let decoder = lz4_flex::frame::FrameDecoder::new(reader);
    bincode::deserialize_from(decoder)
        .map_err(|e| storage_err(format!("deserialization failed: {e}")))
}

// ─── Store ──────────────────────────────────────────────────────────

pub struct CommitStore {
    base: PathBuf,
    config: StoreConfig,
    hot: HashMap<String, HotData>,
    index: HashMap<String, ProjectInfo>,
    project_key: String,
    local_path: String,
}

impl CommitStore {
    /// Open the store for one project, loading config, the project index, and
    /// the project's hot data if present.
    pub fn open(base: PathBuf, remote_url: Option<&str>, local_path: &str) -> Self {
        let config = load_config(&base);
        let index = load_index(&base);
        let project_key = project_key_for(remote_url, local_path);

        let mut store = Self {
            base,
            config,
            hot: HashMap::new(),
            index,
            project_key,
            local_path: local_path.to_string(),
        };
        store.preload_hot();
        store
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn project_count(&self) -> usize {
        self.index.len()
    }

    fn project_dir(&self, key: &str) -> PathBuf {
        self.base.join("projects").join(key)
    }

    fn preload_hot(&mut self) {
        let path = self.project_dir(&self.project_key).join(HOT_FILE);
        match load_compressed::<HotData>(&path) {
            Ok(hot) => {
                debug!(project = %self.project_key, "Preloaded hot data");
                self.hot.insert(self.project_key.clone(), hot);
            }
            Err(e) => debug!(error = %e, "No hot data preloaded"),
        }
    }

    /// Serve the last persisted graph: hot tier if fresh, else warm tier
    /// (refreshing the hot tier from it), else the empty graph.
    pub fn get_commits(&mut self) -> CommitGraph {
        let now = now_ms();

        if let Some(hot) = self.hot.get(&self.project_key) {
            if now.saturating_sub(hot.last_updated) < HOT_MAX_AGE_MS {
                return graph_from_hot(hot);
            }
        }

        let warm_path = self.project_dir(&self.project_key).join(WARM_FILE);
        match load_compressed::<CommitGraph>(&warm_path) {
            Ok(warm) => {
                let hot = extract_hot(&warm, self.config.hot_cache_size);
                let hot_path = self.project_dir(&self.project_key).join(HOT_FILE);
                if let Err(e) = save_compressed(&hot_path, &hot) {
                    warn!(error = %e, "Failed to refresh hot tier");
                }
                self.hot.insert(self.project_key.clone(), hot);
                warm
            }
            Err(e) => {
                debug!(error = %e, "No warm data");
                CommitGraph::empty()
            }
        }
    }

    /// Persist a fetched graph to both tiers and touch the project index.
    /// Memory is updated first; disk failures are logged, not retried.
    pub fn save_commits(&mut self, graph: &CommitGraph) {
        let key = self.project_key.clone();

        self.index.insert(
            key.clone(),
            ProjectInfo {
                key: key.clone(),
                local_path: self.local_path.clone(),
                last_accessed: now_ms(),
                total_commits: graph.log_result.total,
            },
        );
        if let Err(e) = save_index(&self.base, &self.index) {
            warn!(error = %e, "Failed to save project index");
        }

        let hot = extract_hot(graph, self.config.hot_cache_size);
        self.hot.insert(key.clone(), hot.clone());
        if let Err(e) = save_compressed(&self.project_dir(&key).join(HOT_FILE), &hot) {
            warn!(error = %e, "Failed to save hot tier");
        }
        if let Err(e) = save_compressed(&self.project_dir(&key).join(WARM_FILE), graph) {
            warn!(error = %e, "Failed to save warm tier");
        }

        info!(project = %key, total = graph.log_result.total, "Saved commits");
    }

    /// Drop everything stored for the current project.
    pub fn clear_commits(&mut self) {
        let key = self.project_key.clone();
        self.remove_project(&key);
        if let Err(e) = save_index(&self.base, &self.index) {
            warn!(error = %e, "Failed to save project index");
        }
        info!(project = %key, "Cleared commits");
    }

    /// Delete projects untouched for 30 days, then trim the index to
    /// `max_projects` by least-recently-accessed eviction. Idempotent.
    pub fn cleanup(&mut self) {
        let now = now_ms();
        let mut removed = 0usize;

        let stale: Vec<String> = self
            .index
            .iter()
            .filter(|(_, info)| now.saturating_sub(info.last_accessed) > STALE_PROJECT_MS)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.remove_project(&key);
            removed += 1;
        }

        if self.index.len() > self.config.max_projects {
            let mut by_access: Vec<(String, u64)> = self
                .index
                .iter()
                .map(|(key, info)| (key.clone(), info.last_accessed))
                .collect();
            by_access.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (key, _) in by_access.into_iter().skip(self.config.max_projects) {
                self.remove_project(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            if let Err(e) = save_index(&self.base, &self.index) {
                warn!(error = %e, "Failed to save project index");
            }
            info!(removed, "Cleaned up projects");
        }
    }

    fn remove_project(&mut self, key: &str) {
        self.hot.remove(key);
        self.index.remove(key);
        let dir = self.project_dir(key);
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, project = %key, "Failed to delete project data");
            }
        }
    }
}

// ─── Tier conversion ────────────────────────────────────────────────

fn extract_hot(graph: &CommitGraph, hot_size: usize) -> HotData {
    HotData {
        recent_commits: graph
            .log_result
            .commits
            .iter()
            .take(hot_size)
            .cloned()
            .collect(),
        active_branches: graph.branches.clone(),
        operations: graph.operations.iter().take(hot_size).cloned().collect(),
        last_updated: now_ms(),
    }
}

fn graph_from_hot(hot: &HotData) -> CommitGraph {
    CommitGraph {
        operations: hot.operations.clone(),
        branches: hot.active_branches.clone(),
        log_result: LogResult {
            total: hot.recent_commits.len(),
            commits: hot.recent_commits.clone(),
        },
    }
}

// ─── Index and config files ─────────────────────────────────────────

fn load_config(base: &Path) -> StoreConfig {
    let path = base.join(GLOBAL_CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Malformed global config, using defaults");
                StoreConfig::default()
            }
        },
        Err(_) => {
            let config = StoreConfig::default();
            if let Err(e) = write_json(&path, &config) {
                debug!(error = %e, "Could not write default config");
            }
            config
        }
    }
}

fn load_index(base: &Path) -> HashMap<String, ProjectInfo> {
    let path = base.join(PROJECT_INDEX_FILE);
    match fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str::<Vec<ProjectInfo>>(&data) {
            Ok(projects) => projects.into_iter().map(|p| (p.key.clone(), p)).collect(),
            Err(e) => {
                warn!(error = %e, "Malformed project index, starting empty");
                HashMap::new()
            }
        },
        Err(_) => HashMap::new(),
    }
}

fn save_index(base: &Path, index: &HashMap<String, ProjectInfo>) -> Result<()> {
    let mut projects: Vec<&ProjectInfo> = index.values().collect();
    projects.sort_by(|a, b| a.key.cmp(&b.key));
    write_json(&base.join(PROJECT_INDEX_FILE), &projects)
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
