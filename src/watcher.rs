//! Git change monitor — raises a dirty flag when the repository state files
//! change on disk, so the next history query refetches instead of serving
//! stale cache.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

/// Fixed backoff between watcher initialization attempts.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// True for paths that signal a repository state change: HEAD, the index,
/// and anything under refs/.
fn is_git_state_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name == "HEAD" || name == "index" || name == "packed-refs" {
        return true;
    }
    path.components()
        .any(|c| c.as_os_str().to_str() == Some("refs"))
}

/// Watch `<repo>/.git` and raise `dirty` on relevant changes, debounced.
///
/// The watcher and its event loop live on a detached thread; the returned
/// result only reflects whether the watch could be established.
pub fn start_git_monitor(
    repo_path: &Path,
    dirty: Arc<AtomicBool>,
    debounce_ms: u64,
) -> notify::Result<()> {
    let git_dir = repo_path.join(".git");

    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(&git_dir, RecursiveMode::Recursive)?;

    info!(dir = %git_dir.display(), debounce_ms, "Git change monitor started");

    std::thread::spawn(move || {
        let _watcher = watcher; // keep the watcher alive with the loop
        let mut pending = false;

        loop {
            match rx.recv_timeout(Duration::from_millis(debounce_ms)) {
                Ok(Ok(event)) => {
                    if event.paths.iter().any(|p| is_git_state_path(p)) {
                        pending = true;
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Git watcher error");
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    if pending {
                        debug!("Repository changed, raising dirty flag");
                        dirty.store(true, Ordering::Release);
                        pending = false;
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    info!("Git watcher channel closed");
                    break;
                }
            }
        }
    });

    Ok(())
}

/// Start the monitor, retrying on a fixed 5-second backoff until it comes up.
/// Runs on its own thread so a missing `.git` directory never blocks startup.
pub fn spawn_git_monitor_with_retry(repo_path: PathBuf, dirty: Arc<AtomicBool>, debounce_ms: u64) {
    std::thread::spawn(move || loop {
        match start_git_monitor(&repo_path, Arc::clone(&dirty), debounce_ms) {
            Ok(()) => break,
            Err(e) => {
                warn!(error = %e, "Failed to start git monitor, retrying in 5s");
                std::thread::sleep(RETRY_DELAY);
            }
        }
    });
}
