//! Filesystem watchers feeding the watch loop.
//!
//! `notify` delivers events on its own thread. The callbacks here only
//! classify and forward into a tokio channel; all real work happens on the
//! loop.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::error::{ProgressError, Result};

/// What a watcher saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something changed inside the focused session.
    SessionChanged,
    /// Something changed directly under the sessions root.
    RootChanged,
    /// A new session directory appeared under the sessions root.
    SessionCreated(String),
}

/// True if `path` is at most `depth` directories below `root`.
///
/// Files count at the level of their directory, so with depth 4
/// `map/runs/run-1/flow-analysis/a.md` is in range.
pub fn within_depth(root: &Path, path: &Path, depth: usize) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => relative.components().count() <= depth + 1,
        Err(_) => false,
    }
}

/// Our own reads show up as access events on some platforms.
fn is_relevant(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

/// Maps an event under the focused session to a refresh, if it is in range.
///
/// `roots` are equivalent spellings of the session directory.
pub fn classify_session_event(roots: &[PathBuf], depth: usize, event: &Event) -> Option<WatchEvent> {
    if !is_relevant(event) {
        return None;
    }
    event
        .paths
        .iter()
        .any(|path| roots.iter().any(|root| within_depth(root, path, depth)))
        .then_some(WatchEvent::SessionChanged)
}

/// Maps an event under the sessions root.
///
/// A directory created directly under the root is a new session; anything
/// else is a plain refresh.
pub fn classify_root_event(roots: &[PathBuf], event: &Event) -> Option<WatchEvent> {
    if !is_relevant(event) {
        return None;
    }

    if matches!(event.kind, EventKind::Create(_)) {
        let created = event.paths.iter().find(|path| {
            path.parent()
                .is_some_and(|parent| roots.iter().any(|root| root == parent))
                && path.is_dir()
        });
        if let Some(name) = created.and_then(|path| path.file_name()) {
            return Some(WatchEvent::SessionCreated(name.to_string_lossy().into_owned()));
        }
    }

    Some(WatchEvent::RootChanged)
}

/// The watched path plus its canonical form, which some backends report.
fn event_roots(path: &Path) -> Vec<PathBuf> {
    let mut roots = vec![path.to_path_buf()];
    if let Ok(canonical) = path.canonicalize() {
        if canonical != path {
            roots.push(canonical);
        }
    }
    roots
}

fn watch_error(path: &Path) -> impl FnOnce(notify::Error) -> ProgressError + '_ {
    move |source| ProgressError::Watch {
        path: path.to_path_buf(),
        source,
    }
}

/// Watches a session directory tree recursively.
///
/// Dropping the returned watcher stops it.
pub fn watch_session(
    session: &Path,
    depth: usize,
    tx: UnboundedSender<WatchEvent>,
) -> Result<RecommendedWatcher> {
    let roots = event_roots(session);
    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(event) = classify_session_event(&roots, depth, &event) {
                    let _ = tx.send(event);
                }
            }
            Err(e) => debug!(error = %e, "Session watcher error"),
        })
        .map_err(watch_error(session))?;

    watcher
        .watch(session, RecursiveMode::Recursive)
        .map_err(watch_error(session))?;
    info!(session = %session.display(), depth, "Watching session");
    Ok(watcher)
}

/// Watches the sessions root for new sessions, non-recursively.
pub fn watch_sessions_root(
    root: &Path,
    tx: UnboundedSender<WatchEvent>,
) -> Result<RecommendedWatcher> {
    let roots = event_roots(root);
    let mut watcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(event) = classify_root_event(&roots, &event) {
                    let _ = tx.send(event);
                }
            }
            Err(e) => debug!(error = %e, "Sessions root watcher error"),
        })
        .map_err(watch_error(root))?;

    watcher
        .watch(root, RecursiveMode::NonRecursive)
        .map_err(watch_error(root))?;
    info!(root = %root.display(), "Watching sessions root");
    Ok(watcher)
}
