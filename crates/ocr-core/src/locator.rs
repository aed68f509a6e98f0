//! Finding the session a user most likely wants to watch.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::detector::is_session_active;

/// Name of the newest active session under `sessions_dir`.
///
/// Session directories are named `<date>-<branch>`, so a descending name
/// sort puts the most recent first. Returns `None` if the directory is
/// missing or every session is closed or complete.
pub fn find_latest_active_session(sessions_dir: &Path) -> Option<String> {
    let entries = match fs::read_dir(sessions_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %sessions_dir.display(), error = %e, "Sessions directory not readable");
            return None;
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));

    names
        .into_iter()
        .find(|name| is_session_active(&sessions_dir.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_latest_active_session(&dir.path().join("sessions")), None);
    }

    #[test]
    fn test_newest_active_wins() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["2024-01-01-main", "2024-03-01-feat", "2024-02-01-fix"] {
            fs::create_dir(root.join(name)).unwrap();
        }
        fs::write(root.join("2024-03-01-feat/state.json"), r#"{"status":"closed"}"#).unwrap();
        fs::write(root.join("2024-12-31-file"), "not a session").unwrap();

        assert_eq!(
            find_latest_active_session(root),
            Some("2024-02-01-fix".to_string())
        );
    }

    #[test]
    fn test_all_inactive_is_none() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("2024-01-01-main")).unwrap();
        fs::write(
            dir.path().join("2024-01-01-main/state.json"),
            r#"{"current_phase":"complete"}"#,
        )
        .unwrap();

        assert_eq!(find_latest_active_session(dir.path()), None);
    }
}
