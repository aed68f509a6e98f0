//! Session artifact layout and the small readers built on top of it.
//!
//! Every function here is fail-soft: a missing directory, a file deleted
//! mid-scan or unreadable content yields an empty list or a zero count.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

pub const DISCOVERED_STANDARDS_FILE: &str = "discovered-standards.md";
pub const CONTEXT_FILE: &str = "context.md";
pub const REQUIREMENTS_FILE: &str = "requirements.md";

pub const ROUNDS_DIR: &str = "rounds";
pub const ROUND_PREFIX: &str = "round";
pub const REVIEWS_DIR: &str = "reviews";
pub const DISCOURSE_FILE: &str = "discourse.md";
pub const FINAL_FILE: &str = "final.md";

pub const MAP_DIR: &str = "map";
pub const RUNS_DIR: &str = "runs";
pub const RUN_PREFIX: &str = "run";
pub const TOPOLOGY_FILE: &str = "topology.md";
pub const FLOW_ANALYSIS_FILE: &str = "flow-analysis.md";
pub const REQUIREMENTS_MAPPING_FILE: &str = "requirements-mapping.md";
pub const MAP_FILE: &str = "map.md";

/// Per-agent output directories inside a map run.
pub const FLOW_ANALYSIS_DIR: &str = "flow-analysis";
pub const REQUIREMENTS_MAPPING_DIR: &str = "requirements-mapping";

const MARKDOWN_EXT: &str = ".md";

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn findings_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(?m)^##[ \t]+(Finding|Issue|Suggestion)")
}

fn agent_name_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^(.+)-(\d+)$")
}

fn file_list_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(?s)## Canonical File List.*?```[^\n]*\n(.*?)```")
}

/// Path of `rounds/round-<n>` inside a session.
pub fn round_dir(session_path: &Path, round: u32) -> PathBuf {
    session_path
        .join(ROUNDS_DIR)
        .join(format!("{ROUND_PREFIX}-{round}"))
}

/// Path of `map/runs/run-<n>` inside a session.
pub fn run_dir(session_path: &Path, run: u32) -> PathBuf {
    session_path
        .join(MAP_DIR)
        .join(RUNS_DIR)
        .join(format!("{RUN_PREFIX}-{run}"))
}

/// Parses `<prefix>-<digits>`, returning the number.
pub fn parse_numbered_name(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lists `<prefix>-<n>` subdirectories of `parent`, ascending by `n`.
pub fn numbered_dirs(parent: &Path, prefix: &str) -> Vec<(u32, PathBuf)> {
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut dirs: Vec<(u32, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name();
            let number = parse_numbered_name(&name.to_string_lossy(), prefix)?;
            Some((number, entry.path()))
        })
        .collect();

    dirs.sort_by_key(|(number, _)| *number);
    dirs
}

/// The highest `<prefix>-<n>` directory number under `parent`.
pub fn highest_numbered(parent: &Path, prefix: &str) -> Option<u32> {
    numbered_dirs(parent, prefix).last().map(|(n, _)| *n)
}

/// File names ending in `.md` directly inside `dir`, sorted.
pub fn markdown_files(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(MARKDOWN_EXT))
        .collect();

    files.sort();
    files
}

/// Strips a trailing `.md`.
pub fn file_stem(filename: &str) -> &str {
    filename.strip_suffix(MARKDOWN_EXT).unwrap_or(filename)
}

/// Counts `## Finding` / `## Issue` / `## Suggestion` headings in a file.
pub fn count_findings(path: &Path) -> usize {
    match fs::read_to_string(path) {
        Ok(content) => count_findings_in(&content),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No findings readable");
            0
        }
    }
}

pub fn count_findings_in(content: &str) -> usize {
    findings_regex()
        .map(|re| re.find_iter(content).count())
        .unwrap_or(0)
}

/// Turns `principal-1.md` into `Principal #1` and `security.md` into `Security`.
pub fn format_agent_name(filename: &str) -> String {
    let stem = file_stem(filename);
    if let Some(caps) = agent_name_regex().and_then(|re| re.captures(stem)) {
        if let (Some(name), Some(index)) = (caps.get(1), caps.get(2)) {
            return format!("{} #{}", capitalize(name.as_str()), index.as_str());
        }
    }
    capitalize(stem)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Number of entries in a topology's canonical file list, 0 if absent.
pub fn canonical_file_count(topology_path: &Path) -> usize {
    fs::read_to_string(topology_path)
        .map(|content| canonical_file_count_in(&content))
        .unwrap_or(0)
}

pub fn canonical_file_count_in(content: &str) -> usize {
    file_list_regex()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|block| {
            block
                .as_str()
                .lines()
                .filter(|line| !line.trim().is_empty())
                .count()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_findings_mixed_headings() {
        let content = "# Review\n\n## Finding: a\ntext\n## Finding: b\n## Issue: c\n### Finding nested\n";
        assert_eq!(count_findings_in(content), 3);
    }

    #[test]
    fn test_count_findings_none_and_missing() {
        assert_eq!(count_findings_in("# Nothing here\n## Summary\n"), 0);
        let dir = TempDir::new().unwrap();
        assert_eq!(count_findings(&dir.path().join("absent.md")), 0);
    }

    #[test]
    fn test_count_findings_suggestion_only_at_line_start() {
        assert_eq!(count_findings_in("## Suggestion\n text ## Issue\n"), 1);
    }

    #[test]
    fn test_format_agent_name() {
        assert_eq!(format_agent_name("principal-1.md"), "Principal #1");
        assert_eq!(format_agent_name("security.md"), "Security");
        assert_eq!(format_agent_name("code-quality-2.md"), "Code-quality #2");
        assert_eq!(format_agent_name("quality-v.md"), "Quality-v");
        assert_eq!(format_agent_name(""), "");
    }

    #[test]
    fn test_parse_numbered_name() {
        assert_eq!(parse_numbered_name("round-3", ROUND_PREFIX), Some(3));
        assert_eq!(parse_numbered_name("run-12", RUN_PREFIX), Some(12));
        assert_eq!(parse_numbered_name("round-", ROUND_PREFIX), None);
        assert_eq!(parse_numbered_name("round-2a", ROUND_PREFIX), None);
        assert_eq!(parse_numbered_name("rounds-2", ROUND_PREFIX), None);
    }

    #[test]
    fn test_numbered_dirs_sorted_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["round-10", "round-2", "round-1", "notes"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("round-7"), "not a dir").unwrap();

        let numbers: Vec<u32> = numbered_dirs(dir.path(), ROUND_PREFIX)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(highest_numbered(dir.path(), ROUND_PREFIX), Some(10));
        assert_eq!(highest_numbered(&dir.path().join("missing"), ROUND_PREFIX), None);
    }

    #[test]
    fn test_markdown_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zeta-1.md"), "").unwrap();
        fs::write(dir.path().join("alpha-1.md"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(markdown_files(dir.path()), vec!["alpha-1.md", "zeta-1.md"]);
    }

    #[test]
    fn test_canonical_file_count() {
        let topology = "# Topology\n\n## Canonical File List\n\n```text\nsrc/a.rs\nsrc/b.rs\n\nsrc/c.rs\n```\n\n## Other\n```\nx\n```\n";
        assert_eq!(canonical_file_count_in(topology), 3);
        assert_eq!(canonical_file_count_in("## Canonical File List\nno block"), 0);
        assert_eq!(canonical_file_count_in("```\nx\n```"), 0);
    }
}
