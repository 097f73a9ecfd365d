//! Direct file/line snippet lookup.
//!
//! When a frame already names a file and line, the vector index is
//! bypassed entirely: the snippet is a context window read straight from
//! the repository. Resolution runs as two explicit steps, a direct join
//! under the repo root and then a basename search across the tree, because
//! trace paths usually come from the machine that produced the trace, not
//! from this checkout.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default number of context lines on each side of the target line.
pub const DEFAULT_CONTEXT_LINES: usize = 6;

/// Outcome of a file/line lookup. A miss is a value (`found: false`), not
/// an error: per-frame lookups must never abort a batch.
#[derive(Debug, Clone, Serialize)]
pub struct SnippetMatch {
    pub found: bool,
    /// Path that was read, or the path that failed to resolve
    pub path: String,
    /// The 1-based line the frame pointed at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// First line of the window (1-based, inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Last line of the window (1-based, inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SnippetMatch {
    fn missing(path: &Path) -> Self {
        Self {
            found: false,
            path: path.display().to_string(),
            line: None,
            start: None,
            end: None,
            snippet: None,
        }
    }
}

/// Extract a ±`context` line window around `line` (1-based) from `file`
/// under `repo`.
pub fn read_snippet(repo: &Path, file: &str, line: u32, context: usize) -> SnippetMatch {
    // Traces from Windows runtimes name files with backslashes.
    let normalized = file.replace('\\', "/");
    let direct = repo.join(&normalized);
    if direct.is_file() {
        return extract_window(&direct, line, context);
    }

    if let Some(located) = locate_by_basename(repo, &normalized) {
        debug!(
            "Resolved {} by basename to {}",
            normalized,
            located.display()
        );
        return extract_window(&located, line, context);
    }

    SnippetMatch::missing(&direct)
}

/// Fallback resolution step: the first file under `repo` (stable sorted
/// walk) whose basename matches the frame's file name.
pub fn locate_by_basename(repo: &Path, file: &str) -> Option<PathBuf> {
    let basename = Path::new(file).file_name()?;
    let walker = ignore::WalkBuilder::new(repo)
        .sort_by_file_name(std::ffi::OsStr::cmp)
        .build();
    for entry in walker.flatten() {
        if entry.file_type().is_some_and(|t| t.is_file()) && entry.file_name() == basename {
            return Some(entry.into_path());
        }
    }
    None
}

fn extract_window(path: &Path, line: u32, context: usize) -> SnippetMatch {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Snippet read failed for {}: {e}", path.display());
            return SnippetMatch::missing(path);
        }
    };
    let lines: Vec<&str> = content.lines().collect();
    let target = line as usize;
    if target == 0 || target > lines.len() {
        // The frame points past the end of the file as it exists here;
        // report a miss instead of a silently empty window.
        return SnippetMatch::missing(path);
    }

    let start = target.saturating_sub(context).max(1);
    let end = (target + context).min(lines.len());
    SnippetMatch {
        found: true,
        path: path.display().to_string(),
        line: Some(line),
        start: Some(start),
        end: Some(end),
        snippet: Some(lines[start - 1..end].join("\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_file(dir: &Path, name: &str, lines: usize) -> PathBuf {
        let content: String = (1..=lines).map(|i| format!("// line {i}\n")).collect();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn direct_hit_extracts_window() {
        let dir = tempfile::tempdir().unwrap();
        numbered_file(dir.path(), "File.cs", 100);

        let result = read_snippet(dir.path(), "File.cs", 42, 3);
        assert!(result.found);
        assert_eq!(result.start, Some(39));
        assert_eq!(result.end, Some(45));
        assert!(result.snippet.unwrap().contains("// line 42"));
    }

    #[test]
    fn window_clamps_at_file_start() {
        let dir = tempfile::tempdir().unwrap();
        numbered_file(dir.path(), "a.py", 10);

        let result = read_snippet(dir.path(), "a.py", 2, 6);
        assert!(result.found);
        assert_eq!(result.start, Some(1));
        assert_eq!(result.end, Some(8));
    }

    #[test]
    fn basename_fallback_finds_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        numbered_file(&nested, "Service.cs", 20);

        // The trace names a path from another machine.
        let result = read_snippet(dir.path(), r"C:\build\agent\Service.cs", 5, 2);
        assert!(result.found);
        assert!(result.path.ends_with("Service.cs"));
        assert!(result.snippet.unwrap().contains("// line 5"));
    }

    #[test]
    fn unresolvable_file_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_snippet(dir.path(), "NoSuch.cs", 1, 3);
        assert!(!result.found);
        assert!(result.snippet.is_none());
    }

    #[test]
    fn line_beyond_eof_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        numbered_file(dir.path(), "short.rs", 5);

        let result = read_snippet(dir.path(), "short.rs", 500, 6);
        assert!(!result.found);
    }
}
