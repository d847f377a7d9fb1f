//! Directory enumeration for watch roots.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

/// Collect every file under `root` whose root-relative path matches one of
/// `patterns`.
///
/// Entries that vanish or cannot be stat'ed mid-walk are skipped; a watched
/// tree is routinely rewritten while we enumerate it.
pub(crate) fn walk(root: &Path, patterns: &[Pattern]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };

        if metadata.is_dir() {
            let Ok(entries) = fs::read_dir(&path) else {
                continue;
            };
            stack.extend(entries.flatten().map(|entry| entry.path()));
        } else if metadata.is_file() && matches_patterns(&path, root, patterns) {
            files.push(path);
        }
    }

    files.sort();
    files
}

/// Check a path against watch patterns, relative to the watch root.
///
/// A path equal to the root (a single watched file) always matches.
pub(crate) fn matches_patterns(path: &Path, root: &Path, patterns: &[Pattern]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if relative.as_os_str().is_empty() {
        return true;
    }

    let relative = relative.to_string_lossy().replace('\\', "/");
    patterns.iter().any(|pattern| pattern.matches(&relative))
}

/// Compile glob patterns, dropping invalid ones with a warning.
pub(crate) fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "Ignoring invalid watch pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<Pattern> {
        compile_patterns(&["**/*".to_owned()])
    }

    #[test]
    fn test_walk_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/charts")).unwrap();
        fs::write(dir.path().join("entry.jsx"), "").unwrap();
        fs::write(dir.path().join("components/charts/line.jsx"), "").unwrap();

        let files = walk(dir.path(), &all());

        assert_eq!(
            files,
            vec![
                dir.path().join("components/charts/line.jsx"),
                dir.path().join("entry.jsx"),
            ]
        );
    }

    #[test]
    fn test_walk_filters_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("entry.jsx"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let files = walk(dir.path(), &compile_patterns(&["**/*.jsx".to_owned()]));

        assert_eq!(files, vec![dir.path().join("entry.jsx")]);
    }

    #[test]
    fn test_walk_missing_root() {
        assert!(walk(Path::new("/nonexistent/livedev/src"), &all()).is_empty());
    }

    #[test]
    fn test_walk_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("entry.jsx");
        fs::write(&file, "").unwrap();

        assert_eq!(walk(&file, &all()), vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_entries_that_fail_stat() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("entry.jsx"), "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        assert_eq!(walk(dir.path(), &all()), vec![dir.path().join("entry.jsx")]);
    }

    #[test]
    fn test_matches_patterns_outside_root() {
        assert!(!matches_patterns(
            Path::new("/other/entry.jsx"),
            Path::new("/project/src"),
            &all()
        ));
    }

    #[test]
    fn test_compile_patterns_drops_invalid() {
        let patterns = compile_patterns(&["**/*.jsx".to_owned(), "[".to_owned()]);
        assert_eq!(patterns.len(), 1);
    }
}
