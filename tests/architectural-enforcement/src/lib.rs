//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural
//! principles of the tracker crates:
//! - No sleep() calls in the tracker core; waits are deadlines or I/O
//! - No unwrap()/expect()/panic! in production code; errors propagate
//! - No blocking I/O on the owner or dispatcher tasks
//!
//! The helpers below are shared by the tests under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// A rule violation at a source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Resolve a path relative to the workspace root
pub fn workspace_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

/// All `.rs` files under a directory
pub fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Lines of production code: everything before the test module, with `//`
/// comments stripped
///
/// Returns `(line_number, code_part, full_line)` triples.
pub fn production_lines(content: &str) -> Vec<(usize, &str, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("mod tests"))
        .map(|(idx, line)| {
            let code_part = line.split("//").next().unwrap_or(line);
            (idx + 1, code_part, line)
        })
        .collect()
}

/// Scan every source file under `dir` for production lines matching `rule`
pub fn scan_directory<F>(dir: &Path, rule: F) -> Vec<Violation>
where
    F: Fn(&Path, &str) -> bool,
{
    let mut violations = Vec::new();
    for path in rust_sources(dir) {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => continue,
        };
        for (line, code_part, full) in production_lines(&content) {
            if rule(&path, code_part) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text: full.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Print violations and fail the test if there are any
pub fn report(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n// x.unwrap()\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].1, "");
    }

    #[test]
    fn test_workspace_path_finds_core() {
        assert!(workspace_path("tracker/core/src/lib.rs").exists());
    }
}
