//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: The owner task and the dispatcher task MUST NOT do blocking
//! I/O. Sink implementations do their own I/O; the tasks only move data.
//! **Exceptions**: `config.rs` (loaded before the tracker is spawned), test code.

use std::path::Path;

use architectural_enforcement::{report, scan_directory, workspace_path};

const TASK_MODULES: &[&str] = &[
    "logger.rs",
    "dispatcher.rs",
    "diff.rs",
    "debounce.rs",
    "expansion.rs",
    "gate.rs",
];

fn is_blocking_io(code: &str) -> bool {
    code.contains("std::fs::")
        || code.contains("std::net::")
        || code.contains("std::process::")
        || code.contains("std::io::stdin")
        || code.contains("blocking::")
}

fn is_task_module(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| TASK_MODULES.contains(&name))
}

#[test]
fn test_no_blocking_io_on_tracker_tasks() {
    let dir = workspace_path("tracker/core/src");
    assert!(dir.exists(), "missing {}", dir.display());

    let violations = scan_directory(&dir, |path, code| {
        is_task_module(path) && is_blocking_io(code)
    });
    report("Blocking I/O found on tracker tasks", &violations);
}

#[test]
fn test_blocking_io_detection() {
    assert!(is_blocking_io("let s = std::fs::read_to_string(p)?;"));
    assert!(!is_blocking_io("let s = tokio::fs::read_to_string(p).await?;"));
    assert!(is_task_module(Path::new("tracker/core/src/logger.rs")));
    assert!(!is_task_module(Path::new("tracker/core/src/config.rs")));
}
