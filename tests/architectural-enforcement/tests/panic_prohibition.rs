//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code in the tracker crates MUST NOT unwrap, expect
//! or panic. Reporting is best-effort and handle methods return
//! `TrackerError`; a panic on the owner task would silently stop tracking.
//! **Exceptions**: test code (the `mod tests` block).

use architectural_enforcement::{report, scan_directory, workspace_path};

fn is_panicking_call(code: &str) -> bool {
    code.contains(".unwrap()")
        || code.contains(".expect(")
        || code.contains("panic!(")
        || code.contains("unreachable!(")
        || code.contains("todo!(")
}

#[test]
fn test_no_panics_in_tracker_core() {
    let dir = workspace_path("tracker/core/src");
    assert!(dir.exists(), "missing {}", dir.display());

    let violations = scan_directory(&dir, |_, code| is_panicking_call(code));
    report("Panicking calls found in tracker core", &violations);
}

#[test]
fn test_no_panics_in_replay() {
    let dir = workspace_path("tracker/replay/src");
    assert!(dir.exists(), "missing {}", dir.display());

    let violations = scan_directory(&dir, |_, code| is_panicking_call(code));
    report("Panicking calls found in replay tool", &violations);
}

#[test]
fn test_panic_detection() {
    assert!(is_panicking_call("let x = y.unwrap();"));
    assert!(is_panicking_call("let x = y.expect(\"msg\");"));
    assert!(!is_panicking_call("let x = y.unwrap_or(500);"));
    assert!(!is_panicking_call("let x = y.unwrap_or_default();"));
}
