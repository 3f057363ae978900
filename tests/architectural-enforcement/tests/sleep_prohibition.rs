//! Integration Test: Sleep Prohibition
//!
//! **Policy**: The tracker core MUST NOT call sleep methods. Debouncing is a
//! deadline awaited with `sleep_until` inside `select!`, so a new command can
//! always interrupt it.
//! **Exceptions**: test code; the replay tool's scripted waits.

use architectural_enforcement::{report, scan_directory, workspace_path};

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("thread::sleep")
}

/// Test that the tracker core does not contain sleep() calls
#[test]
fn test_no_sleep_in_tracker_core() {
    let dir = workspace_path("tracker/core/src");
    assert!(dir.exists(), "missing {}", dir.display());

    let violations = scan_directory(&dir, |_, code| is_sleep_call(code));
    report(
        "Sleep calls found in tracker core (await a deadline instead)",
        &violations,
    );
}

/// The replay tool may wait for scripted time, but never block a thread
#[test]
fn test_no_thread_sleep_in_replay() {
    let dir = workspace_path("tracker/replay/src");
    assert!(dir.exists(), "missing {}", dir.display());

    let violations = scan_directory(&dir, |_, code| code.contains("thread::sleep"));
    report("Blocking sleep found in replay tool", &violations);
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep_call("    tokio::time::sleep(Duration::from_millis(10)).await;"));
    assert!(is_sleep_call("    std::thread::sleep(d);"));
    assert!(!is_sleep_call(
        "        Some(deadline) => tokio::time::sleep_until(deadline).await,"
    ));
}
