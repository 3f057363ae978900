//! End-to-end tests for the visibility pipeline
//!
//! These tests drive a spawned owner task through its handle with a paused
//! tokio clock and check what reaches the sink. Tests cover:
//! - Debounce timing of ticks
//! - Gate decisions (undecided, closed, open)
//! - The final batch on stop
//! - Expansion reporting and item lifecycle
//! - Best-effort delivery when the sink fails

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::Instant;

use visibility_core::{
    placement, BarState, Candidate, GateDecision, ItemKey, RecordingSink, SinkCall,
    StaticSource, TrackerConfig, VisibilityLogger, VisibilityLoggerHandle,
};

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    handle: VisibilityLoggerHandle,
    source: Arc<StaticSource>,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(items: Vec<Candidate>) -> Self {
        let source = Arc::new(StaticSource::with_items(items));
        let sink = Arc::new(RecordingSink::new());
        let (handle, _task) =
            VisibilityLogger::spawn(source.clone(), sink.clone(), &TrackerConfig::default());
        Self {
            handle,
            source,
            sink,
        }
    }

    async fn open(&self) {
        self.handle.set_dozing(false).expect("running");
        self.handle.set_panel_expanded(true).expect("running");
        self.handle.flush().await.expect("running");
    }

    async fn signal_after(&self, ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        self.handle.on_possible_change().expect("running");
        self.handle.flush().await.expect("running");
    }
}

fn main_area(key: &str) -> Candidate {
    Candidate::new(key, true, Some(placement::MAIN_AREA))
}

fn hidden(key: &str) -> Candidate {
    Candidate::new(key, false, Some(placement::BOTTOM_HIDDEN))
}

fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

// =============================================================================
// Debounce
// =============================================================================

/// After a tick at t=0, signals at 100, 200 and 300 ms produce exactly one
/// tick at t=500 that sees the latest list.
#[tokio::test(start_paused = true)]
async fn test_signals_within_interval_coalesce_into_one_tick() {
    let h = Harness::new(vec![main_area("a")]);
    let t0 = Instant::now();
    h.open().await;

    let status = h.handle.status().await.expect("running");
    assert_eq!(status.ticks, 1);
    assert_eq!(status.last_tick, Some(t0));

    h.source.set_items(vec![main_area("a"), main_area("b")]);
    h.signal_after(100).await;
    h.signal_after(100).await;
    h.source
        .set_items(vec![main_area("a"), main_area("b"), main_area("c")]);
    h.signal_after(100).await;

    let status = h.handle.status().await.expect("running");
    assert_eq!(status.ticks, 1);
    assert!(status.tick_pending);
    assert_eq!(status.coalesced_signals, 2);

    tokio::time::advance(Duration::from_millis(199)).await;
    h.handle.flush().await.expect("running");
    assert_eq!(h.handle.status().await.expect("running").ticks, 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    h.handle.flush().await.expect("running");

    let status = h.handle.status().await.expect("running");
    assert_eq!(status.ticks, 2);
    assert!(!status.tick_pending);
    assert_eq!(status.last_tick, Some(t0 + Duration::from_millis(500)));
    assert_eq!(
        h.sink.visibility_batches(),
        vec![(keys(&["a"]), vec![]), (keys(&["b", "c"]), vec![])]
    );
}

/// A signal long after the last tick runs immediately.
#[tokio::test(start_paused = true)]
async fn test_signal_after_quiet_period_ticks_immediately() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;

    h.source.set_items(vec![hidden("a")]);
    let before = Instant::now() + Duration::from_secs(2);
    h.signal_after(2_000).await;

    let status = h.handle.status().await.expect("running");
    assert_eq!(status.ticks, 2);
    assert_eq!(status.last_tick, Some(before));
    assert_eq!(
        h.sink.visibility_batches(),
        vec![(keys(&["a"]), vec![]), (vec![], keys(&["a"]))]
    );
}

/// Ticks with no transitions make no sink call.
#[tokio::test(start_paused = true)]
async fn test_unchanged_list_reports_nothing() {
    let h = Harness::new(vec![main_area("a"), hidden("b")]);
    h.open().await;

    h.signal_after(600).await;
    h.signal_after(600).await;

    assert_eq!(h.handle.status().await.expect("running").ticks, 3);
    assert_eq!(h.sink.visibility_batches().len(), 1);
}

/// Reordering changes ranks but is not a visibility transition.
#[tokio::test(start_paused = true)]
async fn test_outputs_are_disjoint_and_rank_ordered() {
    let h = Harness::new(vec![main_area("c"), main_area("a"), main_area("b")]);
    h.open().await;

    h.source
        .set_items(vec![main_area("b"), hidden("c"), main_area("d"), main_area("a")]);
    h.signal_after(500).await;

    let batches = h.sink.visibility_batches();
    assert_eq!(batches[0], (keys(&["c", "a", "b"]), vec![]));
    assert_eq!(batches[1], (keys(&["d"]), keys(&["c"])));
    for (newly, gone) in &batches {
        assert!(newly.iter().all(|k| !gone.contains(k)));
    }
}

// =============================================================================
// Gate
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_dozing_before_panel_is_undecided() {
    let h = Harness::new(vec![main_area("a")]);

    let decision = h.handle.set_dozing(true).expect("running");
    h.handle.on_possible_change().expect("running");
    h.handle.flush().await.expect("running");

    assert_eq!(decision, GateDecision::Undecided);
    assert!(!h.handle.status().await.expect("running").started);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_closed_gate_dispatches_nothing() {
    let h = Harness::new(vec![main_area("a"), main_area("b")]);

    assert_eq!(
        h.handle.set_panel_expanded(true).expect("running"),
        GateDecision::Undecided
    );
    assert_eq!(
        h.handle.set_dozing(true).expect("running"),
        GateDecision::Closed { lockscreen: false }
    );
    h.signal_after(1_000).await;

    assert_eq!(h.handle.status().await.expect("running").ticks, 0);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_panel_shown_carries_lockscreen_and_items() {
    let h = Harness::new(vec![main_area("a"), hidden("b")]);
    h.handle.set_bar_state(BarState::Keyguard);
    h.open().await;

    let calls = h.sink.calls();
    assert_eq!(
        calls[0],
        SinkCall::PanelShown {
            lockscreen: true,
            items: vec![ItemKey::new("a"), ItemKey::new("b")],
        }
    );
    assert!(matches!(calls[1], SinkCall::VisibilityChanges { .. }));
    assert_eq!(
        calls[2],
        SinkCall::Shown {
            keys: vec![ItemKey::new("a")]
        }
    );
}

/// The bar state is only read on the next gate evaluation.
#[tokio::test(start_paused = true)]
async fn test_bar_state_does_not_reevaluate_gate() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;
    h.sink.take();

    h.handle.set_bar_state(BarState::ShadeLocked);
    h.handle.flush().await.expect("running");
    assert!(h.sink.calls().is_empty());

    h.handle.set_panel_expanded(true).expect("running");
    h.handle.flush().await.expect("running");
    assert_eq!(
        h.sink.calls(),
        vec![SinkCall::PanelShown {
            lockscreen: true,
            items: vec![ItemKey::new("a")],
        }]
    );
}

// =============================================================================
// Stop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_emits_single_final_batch() {
    let h = Harness::new(vec![main_area("a"), main_area("b"), hidden("c")]);
    h.open().await;

    // Pending tick is cancelled by the stop
    h.source.set_items(vec![main_area("c")]);
    h.handle.on_possible_change().expect("running");
    h.handle.set_dozing(true).expect("running");
    h.handle.set_panel_expanded(false).expect("running");
    h.handle.flush().await.expect("running");
    tokio::time::advance(Duration::from_secs(1)).await;
    h.handle.flush().await.expect("running");

    let status = h.handle.status().await.expect("running");
    assert!(!status.started);
    assert_eq!(status.visible, 0);
    assert_eq!(status.ticks, 1);
    assert_eq!(
        h.sink.visibility_batches(),
        vec![(keys(&["a", "b"]), vec![]), (vec![], keys(&["a", "b"]))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_reports_items_as_newly_visible_again() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;
    h.handle.set_panel_expanded(false).expect("running");
    h.handle.set_panel_expanded(true).expect("running");
    h.handle.flush().await.expect("running");
    assert_eq!(h.sink.visibility_batches().len(), 2);

    // The synthetic signal on restart is still debounced
    tokio::time::advance(Duration::from_millis(500)).await;
    h.handle.flush().await.expect("running");

    assert_eq!(
        h.sink.visibility_batches(),
        vec![
            (keys(&["a"]), vec![]),
            (vec![], keys(&["a"])),
            (keys(&["a"]), vec![]),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_nothing_visible_reports_nothing() {
    let h = Harness::new(vec![hidden("a")]);
    h.open().await;
    h.handle.set_dozing(true).expect("running");
    h.handle.flush().await.expect("running");

    assert!(h.sink.visibility_batches().is_empty());
}

// =============================================================================
// Expansion
// =============================================================================

/// An expansion change made between ticks is reported by the next tick.
#[tokio::test(start_paused = true)]
async fn test_expansion_reported_with_location_ordinal() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;

    h.handle
        .on_expansion_changed("a", true, true)
        .expect("running");
    h.signal_after(500).await;

    // Repeating the same value is not a transition
    h.handle
        .on_expansion_changed("a", false, true)
        .expect("running");
    h.signal_after(500).await;

    assert_eq!(
        h.sink.expansion_events(),
        vec![("a".to_string(), true, true, 3)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_collapsed_item_is_never_reported_first() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;

    h.handle
        .on_expansion_changed("a", true, false)
        .expect("running");
    h.signal_after(500).await;

    assert!(h.sink.expansion_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_entry_lifecycle_resets_expansion_state() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;
    h.handle
        .on_expansion_changed("a", true, true)
        .expect("running");
    h.signal_after(500).await;

    // Replaced upstream: the next tick reports it again
    h.handle.on_entry_updated("a").expect("running");
    h.signal_after(500).await;
    assert_eq!(h.sink.expansion_events().len(), 2);

    h.handle.on_entry_removed("a").expect("running");
    h.handle.flush().await.expect("running");
    let status = h.handle.status().await.expect("running");
    assert_eq!(status.tracked_expansions, 0);
}

// =============================================================================
// Delivery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sink_failures_do_not_stop_tracking() {
    let h = Harness::new(vec![main_area("a")]);
    h.sink.set_failing(true);
    h.open().await;
    h.sink.set_failing(false);

    h.source.set_items(vec![main_area("a"), main_area("b")]);
    h.signal_after(500).await;

    let status = h.handle.status().await.expect("running");
    assert!(status.started);
    // panel shown, batch and mark_shown all failed
    assert_eq!(status.dispatch.failed, 3);
    assert_eq!(h.sink.failures(), 3);
    assert_eq!(h.sink.visibility_batches(), vec![(keys(&["b"]), vec![])]);
}

#[tokio::test(start_paused = true)]
async fn test_item_error_is_forwarded() {
    let h = Harness::new(vec![]);
    h.handle
        .on_item_error("a", "failed to inflate")
        .expect("running");
    h.handle.flush().await.expect("running");

    assert_eq!(
        h.sink.calls(),
        vec![SinkCall::ItemError {
            key: ItemKey::new("a"),
            message: "failed to inflate".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_final_batch_and_closes() {
    let h = Harness::new(vec![main_area("a")]);
    h.open().await;

    h.handle.shutdown().await.expect("running");

    assert_eq!(
        h.sink.visibility_batches(),
        vec![(keys(&["a"]), vec![]), (vec![], keys(&["a"]))]
    );
    assert!(h.handle.flush().await.is_err());
}
