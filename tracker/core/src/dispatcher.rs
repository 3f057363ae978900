//! Async Dispatcher
//!
//! Moves outbound reports off the owner task. Each report is an immutable
//! snapshot queued on an unbounded channel and delivered by a single tokio
//! task, one at a time, in submission order.
//!
//! # Delivery Contract
//!
//! - FIFO per dispatcher
//! - never runs on the submitting task
//! - failures are logged and dropped: no retry, nothing reported back
//! - no timeout; a slow sink only delays the queue behind it
//!
//! ```text
//!   owner task ──submit──► [ queue ] ──► delivery task ──► ExternalSink
//!                                           │
//!                                           └─► DispatchStats
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::expansion::ExpansionChange;
use crate::record::{ItemKey, VisibilityRecord};
use crate::sink::ExternalSink;

/// An outbound report
#[derive(Clone, Debug)]
pub enum Outbound {
    /// Visibility transitions from one tick
    VisibilityBatch {
        /// Newly visible records
        newly_visible: Vec<VisibilityRecord>,
        /// No longer visible records
        no_longer_visible: Vec<VisibilityRecord>,
    },
    /// A single expansion transition
    Expansion(ExpansionChange),
    /// The hosting panel was shown
    PanelShown {
        /// Whether the lock screen was showing
        lockscreen: bool,
        /// Items in rank order
        items: Vec<ItemKey>,
    },
    /// An item failed to load
    ItemError {
        /// Item key
        key: ItemKey,
        /// Error message
        message: String,
    },
}

impl Outbound {
    fn kind(&self) -> &'static str {
        match self {
            Self::VisibilityBatch { .. } => "visibility",
            Self::Expansion(_) => "expansion",
            Self::PanelShown { .. } => "panel_shown",
            Self::ItemError { .. } => "item_error",
        }
    }
}

enum Envelope {
    Event(Outbound),
    Flush(oneshot::Sender<()>),
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    /// Reports accepted by `submit`
    pub submitted: u64,
    /// Sink calls that succeeded
    pub delivered: u64,
    /// Sink calls that failed and were dropped
    pub failed: u64,
}

impl DispatchStats {
    /// Copy the current counters
    #[must_use]
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, ok: bool) {
        if ok {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// FIFO best-effort delivery to an [`ExternalSink`]
pub struct AsyncDispatcher {
    tx: mpsc::UnboundedSender<Envelope>,
    stats: Arc<DispatchStats>,
    task: JoinHandle<()>,
}

impl AsyncDispatcher {
    /// Start the delivery task on the current tokio runtime
    #[must_use]
    pub fn spawn(sink: Arc<dyn ExternalSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());
        let task = tokio::spawn(deliver_loop(sink, rx, Arc::clone(&stats)));
        Self { tx, stats, task }
    }

    /// Queue a report; never blocks
    ///
    /// Returns false if the delivery task is gone (the report is dropped).
    pub fn submit(&self, event: Outbound) -> bool {
        let kind = event.kind();
        if self.tx.send(Envelope::Event(event)).is_err() {
            tracing::warn!(kind, "Dispatcher closed, dropping report");
            return false;
        }
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Ask to be told once everything queued so far has been handed to the sink
    pub fn flush_with(&self, done: oneshot::Sender<()>) {
        if let Err(mpsc::error::SendError(Envelope::Flush(done))) =
            self.tx.send(Envelope::Flush(done))
        {
            let _ = done.send(());
        }
    }

    /// Wait until everything queued so far has been handed to the sink
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.flush_with(done_tx);
        let _ = done_rx.await;
    }

    /// Delivery counters
    #[must_use]
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver what is queued, then stop the delivery task
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Dispatcher task ended abnormally");
        }
    }
}

impl std::fmt::Debug for AsyncDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDispatcher")
            .field("stats", &self.stats.snapshot())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

async fn deliver_loop(
    sink: Arc<dyn ExternalSink>,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    stats: Arc<DispatchStats>,
) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Event(event) => deliver(sink.as_ref(), event, &stats).await,
            Envelope::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Dispatcher queue closed");
}

async fn deliver(sink: &dyn ExternalSink, event: Outbound, stats: &DispatchStats) {
    match event {
        Outbound::VisibilityBatch {
            newly_visible,
            no_longer_visible,
        } => {
            let result = sink
                .report_visibility_changes(&newly_visible, &no_longer_visible)
                .await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Failed to report visibility changes");
            }
            stats.record(result.is_ok());

            if !newly_visible.is_empty() {
                let keys: Vec<ItemKey> = newly_visible.into_iter().map(|r| r.key).collect();
                let result = sink.mark_shown(&keys).await;
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Failed to mark items shown");
                }
                stats.record(result.is_ok());
            }
        }
        Outbound::Expansion(change) => {
            let result = sink
                .report_expansion_changed(
                    &change.key,
                    change.is_user_action,
                    change.is_expanded,
                    change.location.ordinal(),
                )
                .await;
            if let Err(e) = &result {
                tracing::error!(key = %change.key, error = %e, "Failed to report expansion change");
            }
            stats.record(result.is_ok());
        }
        Outbound::PanelShown { lockscreen, items } => {
            let result = sink.report_panel_shown(lockscreen, &items).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Failed to report panel shown");
            }
            stats.record(result.is_ok());
        }
        Outbound::ItemError { key, message } => {
            let result = sink.report_item_error(&key, &message).await;
            if let Err(e) = &result {
                tracing::warn!(key = %key, error = %e, "Failed to report item error");
            }
            stats.record(result.is_ok());
        }
    }
}
