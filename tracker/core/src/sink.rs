//! External Sink
//!
//! The remote collaborator that durably records visibility and expansion
//! events. Every method may fail; the dispatcher logs failures and moves on,
//! so implementations should not retry internally either.
//!
//! Two implementations ship with the crate:
//!
//! - [`TracingSink`]: writes every report to the `tracing` log
//! - [`RecordingSink`]: keeps every report in memory, with failure injection

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::record::{ItemKey, VisibilityRecord};

/// Remote reporting collaborator
#[async_trait]
pub trait ExternalSink: Send + Sync {
    /// Items became visible / stopped being visible
    async fn report_visibility_changes(
        &self,
        newly_visible: &[VisibilityRecord],
        no_longer_visible: &[VisibilityRecord],
    ) -> Result<(), SinkError>;

    /// An item was expanded or collapsed while visible
    async fn report_expansion_changed(
        &self,
        key: &ItemKey,
        is_user_action: bool,
        is_expanded: bool,
        location_ordinal: u8,
    ) -> Result<(), SinkError>;

    /// Items the user has now seen
    async fn mark_shown(&self, _keys: &[ItemKey]) -> Result<(), SinkError> {
        Ok(())
    }

    /// The hosting panel was shown with these items
    async fn report_panel_shown(
        &self,
        _lockscreen: bool,
        _items: &[ItemKey],
    ) -> Result<(), SinkError> {
        Ok(())
    }

    /// An item failed to load
    async fn report_item_error(&self, _key: &ItemKey, _message: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One call made to a sink
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SinkCall {
    /// `report_visibility_changes`
    VisibilityChanges {
        /// Newly visible records
        newly_visible: Vec<VisibilityRecord>,
        /// No longer visible records
        no_longer_visible: Vec<VisibilityRecord>,
    },
    /// `mark_shown`
    Shown {
        /// Keys marked as seen
        keys: Vec<ItemKey>,
    },
    /// `report_expansion_changed`
    ExpansionChanged {
        /// Item key
        key: ItemKey,
        /// Whether the user caused it
        is_user_action: bool,
        /// New expansion value
        is_expanded: bool,
        /// Location ordinal
        location_ordinal: u8,
    },
    /// `report_panel_shown`
    PanelShown {
        /// Whether the lock screen was showing
        lockscreen: bool,
        /// Items in rank order
        items: Vec<ItemKey>,
    },
    /// `report_item_error`
    ItemError {
        /// Item key
        key: ItemKey,
        /// Error message
        message: String,
    },
}

// ============================================================================
// Tracing Sink
// ============================================================================

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ExternalSink for TracingSink {
    async fn report_visibility_changes(
        &self,
        newly_visible: &[VisibilityRecord],
        no_longer_visible: &[VisibilityRecord],
    ) -> Result<(), SinkError> {
        let newly: Vec<&str> = newly_visible.iter().map(|r| r.key.as_str()).collect();
        let gone: Vec<&str> = no_longer_visible.iter().map(|r| r.key.as_str()).collect();
        tracing::info!(?newly, no_longer = ?gone, "Visibility changed");
        Ok(())
    }

    async fn report_expansion_changed(
        &self,
        key: &ItemKey,
        is_user_action: bool,
        is_expanded: bool,
        location_ordinal: u8,
    ) -> Result<(), SinkError> {
        tracing::info!(
            key = %key,
            is_user_action,
            is_expanded,
            location_ordinal,
            "Expansion changed"
        );
        Ok(())
    }

    async fn mark_shown(&self, keys: &[ItemKey]) -> Result<(), SinkError> {
        tracing::info!(count = keys.len(), "Items shown");
        Ok(())
    }

    async fn report_panel_shown(&self, lockscreen: bool, items: &[ItemKey]) -> Result<(), SinkError> {
        tracing::info!(lockscreen, count = items.len(), "Panel shown");
        Ok(())
    }

    async fn report_item_error(&self, key: &ItemKey, message: &str) -> Result<(), SinkError> {
        tracing::warn!(key = %key, message, "Item error");
        Ok(())
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Sink that records every successful call in memory
///
/// While [`RecordingSink::set_failing`] is on, every call fails with
/// [`SinkError::Unreachable`] and nothing is recorded.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    failing: AtomicBool,
    failures: AtomicU64,
}

impl RecordingSink {
    /// Create an empty recording sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls rejected while failing
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// All recorded calls, in order
    #[must_use]
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    /// Take and clear all recorded calls
    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Recorded visibility batches as key lists `(newly, no_longer)`
    #[must_use]
    pub fn visibility_batches(&self) -> Vec<(Vec<String>, Vec<String>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::VisibilityChanges {
                    newly_visible,
                    no_longer_visible,
                } => Some((
                    newly_visible.iter().map(|r| r.key.to_string()).collect(),
                    no_longer_visible.iter().map(|r| r.key.to_string()).collect(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Recorded expansion events as `(key, is_user_action, is_expanded, ordinal)`
    #[must_use]
    pub fn expansion_events(&self) -> Vec<(String, bool, bool, u8)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::ExpansionChanged {
                    key,
                    is_user_action,
                    is_expanded,
                    location_ordinal,
                } => Some((
                    key.to_string(),
                    *is_user_action,
                    *is_expanded,
                    *location_ordinal,
                )),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(SinkError::Unreachable("recording sink set to fail".to_string()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl ExternalSink for RecordingSink {
    async fn report_visibility_changes(
        &self,
        newly_visible: &[VisibilityRecord],
        no_longer_visible: &[VisibilityRecord],
    ) -> Result<(), SinkError> {
        self.record(SinkCall::VisibilityChanges {
            newly_visible: newly_visible.to_vec(),
            no_longer_visible: no_longer_visible.to_vec(),
        })
    }

    async fn report_expansion_changed(
        &self,
        key: &ItemKey,
        is_user_action: bool,
        is_expanded: bool,
        location_ordinal: u8,
    ) -> Result<(), SinkError> {
        self.record(SinkCall::ExpansionChanged {
            key: key.clone(),
            is_user_action,
            is_expanded,
            location_ordinal,
        })
    }

    async fn mark_shown(&self, keys: &[ItemKey]) -> Result<(), SinkError> {
        self.record(SinkCall::Shown {
            keys: keys.to_vec(),
        })
    }

    async fn report_panel_shown(&self, lockscreen: bool, items: &[ItemKey]) -> Result<(), SinkError> {
        self.record(SinkCall::PanelShown {
            lockscreen,
            items: items.to_vec(),
        })
    }

    async fn report_item_error(&self, key: &ItemKey, message: &str) -> Result<(), SinkError> {
        self.record(SinkCall::ItemError {
            key: key.clone(),
            message: message.to_string(),
        })
    }
}
