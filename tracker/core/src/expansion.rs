//! Expansion State Aggregation
//!
//! Merges three independent signals per item (visibility, expansion, and
//! whether the expansion came from the user) into at most one reported event
//! per real expansion transition.
//!
//! # State Machine
//!
//! ```text
//!   Unobserved ──► PartiallyObserved ──► FullyObserved ◄─┐
//!                  (1-3 fields set)      (all 4 set)  ───┘ every update
//! ```
//!
//! Emission is only evaluated once a key is fully observed:
//!
//! 1. not visible                         → suppress
//! 2. never logged and collapsed          → suppress (collapsed is implicit)
//! 3. same value as last logged           → suppress
//! 4. otherwise                           → record and emit
//!
//! # Lifecycle
//!
//! Entries are created on the first signal for a key and are only ever
//! deleted by [`ExpansionStateAggregator::on_entry_removed`] /
//! [`ExpansionStateAggregator::on_entry_updated`]. A replaced item counts as
//! never logged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::{ItemKey, LocationKind, VisibilityRecord};

/// Signals observed so far for one key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpansionState {
    /// Whether the last expansion change came from the user
    pub is_user_action: Option<bool>,
    /// Whether the item is expanded
    pub is_expanded: Option<bool>,
    /// Whether the item is visible
    pub is_visible: Option<bool>,
    /// Where the item sits
    pub location: Option<LocationKind>,
}

impl ExpansionState {
    /// Whether all four signals have been observed
    #[must_use]
    pub fn is_fully_set(&self) -> bool {
        self.is_user_action.is_some()
            && self.is_expanded.is_some()
            && self.is_visible.is_some()
            && self.location.is_some()
    }

    /// Number of signals observed
    #[must_use]
    pub fn observed_count(&self) -> usize {
        usize::from(self.is_user_action.is_some())
            + usize::from(self.is_expanded.is_some())
            + usize::from(self.is_visible.is_some())
            + usize::from(self.location.is_some())
    }
}

/// A reportable expansion transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionChange {
    /// Item key
    pub key: ItemKey,
    /// Whether the user caused it
    pub is_user_action: bool,
    /// New expansion value
    pub is_expanded: bool,
    /// Placement at the time of the change
    pub location: LocationKind,
}

/// Per-key expansion state machine
#[derive(Debug, Default)]
pub struct ExpansionStateAggregator {
    states: HashMap<ItemKey, ExpansionState>,
    logged: HashMap<ItemKey, bool>,
}

impl ExpansionStateAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An item was expanded or collapsed
    pub fn on_expansion_changed(
        &mut self,
        key: &ItemKey,
        is_user_action: bool,
        is_expanded: bool,
        location: LocationKind,
    ) -> Option<ExpansionChange> {
        let state = self.states.entry(key.clone()).or_default();
        state.is_user_action = Some(is_user_action);
        state.is_expanded = Some(is_expanded);
        state.location = Some(location);
        let state = *state;
        self.maybe_emit(key, state)
    }

    /// Visibility changed for a batch of items
    ///
    /// Items in `newly_visible` become visible (taking the record's location)
    /// and are evaluated for emission; items in `no_longer_visible` become
    /// invisible afterwards without evaluation.
    pub fn on_visibility_changed(
        &mut self,
        newly_visible: &[VisibilityRecord],
        no_longer_visible: &[VisibilityRecord],
    ) -> Vec<ExpansionChange> {
        let mut changes = Vec::new();
        for record in newly_visible {
            let state = self.states.entry(record.key.clone()).or_default();
            state.is_visible = Some(true);
            state.location = Some(record.location);
            let state = *state;
            changes.extend(self.maybe_emit(&record.key, state));
        }
        for record in no_longer_visible {
            self.states.entry(record.key.clone()).or_default().is_visible = Some(false);
        }
        changes
    }

    /// The item left the upstream collection
    pub fn on_entry_removed(&mut self, key: &ItemKey) {
        self.states.remove(key);
        self.logged.remove(key);
    }

    /// The item was replaced upstream; it counts as never logged
    pub fn on_entry_updated(&mut self, key: &ItemKey) {
        self.logged.remove(key);
    }

    /// Observed state for a key
    #[must_use]
    pub fn state(&self, key: &ItemKey) -> Option<&ExpansionState> {
        self.states.get(key)
    }

    /// Last reported expansion value for a key
    #[must_use]
    pub fn last_logged(&self, key: &ItemKey) -> Option<bool> {
        self.logged.get(key).copied()
    }

    /// Number of keys with state
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    fn maybe_emit(&mut self, key: &ItemKey, state: ExpansionState) -> Option<ExpansionChange> {
        let (Some(is_user_action), Some(is_expanded), Some(is_visible), Some(location)) = (
            state.is_user_action,
            state.is_expanded,
            state.is_visible,
            state.location,
        ) else {
            return None;
        };
        if !is_visible {
            return None;
        }
        match self.logged.get(key) {
            None if !is_expanded => return None,
            Some(&logged) if logged == is_expanded => return None,
            _ => {}
        }
        self.logged.insert(key.clone(), is_expanded);
        tracing::debug!(
            key = %key,
            is_user_action,
            is_expanded,
            location = %location,
            "Expansion change"
        );
        Some(ExpansionChange {
            key: key.clone(),
            is_user_action,
            is_expanded,
            location,
        })
    }
}
