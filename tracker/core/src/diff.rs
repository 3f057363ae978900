//! Visibility Diff Engine
//!
//! Computes, per tick, which items became visible and which stopped being
//! visible relative to the previous tick.
//!
//! # Algorithm
//!
//! ```text
//!   candidates (rank 0..N-1)
//!        │
//!        ▼  is_in_visible_location?
//!   currently_visible ──┬── minus previous (by key) ──► newly_visible
//!                       │
//!   previous ───────────┴── minus current (by key) ──► no_longer_visible
//!
//!   previous := currently_visible   (replace, never merge)
//! ```
//!
//! The engine itself knows nothing about timing or gating; the owner task
//! decides when a tick runs.

use std::collections::HashSet;

use crate::record::VisibilityRecord;
use crate::source::CandidateSource;

/// Result of one tick
#[derive(Clone, Debug, Default)]
pub struct VisibilityDiff {
    /// Visible now, not visible on the previous tick (rank order)
    pub newly_visible: Vec<VisibilityRecord>,
    /// Visible on the previous tick, not visible now (rank order of their last tick)
    pub no_longer_visible: Vec<VisibilityRecord>,
    /// Everything visible now (rank order)
    pub currently_visible: Vec<VisibilityRecord>,
    /// Number of candidates examined
    pub active_count: usize,
}

impl VisibilityDiff {
    /// Whether the tick produced no transitions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.newly_visible.is_empty() && self.no_longer_visible.is_empty()
    }
}

/// Tracks the previously visible set between ticks
#[derive(Debug, Default)]
pub struct VisibilityDiffEngine {
    currently_visible: HashSet<VisibilityRecord>,
}

impl VisibilityDiffEngine {
    /// Create an engine with an empty visible set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick against the source's current list
    pub fn tick<S: CandidateSource>(&mut self, source: &S) -> VisibilityDiff {
        let items = source.current_list();
        let total = items.len();
        let records = items.iter().enumerate().map(|(rank, item)| {
            VisibilityRecord::new(
                source.key_of(item),
                rank,
                total,
                source.is_in_visible_location(item),
                source.location_kind(item),
            )
        });
        self.apply(records, total)
    }

    /// Run one tick over already-built records
    ///
    /// `records` must be the full candidate list for this tick; records with
    /// `visible == false` are dropped.
    pub fn apply<I>(&mut self, records: I, active_count: usize) -> VisibilityDiff
    where
        I: IntoIterator<Item = VisibilityRecord>,
    {
        let mut current = HashSet::new();
        let mut newly_visible = Vec::new();

        for record in records {
            if !record.visible {
                continue;
            }
            let previously_visible = self.currently_visible.contains(record.key.as_str());
            if !previously_visible && !current.contains(record.key.as_str()) {
                newly_visible.push(record.clone());
            }
            current.insert(record);
        }

        let mut no_longer_visible: Vec<VisibilityRecord> = self
            .currently_visible
            .iter()
            .filter(|previous| !current.contains(previous.key.as_str()))
            .cloned()
            .collect();

        let mut currently_visible: Vec<VisibilityRecord> = current.iter().cloned().collect();
        sort_by_rank(&mut currently_visible);
        sort_by_rank(&mut no_longer_visible);

        self.currently_visible = current;

        tracing::debug!(
            active = active_count,
            visible = currently_visible.len(),
            newly = newly_visible.len(),
            no_longer = no_longer_visible.len(),
            "Visibility tick"
        );

        VisibilityDiff {
            newly_visible,
            no_longer_visible,
            currently_visible,
            active_count,
        }
    }

    /// Report everything as no longer visible and forget it
    ///
    /// Returns `None` when nothing was visible.
    pub fn take_all_as_invisible(&mut self) -> Option<VisibilityDiff> {
        if self.currently_visible.is_empty() {
            return None;
        }
        let mut no_longer_visible: Vec<VisibilityRecord> =
            self.currently_visible.drain().collect();
        sort_by_rank(&mut no_longer_visible);
        Some(VisibilityDiff {
            newly_visible: Vec::new(),
            no_longer_visible,
            currently_visible: Vec::new(),
            active_count: 0,
        })
    }

    /// The retained visible set from the last tick
    #[must_use]
    pub fn currently_visible(&self) -> &HashSet<VisibilityRecord> {
        &self.currently_visible
    }

    /// Whether the given key was visible on the last tick
    #[must_use]
    pub fn is_visible(&self, key: &str) -> bool {
        self.currently_visible.contains(key)
    }

    /// Drop the retained visible set without reporting
    pub fn clear(&mut self) {
        self.currently_visible.clear();
    }
}

fn sort_by_rank(records: &mut [VisibilityRecord]) {
    records.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.key.cmp(&b.key)));
}
