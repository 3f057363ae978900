//! Candidate Source
//!
//! The rendering collaborator's side of the contract. It owns the ranked list
//! of items that could be on screen and knows where each one is laid out.
//! The tracker only ever calls it from its owner task, synchronously, once
//! per tick, so implementations should be cheap snapshots rather than
//! anything that blocks.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::record::{ItemKey, LocationKind};

/// Supplier of the current ranked candidate list and its placement
pub trait CandidateSource: Send + Sync + 'static {
    /// Item handle as the renderer knows it
    type Item;

    /// Current candidates, in rank order
    fn current_list(&self) -> Vec<Self::Item>;

    /// Stable key of an item
    fn key_of(&self, item: &Self::Item) -> ItemKey;

    /// Whether the item currently sits somewhere the user can see it
    fn is_in_visible_location(&self, item: &Self::Item) -> bool;

    /// Raw placement code of an item (`None` when it has no layout yet)
    fn location_of(&self, item: &Self::Item) -> Option<i32>;

    /// Raw placement code looked up by key (`None` when the key is unknown)
    fn location_for_key(&self, key: &ItemKey) -> Option<i32>;

    /// Classified placement of an item
    fn location_kind(&self, item: &Self::Item) -> LocationKind {
        LocationKind::from_placement(self.location_of(item))
    }
}

/// Snapshot of a single candidate, for sources that hold plain data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Item key
    pub key: ItemKey,
    /// Whether the item is in a visible location
    pub visible: bool,
    /// Raw placement code
    #[serde(default)]
    pub location: Option<i32>,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(key: impl Into<ItemKey>, visible: bool, location: Option<i32>) -> Self {
        Self {
            key: key.into(),
            visible,
            location,
        }
    }
}

/// In-memory candidate source backed by a replaceable snapshot
///
/// Useful for embedding the tracker where the list is pushed rather than
/// pulled (the replay tool, tests).
#[derive(Debug, Default)]
pub struct StaticSource {
    items: RwLock<Vec<Candidate>>,
}

impl StaticSource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with an initial list
    #[must_use]
    pub fn with_items(items: Vec<Candidate>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Replace the whole list
    pub fn set_items(&self, items: Vec<Candidate>) {
        *self.items.write() = items;
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether there are no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl CandidateSource for StaticSource {
    type Item = Candidate;

    fn current_list(&self) -> Vec<Candidate> {
        self.items.read().clone()
    }

    fn key_of(&self, item: &Candidate) -> ItemKey {
        item.key.clone()
    }

    fn is_in_visible_location(&self, item: &Candidate) -> bool {
        item.visible
    }

    fn location_of(&self, item: &Candidate) -> Option<i32> {
        item.location
    }

    fn location_for_key(&self, key: &ItemKey) -> Option<i32> {
        self.items
            .read()
            .iter()
            .find(|c| &c.key == key)
            .and_then(|c| c.location)
    }
}

impl<S: CandidateSource> CandidateSource for std::sync::Arc<S> {
    type Item = S::Item;

    fn current_list(&self) -> Vec<Self::Item> {
        (**self).current_list()
    }

    fn key_of(&self, item: &Self::Item) -> ItemKey {
        (**self).key_of(item)
    }

    fn is_in_visible_location(&self, item: &Self::Item) -> bool {
        (**self).is_in_visible_location(item)
    }

    fn location_of(&self, item: &Self::Item) -> Option<i32> {
        (**self).location_of(item)
    }

    fn location_for_key(&self, key: &ItemKey) -> Option<i32> {
        (**self).location_for_key(key)
    }
}
