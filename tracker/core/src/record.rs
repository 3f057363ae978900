//! Visibility Records
//!
//! Value types produced on every tick of the diff engine: the identity of a
//! tracked item ([`ItemKey`]), where it sits on screen ([`LocationKind`]) and
//! the per-tick snapshot ([`VisibilityRecord`]).
//!
//! # Identity
//!
//! A record's identity is its key. Rank, total and location are payload that
//! changes from tick to tick, so two records with the same key compare equal
//! and hash identically regardless of where the item currently sits. This is
//! what lets a `HashSet<VisibilityRecord>` answer "was this item visible last
//! tick?" without caring about reordering.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Stable identifier of a tracked item
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub String);

impl ItemKey {
    /// Create a new item key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for ItemKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Placement
// ============================================================================

/// Raw placement codes reported by the rendering collaborator
///
/// These are bit flags on the rendering side; only the exact values below are
/// recognized, anything else (including combinations) is [`LocationKind::Unknown`].
pub mod placement {
    /// The first heads-up item
    pub const FIRST_HEADS_UP: i32 = 0x01;
    /// Scrolled off the top
    pub const HIDDEN_TOP: i32 = 0x02;
    /// Fully inside the main list area
    pub const MAIN_AREA: i32 = 0x04;
    /// Peeking out at the bottom of the stack
    pub const BOTTOM_PEEKING: i32 = 0x08;
    /// Hidden below the bottom of the stack
    pub const BOTTOM_HIDDEN: i32 = 0x10;
    /// Not laid out at all
    pub const GONE: i32 = 0x40;
}

/// Where on screen an item sits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Placement unknown or unrecognized
    #[default]
    Unknown,
    /// First heads-up item
    FirstHeadsUp,
    /// Hidden above the visible area
    HiddenTop,
    /// In the main area
    MainArea,
    /// Peeking at the bottom
    BottomPeeking,
    /// Hidden at the bottom
    BottomHidden,
    /// Gone
    Gone,
}

impl LocationKind {
    /// Classify a raw placement code
    ///
    /// Unrecognized codes are never an error; they map to `Unknown`.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            placement::FIRST_HEADS_UP => Self::FirstHeadsUp,
            placement::HIDDEN_TOP => Self::HiddenTop,
            placement::MAIN_AREA => Self::MainArea,
            placement::BOTTOM_PEEKING => Self::BottomPeeking,
            placement::BOTTOM_HIDDEN => Self::BottomHidden,
            placement::GONE => Self::Gone,
            _ => Self::Unknown,
        }
    }

    /// Classify an optional placement code (`None` when the item has no layout yet)
    #[must_use]
    pub fn from_placement(code: Option<i32>) -> Self {
        code.map_or(Self::Unknown, Self::from_code)
    }

    /// Wire ordinal sent to the reporting sink
    #[must_use]
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::FirstHeadsUp => 1,
            Self::HiddenTop => 2,
            Self::MainArea => 3,
            Self::BottomPeeking => 4,
            Self::BottomHidden => 5,
            Self::Gone => 6,
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::FirstHeadsUp => "first_heads_up",
            Self::HiddenTop => "hidden_top",
            Self::MainArea => "main_area",
            Self::BottomPeeking => "bottom_peeking",
            Self::BottomHidden => "bottom_hidden",
            Self::Gone => "gone",
        }
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Visibility Record
// ============================================================================

/// One tracked item as observed during a single tick
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisibilityRecord {
    /// Item identity
    pub key: ItemKey,
    /// Position in the candidate list (0-based)
    pub rank: usize,
    /// Length of the candidate list at the time of the tick
    pub total: usize,
    /// Whether the item was in a visible location
    pub visible: bool,
    /// Placement classification
    pub location: LocationKind,
}

impl VisibilityRecord {
    /// Create a new record
    #[must_use]
    pub fn new(
        key: impl Into<ItemKey>,
        rank: usize,
        total: usize,
        visible: bool,
        location: LocationKind,
    ) -> Self {
        Self {
            key: key.into(),
            rank,
            total,
            visible,
            location,
        }
    }
}

impl PartialEq for VisibilityRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for VisibilityRecord {}

impl Hash for VisibilityRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `Borrow<str>`
        self.key.as_str().hash(state);
    }
}

impl Borrow<str> for VisibilityRecord {
    fn borrow(&self) -> &str {
        self.key.as_str()
    }
}
