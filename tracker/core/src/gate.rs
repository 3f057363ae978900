//! Logging Gate
//!
//! Decides whether visibility tracking should be running, from two signals
//! that arrive independently and in any order:
//!
//! - **panel expanded**: the surface hosting the list is open
//! - **dozing**: the device is in an always-on / ambient mode
//!
//! Both start out [`TriState::Unknown`]. Until both are known the gate takes
//! no action at all; a missing signal is not treated as `false`.
//!
//! | panel expanded | dozing | decision |
//! |----------------|--------|----------|
//! | unknown        | any    | undecided |
//! | any            | unknown| undecided |
//! | on             | off    | open (start tracking) |
//! | otherwise      |        | closed (stop tracking) |
//!
//! A third signal, lockscreen (derived from [`BarState`]), never gates. It is
//! carried as payload on the decision and defaults to `false` when unknown.
//!
//! # Thread Safety
//!
//! Dozing and bar-state changes come from a different producer than panel
//! changes, so every field lives behind one `parking_lot::Mutex` and the
//! decision is applied while the lock is held. Two racing setters therefore
//! deliver their decisions in the same order they changed the state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A boolean that may not have been observed yet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    /// Never set
    #[default]
    Unknown,
    /// Set to true
    On,
    /// Set to false
    Off,
}

impl TriState {
    /// The value, if known
    #[must_use]
    pub fn known(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::On => Some(true),
            Self::Off => Some(false),
        }
    }

    /// Whether the value has been observed
    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// State of the hosting surface's state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarState {
    /// Regular unlocked shade
    Shade,
    /// Lock screen
    Keyguard,
    /// Shade pulled down over the lock screen
    ShadeLocked,
}

impl BarState {
    /// Whether this state counts as the lock screen
    #[must_use]
    pub fn is_lockscreen(self) -> bool {
        matches!(self, Self::Keyguard | Self::ShadeLocked)
    }
}

/// Outcome of a gate evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// At least one gating signal is still unknown
    Undecided,
    /// Tracking should run
    Open {
        /// Whether the lock screen is showing (false when unknown)
        lockscreen: bool,
    },
    /// Tracking should stop
    Closed {
        /// Whether the lock screen is showing (false when unknown)
        lockscreen: bool,
    },
}

/// Snapshot of the gate's inputs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateSignals {
    /// Panel expansion
    pub panel_expanded: TriState,
    /// Dozing
    pub dozing: TriState,
    /// Lock screen
    pub lockscreen: TriState,
}

impl GateSignals {
    /// Evaluate the decision for these inputs
    #[must_use]
    pub fn evaluate(&self) -> GateDecision {
        let (Some(panel_expanded), Some(dozing)) =
            (self.panel_expanded.known(), self.dozing.known())
        else {
            tracing::debug!(
                panel_expanded_known = self.panel_expanded.is_known(),
                dozing_known = self.dozing.is_known(),
                "Panel status unclear"
            );
            return GateDecision::Undecided;
        };
        let lockscreen = self.lockscreen.known().unwrap_or(false);
        if panel_expanded && !dozing {
            GateDecision::Open { lockscreen }
        } else {
            GateDecision::Closed { lockscreen }
        }
    }
}

/// Serialized gate over the panel / dozing / lockscreen signals
#[derive(Debug, Default)]
pub struct LoggingGate {
    signals: Mutex<GateSignals>,
}

impl LoggingGate {
    /// Create a gate with every signal unknown
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record panel expansion and re-evaluate
    ///
    /// `apply` runs with the gate locked.
    pub fn set_panel_expanded<F>(&self, expanded: bool, apply: F) -> GateDecision
    where
        F: FnOnce(GateDecision),
    {
        tracing::debug!(expanded, "Panel expanded changed");
        self.update(|s| s.panel_expanded = expanded.into(), apply)
    }

    /// Record dozing and re-evaluate
    ///
    /// `apply` runs with the gate locked.
    pub fn set_dozing<F>(&self, dozing: bool, apply: F) -> GateDecision
    where
        F: FnOnce(GateDecision),
    {
        tracing::debug!(dozing, "Dozing changed");
        self.update(|s| s.dozing = dozing.into(), apply)
    }

    /// Record the bar state; does not re-evaluate
    pub fn set_bar_state(&self, state: BarState) {
        tracing::debug!(?state, "Bar state changed");
        self.signals.lock().lockscreen = state.is_lockscreen().into();
    }

    /// Current inputs
    #[must_use]
    pub fn signals(&self) -> GateSignals {
        *self.signals.lock()
    }

    /// Current decision without changing anything
    #[must_use]
    pub fn decision(&self) -> GateDecision {
        self.signals.lock().evaluate()
    }

    fn update<U, F>(&self, change: U, apply: F) -> GateDecision
    where
        U: FnOnce(&mut GateSignals),
        F: FnOnce(GateDecision),
    {
        let mut signals = self.signals.lock();
        change(&mut signals);
        let decision = signals.evaluate();
        apply(decision);
        decision
    }
}
