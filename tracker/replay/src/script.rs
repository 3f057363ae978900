//! Replay scripts
//!
//! One JSON object per line, tagged by `op`. Blank lines and lines starting
//! with `#` are skipped.
//!
//! ```text
//! {"op":"list","items":[{"key":"a","visible":true,"location":4}]}
//! {"op":"dozing","value":false}
//! {"op":"panel_expanded","value":true}
//! {"op":"expansion","key":"a","user_action":true,"expanded":true}
//! {"op":"wait_ms","ms":500}
//! {"op":"signal"}
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use visibility_core::{
    BarState, Candidate, ItemKey, StaticSource, TrackerError, VisibilityLoggerHandle,
};

/// Script could not be parsed
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A line was not a valid step
    #[error("line {line}: {source}")]
    Line {
        /// 1-based line number
        line: usize,
        /// The JSON error
        source: serde_json::Error,
    },
}

/// One scripted input
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Replace the rendered list (does not signal)
    List {
        /// Candidates in rank order
        items: Vec<Candidate>,
    },
    /// The list may have changed
    Signal,
    /// Panel expansion
    PanelExpanded {
        /// New value
        value: bool,
    },
    /// Dozing
    Dozing {
        /// New value
        value: bool,
    },
    /// Status bar state
    BarState {
        /// New state
        state: BarState,
    },
    /// An item was expanded or collapsed
    Expansion {
        /// Item key
        key: ItemKey,
        /// Whether the user caused it
        #[serde(default)]
        user_action: bool,
        /// New expansion value
        expanded: bool,
    },
    /// The item left the collection
    Removed {
        /// Item key
        key: ItemKey,
    },
    /// The item was replaced
    Updated {
        /// Item key
        key: ItemKey,
    },
    /// The item failed to load
    ItemError {
        /// Item key
        key: ItemKey,
        /// Error message
        message: String,
    },
    /// Let time pass
    WaitMs {
        /// Milliseconds
        ms: u64,
    },
}

/// Parse a whole script
pub fn parse_script(text: &str) -> Result<Vec<ReplayStep>, ScriptError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| ScriptError::Line {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Feed one step into a running tracker
pub async fn apply_step(
    step: ReplayStep,
    handle: &VisibilityLoggerHandle,
    source: &StaticSource,
) -> Result<(), TrackerError> {
    tracing::debug!(?step, "Replaying step");
    match step {
        ReplayStep::List { items } => source.set_items(items),
        ReplayStep::Signal => handle.on_possible_change()?,
        ReplayStep::PanelExpanded { value } => {
            handle.set_panel_expanded(value)?;
        }
        ReplayStep::Dozing { value } => {
            handle.set_dozing(value)?;
        }
        ReplayStep::BarState { state } => handle.set_bar_state(state),
        ReplayStep::Expansion {
            key,
            user_action,
            expanded,
        } => handle.on_expansion_changed(key, user_action, expanded)?,
        ReplayStep::Removed { key } => handle.on_entry_removed(key)?,
        ReplayStep::Updated { key } => handle.on_entry_updated(key)?,
        ReplayStep::ItemError { key, message } => handle.on_item_error(key, message)?,
        ReplayStep::WaitMs { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
    }
    Ok(())
}
