//! JSON-lines sink
//!
//! Writes every sink call as one JSON object per line.

use std::io::Write;

use async_trait::async_trait;
use parking_lot::Mutex;

use visibility_core::{ExternalSink, ItemKey, SinkCall, SinkError, VisibilityRecord};

/// Sink that prints each call as a JSON line
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, call: &SinkCall) -> Result<(), SinkError> {
        let line =
            serde_json::to_string(call).map_err(|e| SinkError::Remote(e.to_string()))?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| SinkError::Unreachable(e.to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> ExternalSink for JsonLinesSink<W> {
    async fn report_visibility_changes(
        &self,
        newly_visible: &[VisibilityRecord],
        no_longer_visible: &[VisibilityRecord],
    ) -> Result<(), SinkError> {
        self.emit(&SinkCall::VisibilityChanges {
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
        self.emit(&SinkCall::ExpansionChanged {
            key: key.clone(),
            is_user_action,
            is_expanded,
            location_ordinal,
        })
    }

    async fn mark_shown(&self, keys: &[ItemKey]) -> Result<(), SinkError> {
        self.emit(&SinkCall::Shown {
            keys: keys.to_vec(),
        })
    }

    async fn report_panel_shown(&self, lockscreen: bool, items: &[ItemKey]) -> Result<(), SinkError> {
        self.emit(&SinkCall::PanelShown {
            lockscreen,
            items: items.to_vec(),
        })
    }

    async fn report_item_error(&self, key: &ItemKey, message: &str) -> Result<(), SinkError> {
        self.emit(&SinkCall::ItemError {
            key: key.clone(),
            message: message.to_string(),
        })
    }
}
