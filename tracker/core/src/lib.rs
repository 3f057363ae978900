//! Visibility Core - Debounced Item Visibility & Expansion Tracking
//!
//! This crate watches a ranked, scrollable list of items rendered by some
//! host UI, works out which items the user could actually see and when, and
//! reports those transitions (plus expand / collapse transitions of visible
//! items) to an external sink. It is UI-agnostic: the host supplies the
//! candidate list through [`CandidateSource`] and forwards its change,
//! panel, dozing and lifecycle signals through a [`VisibilityLoggerHandle`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Host UI                              │
//! │  list changes    panel / dozing / bar    expand / lifecycle  │
//! └───────┬────────────────────┬──────────────────────┬──────────┘
//!         │                    │                      │
//!         │           ┌────────┴────────┐             │
//!         │           │   LoggingGate   │             │
//!         │           └────────┬────────┘             │
//!         ▼                    ▼ start / stop         ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 VisibilityLogger (owner task)                │
//! │  ┌───────────────┐  ┌─────────────────────┐  ┌────────────┐  │
//! │  │ TickScheduler │─►│ VisibilityDiffEngine│─►│ Expansion  │  │
//! │  │  (debounce)   │  │                     │  │ Aggregator │  │
//! │  └───────────────┘  └──────────┬──────────┘  └─────┬──────┘  │
//! └────────────────────────────────┼───────────────────┼─────────┘
//!                                  ▼                   ▼
//!                        ┌─────────────────────────────────┐
//!                        │   AsyncDispatcher (FIFO task)   │
//!                        └────────────────┬────────────────┘
//!                                         ▼
//!                                   ExternalSink
//! ```
//!
//! # Key Types
//!
//! - [`VisibilityLogger`]: spawns the owner task
//! - [`VisibilityLoggerHandle`]: cloneable entry point for every signal
//! - [`VisibilityDiffEngine`]: newly / no-longer visible per tick
//! - [`ExpansionStateAggregator`]: one report per real expansion transition
//! - [`ExternalSink`]: where reports go
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use visibility_core::{
//!     Candidate, StaticSource, TracingSink, TrackerConfig, VisibilityLogger,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(StaticSource::with_items(vec![
//!         Candidate::new("a", true, Some(0x04)),
//!     ]));
//!     let config = TrackerConfig::default();
//!     let (handle, task) = VisibilityLogger::spawn(source, Arc::new(TracingSink), &config);
//!
//!     handle.set_dozing(false).unwrap();
//!     handle.set_panel_expanded(true).unwrap();
//!     handle.on_possible_change().unwrap();
//!
//!     handle.shutdown().await.unwrap();
//!     task.await.unwrap();
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`record`]: item keys, placements and per-tick records
//! - [`source`]: the candidate-list seam
//! - [`diff`]: the visibility diff engine
//! - [`debounce`]: single-pending-tick scheduling
//! - [`gate`]: start / stop decisions from panel and dozing signals
//! - [`expansion`]: expansion-state aggregation
//! - [`dispatcher`]: best-effort FIFO delivery
//! - [`sink`]: the reporting seam and bundled sinks
//! - [`logger`]: the owner task and its handle
//! - [`config`]: TOML / environment configuration
//! - [`error`]: error types

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod debounce;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod expansion;
pub mod gate;
pub mod logger;
pub mod record;
pub mod sink;
pub mod source;

// Re-exports for convenience
pub use debounce::{TickScheduler, MIN_REPORT_INTERVAL};
pub use diff::{VisibilityDiff, VisibilityDiffEngine};
pub use dispatcher::{AsyncDispatcher, DispatchStats, DispatchStatsSnapshot, Outbound};
pub use error::{SinkError, TrackerError};
pub use expansion::{ExpansionChange, ExpansionState, ExpansionStateAggregator};
pub use gate::{BarState, GateDecision, GateSignals, LoggingGate, TriState};
pub use logger::{LoggerStatus, VisibilityLogger, VisibilityLoggerHandle};
pub use record::{placement, ItemKey, LocationKind, VisibilityRecord};
pub use sink::{ExternalSink, RecordingSink, SinkCall, TracingSink};
pub use source::{Candidate, CandidateSource, StaticSource};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, TrackerConfig, TrackerToml, VisibilityToml,
};
