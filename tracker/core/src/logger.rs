//! Visibility Logger
//!
//! The owner task that ties the tracker together. It owns the diff engine,
//! the tick scheduler, the expansion aggregator and the dispatcher, and is
//! driven entirely by [`VisibilityLoggerHandle`] commands plus its own
//! debounce deadline.
//!
//! # Architecture
//!
//! ```text
//!   renderer / status bar / item lifecycle
//!        │ (any thread)
//!        ▼
//!   VisibilityLoggerHandle ──LoggingGate──┐
//!        │                                │ Start / Stop (under gate lock)
//!        ▼                                ▼
//!   ┌──────────────────── owner task ────────────────────┐
//!   │ TickScheduler ─► VisibilityDiffEngine ─► batches   │
//!   │                        │                           │
//!   │                        └► ExpansionStateAggregator │
//!   └────────────────────────┬───────────────────────────┘
//!                            ▼
//!                     AsyncDispatcher ─► ExternalSink
//! ```
//!
//! Change signals are only honored while tracking is started. Stopping emits
//! one final batch reporting everything still visible as no longer visible.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::TrackerConfig;
use crate::debounce::TickScheduler;
use crate::diff::VisibilityDiffEngine;
use crate::dispatcher::{AsyncDispatcher, DispatchStatsSnapshot, Outbound};
use crate::error::TrackerError;
use crate::expansion::ExpansionStateAggregator;
use crate::gate::{BarState, GateDecision, GateSignals, LoggingGate};
use crate::record::{ItemKey, LocationKind};
use crate::sink::ExternalSink;
use crate::source::CandidateSource;

// ============================================================================
// Commands & Status
// ============================================================================

enum LoggerCommand {
    PossibleChange,
    Start {
        lockscreen: bool,
    },
    Stop,
    ExpansionChanged {
        key: ItemKey,
        is_user_action: bool,
        is_expanded: bool,
    },
    EntryRemoved(ItemKey),
    EntryUpdated(ItemKey),
    ItemError {
        key: ItemKey,
        message: String,
    },
    Flush(oneshot::Sender<()>),
    Query(oneshot::Sender<LoggerStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Snapshot of the owner task's state
#[derive(Clone, Debug)]
pub struct LoggerStatus {
    /// Whether tracking is running
    pub started: bool,
    /// Size of the retained visible set
    pub visible: usize,
    /// Keys with expansion state
    pub tracked_expansions: usize,
    /// Whether a tick is scheduled
    pub tick_pending: bool,
    /// Ticks run since spawn
    pub ticks: u64,
    /// Signals absorbed into an already pending tick
    pub coalesced_signals: u64,
    /// When the last tick started
    pub last_tick: Option<Instant>,
    /// Dispatcher counters
    pub dispatch: DispatchStatsSnapshot,
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable entry point to a running [`VisibilityLogger`]
///
/// Every method may be called from any thread. Methods return
/// [`TrackerError::Closed`] once the owner task has exited.
#[derive(Clone, Debug)]
pub struct VisibilityLoggerHandle {
    tx: mpsc::UnboundedSender<LoggerCommand>,
    gate: Arc<LoggingGate>,
}

impl VisibilityLoggerHandle {
    fn send(&self, command: LoggerCommand) -> Result<(), TrackerError> {
        self.tx.send(command).map_err(|_| TrackerError::Closed)
    }

    /// The rendered list may have changed; schedules a debounced tick
    pub fn on_possible_change(&self) -> Result<(), TrackerError> {
        self.send(LoggerCommand::PossibleChange)
    }

    /// Panel expansion changed; re-evaluates the gate
    pub fn set_panel_expanded(&self, expanded: bool) -> Result<GateDecision, TrackerError> {
        let mut sent = Ok(());
        let decision = self
            .gate
            .set_panel_expanded(expanded, |d| sent = self.apply_decision(d));
        sent.map(|()| decision)
    }

    /// Dozing changed; re-evaluates the gate
    pub fn set_dozing(&self, dozing: bool) -> Result<GateDecision, TrackerError> {
        let mut sent = Ok(());
        let decision = self
            .gate
            .set_dozing(dozing, |d| sent = self.apply_decision(d));
        sent.map(|()| decision)
    }

    /// Status bar state changed; only affects the lockscreen payload
    pub fn set_bar_state(&self, state: BarState) {
        self.gate.set_bar_state(state);
    }

    /// An item was expanded or collapsed
    ///
    /// The item's placement is looked up on the owner task.
    pub fn on_expansion_changed(
        &self,
        key: impl Into<ItemKey>,
        is_user_action: bool,
        is_expanded: bool,
    ) -> Result<(), TrackerError> {
        self.send(LoggerCommand::ExpansionChanged {
            key: key.into(),
            is_user_action,
            is_expanded,
        })
    }

    /// The item left the upstream collection
    pub fn on_entry_removed(&self, key: impl Into<ItemKey>) -> Result<(), TrackerError> {
        self.send(LoggerCommand::EntryRemoved(key.into()))
    }

    /// The item was replaced upstream
    pub fn on_entry_updated(&self, key: impl Into<ItemKey>) -> Result<(), TrackerError> {
        self.send(LoggerCommand::EntryUpdated(key.into()))
    }

    /// The item failed to load
    pub fn on_item_error(
        &self,
        key: impl Into<ItemKey>,
        message: impl Into<String>,
    ) -> Result<(), TrackerError> {
        self.send(LoggerCommand::ItemError {
            key: key.into(),
            message: message.into(),
        })
    }

    /// Current gate inputs
    #[must_use]
    pub fn gate_signals(&self) -> GateSignals {
        self.gate.signals()
    }

    /// Wait until every report produced so far has been handed to the sink
    ///
    /// A tick that is already due runs first.
    pub async fn flush(&self) -> Result<(), TrackerError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(LoggerCommand::Flush(done_tx))?;
        done_rx.await.map_err(|_| TrackerError::Closed)
    }

    /// Snapshot of the owner task's state
    pub async fn status(&self) -> Result<LoggerStatus, TrackerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LoggerCommand::Query(reply_tx))?;
        reply_rx.await.map_err(|_| TrackerError::Closed)
    }

    /// Stop tracking, deliver everything queued and end the owner task
    pub async fn shutdown(&self) -> Result<(), TrackerError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(LoggerCommand::Shutdown(done_tx))?;
        done_rx.await.map_err(|_| TrackerError::Closed)
    }

    // Runs under the gate lock so decisions reach the owner in order
    fn apply_decision(&self, decision: GateDecision) -> Result<(), TrackerError> {
        match decision {
            GateDecision::Undecided => Ok(()),
            GateDecision::Open { lockscreen } => self.send(LoggerCommand::Start { lockscreen }),
            GateDecision::Closed { .. } => self.send(LoggerCommand::Stop),
        }
    }
}

// ============================================================================
// Owner Task
// ============================================================================

/// Owner of all tracking state
pub struct VisibilityLogger<S: CandidateSource> {
    source: S,
    engine: VisibilityDiffEngine,
    scheduler: TickScheduler,
    aggregator: ExpansionStateAggregator,
    dispatcher: AsyncDispatcher,
    started: bool,
    ticks: u64,
}

impl<S> VisibilityLogger<S>
where
    S: CandidateSource,
{
    /// Spawn the owner task on the current tokio runtime
    ///
    /// Tracking starts stopped with every gate signal unknown.
    pub fn spawn(
        source: S,
        sink: Arc<dyn ExternalSink>,
        config: &TrackerConfig,
    ) -> (VisibilityLoggerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let logger = Self {
            source,
            engine: VisibilityDiffEngine::new(),
            scheduler: TickScheduler::new(config.min_report_interval()),
            aggregator: ExpansionStateAggregator::new(),
            dispatcher: AsyncDispatcher::spawn(sink),
            started: false,
            ticks: 0,
        };
        let handle = VisibilityLoggerHandle {
            tx,
            gate: Arc::new(LoggingGate::new()),
        };
        tracing::debug!(
            min_interval_ms = config.min_report_interval_ms,
            "Spawning visibility logger"
        );
        (handle, tokio::spawn(logger.run(rx)))
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<LoggerCommand>) {
        let mut shutdown_reply = None;

        loop {
            if self.scheduler.is_due(Instant::now()) {
                self.tick();
                continue;
            }

            let deadline = self.scheduler.deadline();
            let command = tokio::select! {
                command = rx.recv() => command,
                () = wait_until(deadline) => continue,
            };

            // A tick that came due while parked runs before the command
            if self.scheduler.is_due(Instant::now()) {
                self.tick();
            }

            match command {
                Some(LoggerCommand::Shutdown(done)) => {
                    shutdown_reply = Some(done);
                    break;
                }
                Some(command) => self.handle(command),
                None => {
                    tracing::debug!("All handles dropped");
                    break;
                }
            }
        }

        drop(rx);
        self.stop();
        self.dispatcher.shutdown().await;
        tracing::info!("Visibility logger stopped");

        if let Some(done) = shutdown_reply {
            let _ = done.send(());
        }
    }

    fn handle(&mut self, command: LoggerCommand) {
        match command {
            LoggerCommand::PossibleChange => self.on_possible_change(),
            LoggerCommand::Start { lockscreen } => self.start(lockscreen),
            LoggerCommand::Stop => self.stop(),
            LoggerCommand::ExpansionChanged {
                key,
                is_user_action,
                is_expanded,
            } => {
                let location = LocationKind::from_placement(self.source.location_for_key(&key));
                if let Some(change) =
                    self.aggregator
                        .on_expansion_changed(&key, is_user_action, is_expanded, location)
                {
                    self.dispatcher.submit(Outbound::Expansion(change));
                }
            }
            LoggerCommand::EntryRemoved(key) => self.aggregator.on_entry_removed(&key),
            LoggerCommand::EntryUpdated(key) => self.aggregator.on_entry_updated(&key),
            LoggerCommand::ItemError { key, message } => {
                self.dispatcher.submit(Outbound::ItemError { key, message });
            }
            LoggerCommand::Flush(done) => self.dispatcher.flush_with(done),
            LoggerCommand::Query(reply) => {
                let _ = reply.send(self.status());
            }
            LoggerCommand::Shutdown(_) => {}
        }
    }

    fn on_possible_change(&mut self) {
        if !self.started {
            return;
        }
        if let Some(due) = self.scheduler.on_signal(Instant::now()) {
            tracing::trace!(?due, "Tick scheduled");
        }
    }

    fn start(&mut self, lockscreen: bool) {
        let items: Vec<ItemKey> = self
            .source
            .current_list()
            .iter()
            .map(|item| self.source.key_of(item))
            .collect();
        self.dispatcher
            .submit(Outbound::PanelShown { lockscreen, items });

        if self.started {
            return;
        }
        self.started = true;
        tracing::info!(lockscreen, "Visibility tracking started");
        self.on_possible_change();
    }

    fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.scheduler.cancel();
        if let Some(diff) = self.engine.take_all_as_invisible() {
            self.dispatcher.submit(Outbound::VisibilityBatch {
                newly_visible: diff.newly_visible,
                no_longer_visible: diff.no_longer_visible,
            });
        }
        tracing::info!("Visibility tracking stopped");
    }

    fn tick(&mut self) {
        self.scheduler.begin_tick(Instant::now());
        self.ticks += 1;

        let diff = self.engine.tick(&self.source);
        let changes = self
            .aggregator
            .on_visibility_changed(&diff.currently_visible, &diff.currently_visible);

        if !diff.is_empty() {
            self.dispatcher.submit(Outbound::VisibilityBatch {
                newly_visible: diff.newly_visible,
                no_longer_visible: diff.no_longer_visible,
            });
        }
        for change in changes {
            self.dispatcher.submit(Outbound::Expansion(change));
        }
    }

    fn status(&self) -> LoggerStatus {
        LoggerStatus {
            started: self.started,
            visible: self.engine.currently_visible().len(),
            tracked_expansions: self.aggregator.tracked_count(),
            tick_pending: self.scheduler.is_pending(),
            ticks: self.ticks,
            coalesced_signals: self.scheduler.coalesced(),
            last_tick: self.scheduler.last_tick(),
            dispatch: self.dispatcher.stats(),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
