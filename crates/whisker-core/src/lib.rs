#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Status engine for whisker.
//!
//! One background task owns the session state: the applied [`StatusRecord`],
//! the countdown to the server-issued check deadline, and the adaptive poll
//! scheduler that bursts short-interval fetches when that deadline is
//! imminent. The task is driven through an [`EngineHandle`] and reports
//! everything it does on a [`whisker_events::EventBus`].

mod backend;
mod command;
mod engine;
mod scheduler;
mod timer;

pub use backend::{HttpBackend, StatusBackend};
pub use timer::remaining_seconds;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use whisker_events::EventBus;
use whisker_model::StatusRecord;
use whisker_telemetry::Metrics;

use command::EngineCommand;

const COMMAND_BUFFER: usize = 128;

/// Default seconds-to-deadline below which the scheduler opens a poll burst.
pub const DEFAULT_BURST_THRESHOLD: Duration = Duration::from_secs(10);
/// Default pause between non-forced fetches inside a burst.
pub const DEFAULT_BURST_INTERVAL: Duration = Duration::from_secs(5);
/// Cadence at which the countdown is recomputed from the wall clock.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tuning for the engine task.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Session activated at startup; `None` selects the backend default.
    pub initial_label: Option<String>,
    /// Remaining seconds below which a poll burst starts.
    pub burst_threshold: Duration,
    /// Pause between fetches inside a burst.
    pub burst_interval: Duration,
    /// Countdown recompute cadence.
    pub tick_period: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            initial_label: None,
            burst_threshold: DEFAULT_BURST_THRESHOLD,
            burst_interval: DEFAULT_BURST_INTERVAL,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

/// Errors surfaced by [`EngineHandle`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine task has stopped and no longer accepts commands.
    #[error("status engine is not running")]
    Closed,
}

/// Result alias for [`EngineHandle`] calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Cloneable handle to a running engine task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    records: watch::Receiver<Option<StatusRecord>>,
}

impl EngineHandle {
    /// Spawn the engine task and return its handle.
    ///
    /// The engine immediately activates `settings.initial_label` and issues
    /// the first non-forced fetch.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(
        backend: Arc<dyn StatusBackend>,
        events: EventBus,
        metrics: Metrics,
        settings: EngineSettings,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (record_tx, records) = watch::channel(None);
        engine::spawn(backend, events, metrics, settings, command_rx, record_tx);
        Self { commands, records }
    }

    /// Make `label` the active session: clear the record, stop any burst,
    /// and refetch under a fresh epoch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine task has stopped.
    pub async fn switch_session(&self, label: Option<String>) -> EngineResult<()> {
        self.send(EngineCommand::SwitchSession { label }).await
    }

    /// Ask the backend to re-evaluate the session now instead of serving
    /// cached status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine task has stopped.
    pub async fn check_now(&self) -> EngineResult<()> {
        self.send(EngineCommand::CheckNow).await
    }

    /// Run the seedbox-side session update for the active session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine task has stopped.
    pub async fn update_seedbox(&self) -> EngineResult<()> {
        self.send(EngineCommand::UpdateSeedbox).await
    }

    /// Issue a non-forced fetch for the active session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine task has stopped.
    pub async fn refresh(&self) -> EngineResult<()> {
        self.send(EngineCommand::Refresh).await
    }

    /// Stop the engine task. Subsequent calls return [`EngineError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine task has already
    /// stopped.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.send(EngineCommand::Shutdown).await
    }

    /// Live view of the applied record; `None` while loading or cleared.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<StatusRecord>> {
        self.records.clone()
    }

    async fn send(&self, command: EngineCommand) -> EngineResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }
}
