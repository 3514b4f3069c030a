//! The engine task: single owner of session state.
//!
//! All mutable state (record, epoch, scheduler, countdown, seedbox guard)
//! lives on one task. Network requests run on spawned tasks and report back
//! through a completion channel tagged with the epoch that issued them;
//! completions from a stale epoch are discarded before they can touch state.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, warn};
use whisker_client::ClientResult;
use whisker_events::{Event, EventBus};
use whisker_model::{RecordKind, SeedboxOutcome, Severity, StatusPayload, StatusRecord, normalize};
use whisker_telemetry::Metrics;

use crate::EngineSettings;
use crate::backend::StatusBackend;
use crate::command::EngineCommand;
use crate::scheduler::{PollScheduler, Transition};
use crate::timer;

/// Result of a spawned request task, tagged with the epoch that issued it.
pub(crate) enum Completion {
    Fetch {
        epoch: u64,
        forced: bool,
        outcome: ClientResult<StatusPayload>,
    },
    Seedbox {
        epoch: u64,
        outcome: ClientResult<SeedboxOutcome>,
    },
}

pub(crate) fn spawn(
    backend: Arc<dyn StatusBackend>,
    events: EventBus,
    metrics: Metrics,
    settings: EngineSettings,
    commands: mpsc::Receiver<EngineCommand>,
    records: watch::Sender<Option<StatusRecord>>,
) {
    tokio::spawn(run(backend, events, metrics, settings, commands, records));
}

async fn run(
    backend: Arc<dyn StatusBackend>,
    events: EventBus,
    metrics: Metrics,
    settings: EngineSettings,
    mut commands: mpsc::Receiver<EngineCommand>,
    records: watch::Sender<Option<StatusRecord>>,
) {
    let (completion_tx, mut completions) = mpsc::unbounded_channel();
    let mut tick = time::interval(settings.tick_period);
    let mut engine = Engine::new(backend, events, metrics, &settings, completion_tx, records);

    engine.switch_session(settings.initial_label, false);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(EngineCommand::SwitchSession { label }) => engine.switch_session(label, true),
                Some(EngineCommand::CheckNow) => engine.start_fetch(true),
                Some(EngineCommand::UpdateSeedbox) => engine.update_seedbox(),
                Some(EngineCommand::Refresh) => engine.start_fetch(false),
                Some(EngineCommand::Shutdown) | None => break,
            },
            Some(completion) = completions.recv() => match completion {
                Completion::Fetch { epoch, forced, outcome } => {
                    engine.settle_fetch(epoch, forced, outcome);
                }
                Completion::Seedbox { epoch, outcome } => {
                    engine.settle_seedbox(epoch, outcome);
                }
            },
            _ = tick.tick() => engine.handle_tick(),
            _ = next_burst_tick(&mut engine.burst) => engine.start_fetch(false),
        }
    }

    debug!("status engine stopped");
}

/// Resolves on the next burst tick, or never while no burst is active.
async fn next_burst_tick(burst: &mut Option<Interval>) {
    match burst.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

struct Engine {
    backend: Arc<dyn StatusBackend>,
    events: EventBus,
    metrics: Metrics,
    records: watch::Sender<Option<StatusRecord>>,
    completions: mpsc::UnboundedSender<Completion>,
    burst_interval: Duration,
    label: Option<String>,
    epoch: u64,
    record: Option<StatusRecord>,
    countdown: u64,
    scheduler: PollScheduler,
    burst: Option<Interval>,
    seedbox_in_flight: bool,
}

impl Engine {
    fn new(
        backend: Arc<dyn StatusBackend>,
        events: EventBus,
        metrics: Metrics,
        settings: &EngineSettings,
        completions: mpsc::UnboundedSender<Completion>,
        records: watch::Sender<Option<StatusRecord>>,
    ) -> Self {
        Self {
            backend,
            events,
            metrics,
            records,
            completions,
            burst_interval: settings.burst_interval,
            label: None,
            epoch: 0,
            record: None,
            countdown: 0,
            scheduler: PollScheduler::new(settings.burst_threshold),
            burst: None,
            seedbox_in_flight: false,
        }
    }

    /// Activate `label`, discard everything belonging to the previous
    /// session, and refetch. `persist` records the selection on the backend
    /// and is skipped for the initial activation at startup.
    fn switch_session(&mut self, label: Option<String>, persist: bool) {
        self.epoch = self.epoch.wrapping_add(1);
        self.label = label;
        self.apply_record(None);
        self.publish(Event::SessionChanged {
            label: self.label.clone(),
        });
        self.start_fetch(false);

        if persist {
            self.persist_selection();
        }
    }

    /// Record the active label as the backend's last session, best effort.
    fn persist_selection(&self) {
        let Some(label) = self.label.clone() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(error) = backend.persist_last_session(&label).await {
                warn!(%error, label, "failed to persist session selection");
            }
        });
    }

    /// Issue a status fetch under the current epoch.
    fn start_fetch(&self, forced: bool) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        let label = self.label.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let outcome = backend.fetch_status(label.as_deref(), forced).await;
            let _ = completions.send(Completion::Fetch {
                epoch,
                forced,
                outcome,
            });
        });
    }

    fn settle_fetch(&mut self, epoch: u64, forced: bool, outcome: ClientResult<StatusPayload>) {
        if epoch != self.epoch {
            debug!(stale = epoch, current = self.epoch, "discarding status fetch from a previous session");
            self.metrics.inc_race_discard();
            return;
        }

        let transport = matches!(&outcome, Err(error) if error.is_transport());
        let (record, kind) = match outcome {
            Ok(payload) => normalize(payload),
            Err(error) => (StatusRecord::failure(error.display_message()), RecordKind::HardFailure),
        };
        self.metrics.inc_status_fetch(match kind {
            RecordKind::Healthy => "healthy",
            RecordKind::SoftFailure => "rate_limited",
            RecordKind::HardFailure => "failed",
        });

        let soft_notice = record.status_message.clone();
        let hard_notice = record.error.clone();
        self.apply_record(Some(record));

        match kind {
            RecordKind::Healthy => {}
            RecordKind::SoftFailure => {
                if let Some(message) = soft_notice {
                    self.publish(Event::Notice {
                        severity: Severity::Warning,
                        message,
                    });
                }
            }
            RecordKind::HardFailure => {
                if let Some(message) = hard_notice {
                    self.publish(Event::FetchFailed { message, transport });
                }
            }
        }

        if forced {
            self.publish(Event::CheckCompleted {
                severity: Severity::Success,
                message: "Checked now!".to_owned(),
            });
        }
    }

    fn update_seedbox(&mut self) {
        let Some(label) = self.label.clone() else {
            self.publish(Event::Notice {
                severity: Severity::Warning,
                message: "No active session to update.".to_owned(),
            });
            return;
        };
        if self.seedbox_in_flight {
            self.publish(Event::Notice {
                severity: Severity::Info,
                message: "Seedbox update already in progress.".to_owned(),
            });
            return;
        }

        self.seedbox_in_flight = true;
        self.publish(Event::SeedboxUpdateStarted);
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let outcome = backend.update_seedbox(&label).await;
            let _ = completions.send(Completion::Seedbox { epoch, outcome });
        });
    }

    fn settle_seedbox(&mut self, epoch: u64, outcome: ClientResult<SeedboxOutcome>) {
        self.seedbox_in_flight = false;
        if epoch != self.epoch {
            debug!(stale = epoch, current = self.epoch, "discarding seedbox settlement from a previous session");
            self.metrics.inc_race_discard();
            return;
        }

        let (severity, message) = match outcome {
            Ok(outcome) if outcome.success => (Severity::Success, outcome.message),
            Ok(outcome) => (Severity::Warning, outcome.message),
            Err(error) => (Severity::Error, error.display_message()),
        };
        self.metrics.inc_seedbox_update(match severity {
            Severity::Success => "success",
            Severity::Warning => "rejected",
            _ => "error",
        });
        self.publish(Event::SeedboxUpdateSettled { severity, message });

        // The tracker may have recorded a change even when the call reported
        // failure; refresh regardless.
        self.start_fetch(false);
    }

    /// Replace the record wholesale, then let the scheduler and countdown
    /// react to the new value.
    fn apply_record(&mut self, record: Option<StatusRecord>) {
        let transition = self.scheduler.apply_record(record.as_ref(), Utc::now());
        self.record = record;
        let _ = self.records.send(self.record.clone());
        self.publish(Event::StatusUpdated {
            record: self.record.clone(),
        });
        self.apply_transition(transition);
        self.refresh_countdown();
    }

    fn handle_tick(&mut self) {
        let transition = self.scheduler.tick(Utc::now());
        self.apply_transition(transition);
        self.refresh_countdown();
    }

    fn apply_transition(&mut self, transition: Transition) {
        match transition {
            Transition::None => {}
            Transition::StartBurst { baseline } => self.start_burst(baseline),
            Transition::StopBurst => self.stop_burst(),
            Transition::RestartBurst { baseline } => {
                self.stop_burst();
                self.start_burst(baseline);
            }
        }
    }

    fn start_burst(&mut self, baseline: DateTime<Utc>) {
        let first_tick = Instant::now() + self.burst_interval;
        self.burst = Some(time::interval_at(first_tick, self.burst_interval));
        self.metrics.inc_burst_started();
        self.publish(Event::BurstStarted { deadline: baseline });
        debug!(%baseline, "poll burst started");
    }

    fn stop_burst(&mut self) {
        if self.burst.take().is_some() {
            self.publish(Event::BurstStopped);
            debug!("poll burst stopped");
        }
    }

    fn refresh_countdown(&mut self) {
        let deadline = self
            .record
            .as_ref()
            .and_then(StatusRecord::scheduling_deadline);
        let remaining = timer::remaining_seconds(deadline, Utc::now());
        self.metrics.set_countdown_seconds(remaining);
        if remaining != self.countdown {
            self.countdown = remaining;
            self.publish(Event::CountdownTick {
                remaining_seconds: remaining,
            });
        }
    }

    fn publish(&self, event: Event) {
        let _ = self.events.publish(event);
    }
}
