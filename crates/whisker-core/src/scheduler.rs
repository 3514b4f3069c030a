//! Deadline-driven poll scheduling.
//!
//! The scheduler concentrates background fetches in the short window where
//! the backend is expected to run its next check. Far from the deadline it
//! does nothing; once the countdown drops below the threshold it opens a
//! burst of fixed-interval fetches that runs until the deadline visibly
//! moves. Deadline movement, not a guessed delay, is the stop signal.

use chrono::{DateTime, Utc};
use std::time::Duration;
use whisker_model::StatusRecord;

use crate::timer;

/// Where the scheduler currently stands. At most one burst exists at a time;
/// the state owns its identity via the captured baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollState {
    /// No record, unconfigured session, or no usable deadline.
    Idle,
    /// A future deadline is known but still comfortably far away.
    Armed { deadline: DateTime<Utc> },
    /// Fast polling is active. `baseline` is the deadline observed when the
    /// burst began; any differing deadline ends it.
    Bursting { baseline: DateTime<Utc> },
}

/// Scheduling consequence of an applied record or a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Nothing for the engine to do.
    None,
    /// Open a burst against the given baseline deadline.
    StartBurst { baseline: DateTime<Utc> },
    /// Tear the active burst down.
    StopBurst,
    /// The deadline moved but the new one is already imminent: tear the
    /// burst down and open a fresh one against the new baseline.
    RestartBurst { baseline: DateTime<Utc> },
}

pub(crate) struct PollScheduler {
    threshold_seconds: u64,
    state: PollState,
}

impl PollScheduler {
    pub(crate) const fn new(threshold: Duration) -> Self {
        Self {
            threshold_seconds: threshold.as_secs(),
            state: PollState::Idle,
        }
    }

    /// React to an applied record (or a cleared one on session switch).
    pub(crate) fn apply_record(
        &mut self,
        record: Option<&StatusRecord>,
        now: DateTime<Utc>,
    ) -> Transition {
        let Some(record) = record else {
            return self.disarm();
        };
        if record.error.is_some() {
            // A failed check carries no usable deadline. An active burst
            // keeps probing against its baseline; the deadline only counts
            // as moved once a healthy record says so.
            return match self.state {
                PollState::Bursting { .. } => Transition::None,
                PollState::Idle | PollState::Armed { .. } => self.disarm(),
            };
        }
        let Some(deadline) = record.scheduling_deadline() else {
            return self.disarm();
        };
        match self.state {
            PollState::Bursting { baseline } if deadline == baseline => Transition::None,
            PollState::Bursting { .. } => {
                if self.within_threshold(deadline, now) {
                    self.state = PollState::Bursting { baseline: deadline };
                    Transition::RestartBurst { baseline: deadline }
                } else {
                    self.state = PollState::Armed { deadline };
                    Transition::StopBurst
                }
            }
            PollState::Idle | PollState::Armed { .. } => {
                if self.within_threshold(deadline, now) {
                    self.state = PollState::Bursting { baseline: deadline };
                    Transition::StartBurst { baseline: deadline }
                } else {
                    self.state = PollState::Armed { deadline };
                    Transition::None
                }
            }
        }
    }

    /// Re-measure the distance to the deadline on a timer tick.
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> Transition {
        match self.state {
            PollState::Armed { deadline } if self.within_threshold(deadline, now) => {
                self.state = PollState::Bursting { baseline: deadline };
                Transition::StartBurst { baseline: deadline }
            }
            PollState::Bursting { baseline } if !self.within_threshold(baseline, now) => {
                // Only a clock correction can push a fixed baseline back out
                // of range; fall back to waiting.
                self.state = PollState::Armed { deadline: baseline };
                Transition::StopBurst
            }
            _ => Transition::None,
        }
    }

    fn disarm(&mut self) -> Transition {
        let transition = match self.state {
            PollState::Bursting { .. } => Transition::StopBurst,
            PollState::Idle | PollState::Armed { .. } => Transition::None,
        };
        self.state = PollState::Idle;
        transition
    }

    fn within_threshold(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timer::remaining_seconds(Some(deadline), now) <= self.threshold_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const THRESHOLD: Duration = Duration::from_secs(10);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn record_with_deadline(deadline: DateTime<Utc>) -> StatusRecord {
        StatusRecord {
            next_check_time: Some(deadline),
            ..StatusRecord::default()
        }
    }

    #[test]
    fn far_deadline_arms_without_polling() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(3600);
        let transition = scheduler.apply_record(Some(&record_with_deadline(deadline)), now());
        assert_eq!(transition, Transition::None);
        assert_eq!(scheduler.state, PollState::Armed { deadline });
    }

    #[test]
    fn imminent_deadline_starts_a_burst_immediately() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        let transition = scheduler.apply_record(Some(&record_with_deadline(deadline)), now());
        assert_eq!(transition, Transition::StartBurst { baseline: deadline });
        assert_eq!(scheduler.state, PollState::Bursting { baseline: deadline });
    }

    #[test]
    fn tick_crossing_the_threshold_starts_a_burst() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(60);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        assert_eq!(
            scheduler.tick(now() + chrono::Duration::seconds(30)),
            Transition::None
        );
        assert_eq!(
            scheduler.tick(now() + chrono::Duration::seconds(50)),
            Transition::StartBurst { baseline: deadline }
        );
    }

    #[test]
    fn unchanged_deadline_keeps_the_burst_running() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        let transition = scheduler.apply_record(Some(&record_with_deadline(deadline)), now());
        assert_eq!(transition, Transition::None);
        assert_eq!(scheduler.state, PollState::Bursting { baseline: deadline });
    }

    #[test]
    fn moved_deadline_ends_the_burst() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let near = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(near)), now());

        let far = now() + chrono::Duration::seconds(1800);
        let transition = scheduler.apply_record(Some(&record_with_deadline(far)), now());
        assert_eq!(transition, Transition::StopBurst);
        assert_eq!(scheduler.state, PollState::Armed { deadline: far });
    }

    #[test]
    fn moved_deadline_still_imminent_restarts_the_burst() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let first = now() + chrono::Duration::seconds(4);
        scheduler.apply_record(Some(&record_with_deadline(first)), now());

        let second = now() + chrono::Duration::seconds(9);
        let transition = scheduler.apply_record(Some(&record_with_deadline(second)), now());
        assert_eq!(transition, Transition::RestartBurst { baseline: second });
        assert_eq!(scheduler.state, PollState::Bursting { baseline: second });
    }

    #[test]
    fn failed_check_keeps_an_active_burst_probing() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        let failed = StatusRecord::failure("tracker unreachable");
        let transition = scheduler.apply_record(Some(&failed), now());
        assert_eq!(transition, Transition::None);
        assert_eq!(scheduler.state, PollState::Bursting { baseline: deadline });
    }

    #[test]
    fn failed_check_outside_a_burst_disarms() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(3600);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        let failed = StatusRecord::failure("tracker unreachable");
        let transition = scheduler.apply_record(Some(&failed), now());
        assert_eq!(transition, Transition::None);
        assert_eq!(scheduler.state, PollState::Idle);
    }

    #[test]
    fn unconfigured_record_stops_everything() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        let unconfigured = StatusRecord {
            configured: false,
            next_check_time: Some(deadline),
            ..StatusRecord::default()
        };
        let transition = scheduler.apply_record(Some(&unconfigured), now());
        assert_eq!(transition, Transition::StopBurst);
        assert_eq!(scheduler.state, PollState::Idle);
    }

    #[test]
    fn cleared_record_resets_to_idle() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        assert_eq!(scheduler.apply_record(None, now()), Transition::StopBurst);
        assert_eq!(scheduler.state, PollState::Idle);

        assert_eq!(scheduler.apply_record(None, now()), Transition::None);
    }

    #[test]
    fn clock_correction_backs_out_of_a_burst() {
        let mut scheduler = PollScheduler::new(THRESHOLD);
        let deadline = now() + chrono::Duration::seconds(5);
        scheduler.apply_record(Some(&record_with_deadline(deadline)), now());

        let rewound = now() - chrono::Duration::seconds(300);
        assert_eq!(scheduler.tick(rewound), Transition::StopBurst);
        assert_eq!(scheduler.state, PollState::Armed { deadline });
    }
}
