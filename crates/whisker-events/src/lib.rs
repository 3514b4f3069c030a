//! Event bus for the whisker status engine.
//!
//! Engine state changes fan out to observers as typed [`Event`]s wrapped in
//! an [`EventEnvelope`] carrying a sequential id and a UTC timestamp. A
//! bounded replay ring lets an observer that reconnects (a watch view that
//! remembers the last id it rendered) catch up before switching to live
//! delivery. Fan-out rides on `tokio::broadcast`, so a slow subscriber loses
//! the oldest undelivered events rather than stalling the engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use whisker_model::{Severity, StatusRecord};

/// Identifier assigned to each event emitted by the engine.
pub type EventId = u64;

/// How many envelopes the replay ring retains.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed domain events surfaced by the status engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The canonical record changed. `None` means the record was cleared,
    /// which happens while a session switch is in flight.
    StatusUpdated {
        record: Option<StatusRecord>,
    },
    /// Seconds remaining until the next scheduled check. Emitted only when
    /// the displayed value changes.
    CountdownTick {
        remaining_seconds: u64,
    },
    /// The active session label changed. `None` selects the backend default.
    SessionChanged {
        label: Option<String>,
    },
    /// A status fetch could not produce a record. `transport` distinguishes
    /// connection-level failures from undecodable responses.
    FetchFailed {
        message: String,
        transport: bool,
    },
    /// A manually requested check finished and its result was applied.
    CheckCompleted {
        severity: Severity,
        message: String,
    },
    SeedboxUpdateStarted,
    /// The seedbox update finished, successfully or not.
    SeedboxUpdateSettled {
        severity: Severity,
        message: String,
    },
    /// Free-form notice for subscribers that render a message feed.
    Notice {
        severity: Severity,
        message: String,
    },
    /// The scheduler entered its fast-polling window for the given deadline.
    BurstStarted {
        deadline: DateTime<Utc>,
    },
    BurstStopped,
}

impl Event {
    /// Machine-friendly discriminator for feed consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Event::StatusUpdated { .. } => "status_updated",
            Event::CountdownTick { .. } => "countdown_tick",
            Event::SessionChanged { .. } => "session_changed",
            Event::FetchFailed { .. } => "fetch_failed",
            Event::CheckCompleted { .. } => "check_completed",
            Event::SeedboxUpdateStarted => "seedbox_update_started",
            Event::SeedboxUpdateSettled { .. } => "seedbox_update_settled",
            Event::Notice { .. } => "notice",
            Event::BurstStarted { .. } => "burst_started",
            Event::BurstStopped => "burst_stopped",
        }
    }
}

/// An [`Event`] plus the id and timestamp assigned at publish time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

/// Cloneable handle to the engine's broadcast bus.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    ring: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl EventBus {
    /// Build a bus retaining up to `capacity` envelopes for replay. The
    /// broadcast channel is sized to match, so the ring and the live channel
    /// drop history at the same depth.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity,
        }
    }

    /// Build a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Assign the next id, retain the envelope for replay, and fan out.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut ring = self.ring.lock().expect("event ring mutex poisoned");
            while ring.len() >= self.capacity {
                ring.pop_front();
            }
            ring.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Open a stream that replays retained envelopes newer than `since_id`
    /// before yielding live events.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let replay = match since_id {
            Some(since) => {
                let ring = self.ring.lock().expect("event ring mutex poisoned");
                ring.iter()
                    .filter(|envelope| envelope.id > since)
                    .cloned()
                    .collect()
            }
            None => VecDeque::new(),
        };

        EventStream {
            replay,
            receiver: self.sender.subscribe(),
        }
    }

    /// Id of the most recently published event, if any.
    ///
    /// # Panics
    ///
    /// Panics if the replay ring mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let ring = self.ring.lock().expect("event ring mutex poisoned");
        ring.back().map(|envelope| envelope.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered event stream for one subscriber: replayed backlog first, live
/// broadcast after.
pub struct EventStream {
    replay: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Yield the next envelope, or `None` once every bus handle is gone.
    ///
    /// A subscriber that falls behind the broadcast buffer skips ahead to the
    /// oldest envelope still retained; the skipped ones are lost to it.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.replay.pop_front() {
            return Some(envelope);
        }

        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task;
    use tokio::time::timeout;

    const PUBLISH_WINDOW: Duration = Duration::from_secs(5);

    fn tick_event(seconds: usize) -> Event {
        Event::CountdownTick {
            remaining_seconds: seconds as u64,
        }
    }

    #[tokio::test]
    async fn replay_skips_already_seen_events() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(tick_event(i));
        }
        assert_eq!(last_id, 5);
        assert_eq!(bus.last_event_id(), Some(5));

        let mut stream = bus.subscribe(Some(2));
        let mut replayed = Vec::new();
        for _ in 0..3 {
            replayed.extend(stream.next().await);
        }

        let ids: Vec<_> = replayed.iter().map(|envelope| envelope.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn serialized_tag_matches_kind() {
        let event = Event::SessionChanged {
            label: Some("alt".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["label"], "alt");
    }

    #[tokio::test]
    async fn publishers_do_not_stall_under_load() {
        let bus = Arc::new(EventBus::with_capacity(512));
        let mut stream = bus.subscribe(None);

        let publisher = {
            let bus = bus.clone();
            task::spawn(async move {
                timeout(PUBLISH_WINDOW, async move {
                    for i in 0..500 {
                        let _ = bus.publish(tick_event(i));
                    }
                })
                .await
                .expect("publishing stalled");
            })
        };

        let consumer = task::spawn(async move {
            let mut seen = HashSet::new();
            while seen.len() < 500 {
                match stream.next().await {
                    Some(envelope) => {
                        seen.insert(envelope.id);
                    }
                    None => break,
                }
            }
            seen
        });

        publisher.await.expect("publisher task panicked");
        let seen = consumer.await.expect("consumer task panicked");
        assert_eq!(seen.len(), 500);
    }
}
