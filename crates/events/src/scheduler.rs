//! Minute ticker for `time_based` automations.
//!
//! [`ScheduleTicker`] runs as a background task and publishes one
//! `time_based` [`TriggerEvent`] per UTC minute. Whether a particular
//! automation's schedule is due is decided downstream, against the event's
//! `occurred_at`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use mailivo_core::trigger::TriggerType;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, TriggerEvent};

/// How often the ticker checks the wall clock.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Source name attached to scheduler events.
pub const SCHEDULER_SOURCE: &str = "scheduler";

// ---------------------------------------------------------------------------
// MinuteClock
// ---------------------------------------------------------------------------

/// Tracks the last minute that was emitted.
#[derive(Debug, Default)]
struct MinuteClock {
    last: Option<DateTime<Utc>>,
}

impl MinuteClock {
    /// The start of `now`'s minute if it has not been emitted yet.
    fn advance(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let minute = now.duration_trunc(TimeDelta::minutes(1)).ok()?;
        if self.last.is_some_and(|last| minute <= last) {
            return None;
        }
        self.last = Some(minute);
        Some(minute)
    }
}

// ---------------------------------------------------------------------------
// ScheduleTicker
// ---------------------------------------------------------------------------

pub struct ScheduleTicker {
    bus: Arc<EventBus>,
    poll_interval: Duration,
}

impl ScheduleTicker {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the ticker loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut clock = MinuteClock::default();

        tracing::info!(poll_ms = self.poll_interval.as_millis() as u64, "Schedule ticker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Schedule ticker cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(minute) = clock.advance(Utc::now()) {
                        let event = TriggerEvent::new(TriggerType::TimeBased)
                            .at(minute)
                            .with_source(SCHEDULER_SOURCE);
                        let receivers = self.bus.publish(event);
                        tracing::debug!(%minute, receivers, "Published time_based tick");
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
