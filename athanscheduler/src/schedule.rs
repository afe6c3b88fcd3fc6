//! Daily schedule: configured events → fire times → armed triggers.

use crate::anchors::{Anchor, AnchorResolver, AnchorTimes};
use crate::clock::{Clock, until_next};
use athanconfig::{EventSpec, Location};
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What an event's `base` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRef {
    Symbolic(Anchor),
    Clock(NaiveTime),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown anchor '{0}'")]
    UnknownAnchor(String),
    #[error("malformed clock time '{0}' (expected HH:MM)")]
    MalformedTime(String),
    #[error("anchor {0} is not available today")]
    AnchorUnavailable(Anchor),
}

impl AnchorRef {
    /// `"HH:MM"` is a clock time, anything else must name an anchor
    pub fn parse(base: &str) -> Result<Self, ScheduleError> {
        let base = base.trim();
        if base.contains(':') {
            return NaiveTime::parse_from_str(base, "%H:%M")
                .map(AnchorRef::Clock)
                .map_err(|_| ScheduleError::MalformedTime(base.to_string()));
        }
        base.parse::<Anchor>()
            .map(AnchorRef::Symbolic)
            .map_err(|_| ScheduleError::UnknownAnchor(base.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub event: EventSpec,
    /// Hour and minute of the daily trigger, seconds are always 0
    pub fire_at: NaiveTime,
    /// The offset moved the time over midnight; it fires on the
    /// neighbouring night at `fire_at`
    pub wrapped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub name: String,
    pub reason: String,
}

/// Fire times of one day, in configuration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub date: NaiveDate,
    pub events: Vec<ScheduledEvent>,
    pub skipped: Vec<SkippedEvent>,
}

/// Computes the fire times of `events` on `date`.
///
/// The resolver is only consulted when an event uses a symbolic anchor. If
/// it fails, those events are skipped and clock-time events still are
/// scheduled.
pub fn build_schedule(
    events: &[EventSpec],
    date: NaiveDate,
    location: &Location,
    resolver: &dyn AnchorResolver,
) -> ResolvedSchedule {
    let refs: Vec<Result<AnchorRef, ScheduleError>> =
        events.iter().map(|e| AnchorRef::parse(&e.base)).collect();

    let needs_anchors = refs
        .iter()
        .any(|r| matches!(r, Ok(AnchorRef::Symbolic(_))));
    let anchors: Option<AnchorTimes> = if needs_anchors {
        match resolver.resolve(date, location) {
            Ok(times) => Some(times),
            Err(e) => {
                warn!("⚠️ No anchors for {}: {}", date, e);
                None
            }
        }
    } else {
        None
    };

    let mut schedule = ResolvedSchedule {
        date,
        events: Vec::new(),
        skipped: Vec::new(),
    };

    for (event, anchor_ref) in events.iter().zip(refs) {
        let resolved = anchor_ref.and_then(|r| fire_time(r, event.offset, date, anchors.as_ref()));
        match resolved {
            Ok((fire_at, wrapped)) => {
                if wrapped {
                    warn!(
                        "⚠️ {} ({} {:+} min) crosses midnight, firing at {}",
                        event.name,
                        event.base,
                        event.offset,
                        fire_at.format("%H:%M")
                    );
                }
                schedule.events.push(ScheduledEvent {
                    event: event.clone(),
                    fire_at,
                    wrapped,
                });
            }
            Err(reason) => {
                warn!("⚠️ Skipping event '{}': {}", event.name, reason);
                schedule.skipped.push(SkippedEvent {
                    name: event.name.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    schedule
}

fn fire_time(
    anchor_ref: AnchorRef,
    offset: i32,
    date: NaiveDate,
    anchors: Option<&AnchorTimes>,
) -> Result<(NaiveTime, bool), ScheduleError> {
    match anchor_ref {
        AnchorRef::Clock(time) => Ok((truncate_seconds(time), false)),
        AnchorRef::Symbolic(anchor) => {
            let base = anchors
                .and_then(|a| a.get(anchor))
                .ok_or(ScheduleError::AnchorUnavailable(anchor))?;
            let target = base + Duration::minutes(i64::from(offset));
            Ok((truncate_seconds(target.time()), target.date() != date))
        }
    }
}

fn truncate_seconds(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Receives the events whose time has come. Must not block.
pub trait TriggerSink: Send + Sync {
    fn fire(&self, event: &EventSpec);
}

/// Armed triggers of one schedule. Dropping the table cancels them.
struct TriggerTable {
    schedule: ResolvedSchedule,
    handles: Vec<JoinHandle<()>>,
}

impl Drop for TriggerTable {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Owns the daily trigger table and swaps it on every rebuild
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TriggerSink>,
    table: Mutex<Option<TriggerTable>>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn TriggerSink>) -> Self {
        Self {
            clock,
            sink,
            table: Mutex::new(None),
        }
    }

    /// Computes today's schedule and replaces the armed triggers with it.
    /// Must run inside a tokio runtime.
    pub fn rebuild(
        &self,
        events: &[EventSpec],
        location: &Location,
        resolver: &dyn AnchorResolver,
    ) -> ResolvedSchedule {
        let today = self.clock.now().date();
        let schedule = build_schedule(events, today, location, resolver);
        self.install(schedule.clone());
        schedule
    }

    /// Arms one daily trigger per event. The previous triggers are
    /// cancelled under the same lock, so two tables never coexist.
    pub fn install(&self, schedule: ResolvedSchedule) {
        let mut table = self.table.lock();
        if let Some(old) = table.take() {
            debug!("Cancelling {} trigger(s) of {}", old.handles.len(), old.schedule.date);
            drop(old);
        }

        let handles = schedule
            .events
            .iter()
            .map(|scheduled| {
                info!(
                    "📅 Scheduled: {:<15} at {} (vol: {})",
                    scheduled.event.name,
                    scheduled.fire_at.format("%H:%M"),
                    scheduled.event.volume
                );
                tokio::spawn(trigger_loop(
                    Arc::clone(&self.clock),
                    Arc::clone(&self.sink),
                    scheduled.event.clone(),
                    scheduled.fire_at,
                ))
            })
            .collect();

        info!(
            "✅ {} event(s) armed for {}, {} skipped",
            schedule.events.len(),
            schedule.date,
            schedule.skipped.len()
        );
        *table = Some(TriggerTable { schedule, handles });
    }

    pub fn current(&self) -> Option<ResolvedSchedule> {
        self.table.lock().as_ref().map(|t| t.schedule.clone())
    }

    pub fn armed(&self) -> usize {
        self.table
            .lock()
            .as_ref()
            .map(|t| t.handles.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Cancels every trigger
    pub fn clear(&self) {
        self.table.lock().take();
    }
}

async fn trigger_loop(
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TriggerSink>,
    event: EventSpec,
    at: NaiveTime,
) {
    loop {
        let wait = until_next(clock.now(), at);
        tokio::time::sleep(wait).await;
        info!("⏰ {} ({})", event.name, at.format("%H:%M"));
        sink.fire(&event);
    }
}
