//! # athanscheduler - when to broadcast, and what
//!
//! - [`anchors`] / [`prayer`] : daily time anchors and the prayer-time calculator
//! - [`schedule`] : events → fire times → daily triggers
//! - [`gate`] : one broadcast start per cooldown window
//! - [`broadcaster`] : the playback cycle (audio pick, URL, volume, fan-out)
//! - [`maintenance`] : daily rebuild and periodic device refresh
//! - [`control_channel`] : MQTT remote trigger

pub mod anchors;
pub mod broadcaster;
pub mod catalog;
pub mod clock;
pub mod control_channel;
pub mod gate;
pub mod maintenance;
pub mod media_url;
pub mod prayer;
pub mod schedule;
pub mod volume;

pub use anchors::{Anchor, AnchorError, AnchorResolver, AnchorTimes};
pub use broadcaster::{BroadcastJob, BroadcastSettings, Broadcaster, CycleReport};
pub use catalog::{AudioCatalog, AudioItem, DirectoryCatalog};
pub use clock::{Clock, FixedClock, SimulatedClock, SystemClock, until_next};
pub use gate::PlaybackGate;
pub use maintenance::{Maintenance, MaintenanceHandle, ResolverFactory};
pub use media_url::audio_url;
pub use prayer::PrayerCalculator;
pub use schedule::{
    AnchorRef, ResolvedSchedule, ScheduleError, ScheduledEvent, Scheduler, SkippedEvent,
    TriggerSink, build_schedule,
};
pub use volume::VolumePolicy;
