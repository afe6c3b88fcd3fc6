#![allow(dead_code)]

use async_trait::async_trait;
use athancontrol::{
    ControlCommand, ControlError, ControlTransport, DeviceAddressCache, DeviceDiscovery, FanOut,
};
use athanconfig::{EventSpec, Location};
use athanscheduler::{
    AnchorError, AnchorResolver, AnchorTimes, BroadcastSettings, Broadcaster, Clock,
    DirectoryCatalog, PlaybackGate, VolumePolicy,
};
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const AUDIO_HOST: &str = "10.0.0.2";
pub const HTTP_PORT: u16 = 8080;

/// Records every control call; addresses in `failing` reject everything,
/// addresses in `stalled` never answer
#[derive(Default)]
pub struct RecordingTransport {
    pub failing: Vec<String>,
    pub stalled: Vec<String>,
    pub calls: Mutex<Vec<(String, ControlCommand)>>,
}

impl RecordingTransport {
    pub fn failing(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn stalled(addresses: &[&str]) -> Self {
        Self {
            stalled: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls_for(&self, address: &str) -> Vec<ControlCommand> {
        self.calls
            .lock()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ControlTransport for RecordingTransport {
    async fn execute(&self, address: &str, command: &ControlCommand) -> Result<(), ControlError> {
        self.calls
            .lock()
            .push((address.to_string(), command.clone()));
        if self.stalled.iter().any(|a| a == address) {
            std::future::pending::<()>().await;
        }
        if self.failing.iter().any(|a| a == address) {
            return Err(ControlError::HttpStatus {
                action: command.action().to_string(),
                status: 500,
                body: String::new(),
            });
        }
        Ok(())
    }
}

/// Discovery answering a fixed list
pub struct StaticDiscovery(pub Vec<String>);

#[async_trait]
impl DeviceDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<String>, ControlError> {
        Ok(self.0.clone())
    }
}

/// Resolver returning the same anchors whatever the date
pub struct FixtureResolver(pub Vec<(athanscheduler::Anchor, (u32, u32))>);

impl AnchorResolver for FixtureResolver {
    fn resolve(&self, date: NaiveDate, _location: &Location) -> Result<AnchorTimes, AnchorError> {
        let mut times = AnchorTimes::new(date);
        for (anchor, (h, m)) in &self.0 {
            let at = date.and_hms_opt(*h, *m, 0).ok_or_else(|| AnchorError::Unresolvable {
                date,
                reason: "bad fixture".to_string(),
            })?;
            times.insert(*anchor, at);
        }
        Ok(times)
    }
}

pub fn location() -> Location {
    Location {
        latitude: 52.52,
        longitude: 13.405,
        elevation: 34.0,
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    day().and_hms_opt(h, m, 0).unwrap()
}

pub fn event(name: &str, base: &str, offset: i32, folder: &str, volume: i32) -> EventSpec {
    EventSpec {
        name: name.to_string(),
        base: base.to_string(),
        offset,
        folder: folder.to_string(),
        volume,
    }
}

/// Audio tree with `fajr/adhan.mp3`, `morning_adhkar/adhkar.wav`,
/// `root.mp3` and an empty `silent/` folder
pub fn audio_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("fajr")).unwrap();
    fs::create_dir_all(dir.path().join("morning_adhkar")).unwrap();
    fs::create_dir_all(dir.path().join("silent")).unwrap();
    File::create(dir.path().join("fajr").join("adhan.mp3")).unwrap();
    File::create(dir.path().join("morning_adhkar").join("adhkar.wav")).unwrap();
    File::create(dir.path().join("root.mp3")).unwrap();
    dir
}

pub fn broadcaster(
    audio: &TempDir,
    cache: Arc<DeviceAddressCache>,
    transport: Arc<RecordingTransport>,
    clock: Arc<dyn Clock>,
) -> Broadcaster {
    broadcaster_with_step_timeout(audio, cache, transport, clock, Duration::from_secs(10))
}

pub fn broadcaster_with_step_timeout(
    audio: &TempDir,
    cache: Arc<DeviceAddressCache>,
    transport: Arc<RecordingTransport>,
    clock: Arc<dyn Clock>,
    step_timeout: Duration,
) -> Broadcaster {
    Broadcaster::new(
        PlaybackGate::new(Duration::from_secs(60)),
        Arc::new(DirectoryCatalog::new(audio.path())),
        cache,
        FanOut::new(transport, step_timeout),
        clock,
        BroadcastSettings {
            audio_host: AUDIO_HOST.to_string(),
            http_port: HTTP_PORT,
            volume_policy: VolumePolicy::default(),
        },
    )
}
