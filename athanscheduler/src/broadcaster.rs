//! One broadcast cycle: gate → audio → URL → volume → devices → fan-out.

use crate::catalog::AudioCatalog;
use crate::clock::Clock;
use crate::gate::PlaybackGate;
use crate::media_url::audio_url;
use crate::schedule::TriggerSink;
use crate::volume::VolumePolicy;
use athancontrol::{ControlCommand, DeviceAddressCache, DeviceReport, FanOut};
use athanconfig::EventSpec;
use chrono::Timelike;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Snapshot of what one cycle sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastJob {
    pub audio_path: PathBuf,
    pub url: String,
    pub volume: u8,
    pub addresses: Arc<Vec<String>>,
}

#[derive(Debug)]
pub enum CycleReport {
    /// No playable file in the folder
    NoAudio { folder: String },
    /// Neither discovered nor fallback addresses
    NoDevices { url: String },
    Completed {
        job: BroadcastJob,
        devices: Vec<DeviceReport>,
    },
}

/// Where speakers fetch the audio from, and the volume rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSettings {
    pub audio_host: String,
    pub http_port: u16,
    pub volume_policy: VolumePolicy,
}

struct Inner {
    gate: PlaybackGate,
    catalog: Arc<dyn AudioCatalog>,
    cache: Arc<DeviceAddressCache>,
    fanout: FanOut,
    clock: Arc<dyn Clock>,
    settings: RwLock<BroadcastSettings>,
}

/// Cheap to clone handle on the playback pipeline
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    pub fn new(
        gate: PlaybackGate,
        catalog: Arc<dyn AudioCatalog>,
        cache: Arc<DeviceAddressCache>,
        fanout: FanOut,
        clock: Arc<dyn Clock>,
        settings: BroadcastSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate,
                catalog,
                cache,
                fanout,
                clock,
                settings: RwLock::new(settings),
            }),
        }
    }

    pub fn settings(&self) -> BroadcastSettings {
        self.inner.settings.read().clone()
    }

    /// Applies reloaded settings to the next cycles
    pub fn update_settings(&self, settings: BroadcastSettings) {
        *self.inner.settings.write() = settings;
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    /// Starts a cycle in the background unless one started less than a
    /// cooldown ago. Returns whether the request was accepted.
    pub fn request(&self, folder: &str, volume_override: i32) -> bool {
        if !self.inner.gate.try_enter() {
            info!("⏳ Broadcast already running, dropping request for '{}'", folder);
            return false;
        }

        let this = self.clone();
        let folder = folder.to_string();
        tokio::spawn(async move {
            this.broadcast(&folder, volume_override).await;
        });
        true
    }

    /// Gate check then the cycle, awaited. `None` when the gate refused.
    pub async fn trigger(&self, folder: &str, volume_override: i32) -> Option<CycleReport> {
        if !self.inner.gate.try_enter() {
            info!("⏳ Broadcast already running, dropping request for '{}'", folder);
            return None;
        }
        Some(self.broadcast(folder, volume_override).await)
    }

    /// The cycle itself. Callers hold the gate.
    pub async fn broadcast(&self, folder: &str, volume_override: i32) -> CycleReport {
        let inner = &self.inner;
        let settings = self.settings();

        let Some(item) = inner.catalog.pick(folder) else {
            warn!("⚠️ No audio file in folder '{}', aborting broadcast", folder);
            return CycleReport::NoAudio {
                folder: folder.to_string(),
            };
        };

        let url = audio_url(&settings.audio_host, settings.http_port, &item.relative_path);
        let hour = inner.clock.now().hour();
        let volume = settings.volume_policy.effective(volume_override, hour);

        let addresses = inner.cache.current();
        if addresses.is_empty() {
            warn!("⚠️ No speaker address known, aborting broadcast of {}", url);
            return CycleReport::NoDevices { url };
        }

        info!(
            "🔊 Broadcasting {} at volume {} to {} speaker(s)",
            url,
            volume,
            addresses.len()
        );

        let job = BroadcastJob {
            audio_path: item.file_path,
            url,
            volume,
            addresses,
        };
        let sequence = ControlCommand::broadcast_sequence(job.volume, &job.url);
        let devices = inner.fanout.run(&job.addresses, &sequence).await;

        CycleReport::Completed { job, devices }
    }
}

impl TriggerSink for Broadcaster {
    fn fire(&self, event: &EventSpec) {
        self.request(&event.folder, event.volume);
    }
}
