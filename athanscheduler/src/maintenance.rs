//! Daily schedule rebuild and periodic device refresh.

use crate::anchors::AnchorResolver;
use crate::broadcaster::Broadcaster;
use crate::clock::{Clock, until_next};
use crate::schedule::{ResolvedSchedule, Scheduler};
use crate::volume::VolumePolicy;
use anyhow::{Context, Result};
use athancontrol::{DeviceAddressCache, DeviceDiscovery, RefreshOutcome};
use athanconfig::{AppConfig, Config};
use athanconfig::app::{DEFAULT_REBUILD_HOUR, DEFAULT_REFRESH_MINUTES};
use chrono::NaiveTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Builds the resolver matching a configuration snapshot
pub type ResolverFactory = Arc<dyn Fn(&AppConfig) -> Arc<dyn AnchorResolver> + Send + Sync>;

pub struct Maintenance {
    config: Arc<Config>,
    scheduler: Arc<Scheduler>,
    cache: Arc<DeviceAddressCache>,
    discovery: Arc<dyn DeviceDiscovery>,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    resolver_factory: ResolverFactory,
}

impl Maintenance {
    pub fn new(
        config: Arc<Config>,
        scheduler: Arc<Scheduler>,
        cache: Arc<DeviceAddressCache>,
        discovery: Arc<dyn DeviceDiscovery>,
        broadcaster: Broadcaster,
        clock: Arc<dyn Clock>,
        resolver_factory: ResolverFactory,
    ) -> Self {
        Self {
            config,
            scheduler,
            cache,
            discovery,
            broadcaster,
            clock,
            resolver_factory,
        }
    }

    /// Reloads the configuration and rebuilds today's schedule.
    ///
    /// A configuration that fails to reload is reported and the previous
    /// one is used.
    pub fn rebuild(&self) -> Result<ResolvedSchedule> {
        if let Err(e) = self.config.reload() {
            warn!("⚠️ Configuration reload failed, keeping the previous one: {:#}", e);
        }
        let app = self
            .config
            .app_config()
            .context("Cannot read the configuration for the rebuild")?;
        Ok(self.apply(&app))
    }

    /// Rebuilds the schedule from an already loaded configuration
    pub fn apply(&self, app: &AppConfig) -> ResolvedSchedule {
        self.cache.set_fallback(app.devices.fallback.clone());

        let mut settings = self.broadcaster.settings();
        settings.volume_policy = VolumePolicy::from(&app.playback);
        self.broadcaster.update_settings(settings);

        let resolver = (self.resolver_factory)(app);
        self.scheduler
            .rebuild(&app.events, &app.location, resolver.as_ref())
    }

    pub async fn refresh_devices(&self) -> RefreshOutcome {
        self.cache.refresh(self.discovery.as_ref()).await
    }

    fn rebuild_time(&self) -> NaiveTime {
        let hour = self
            .config
            .app_config()
            .map(|app| app.schedule.rebuild_hour)
            .unwrap_or(DEFAULT_REBUILD_HOUR);
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }

    fn refresh_period(&self) -> Duration {
        let minutes = self
            .config
            .app_config()
            .map(|app| app.devices.refresh_minutes)
            .unwrap_or(DEFAULT_REFRESH_MINUTES)
            .max(1);
        Duration::from_secs(minutes * 60)
    }

    /// Starts the two maintenance loops. The refresh loop waits one period
    /// before its first discovery.
    pub fn spawn(self: Arc<Self>) -> MaintenanceHandle {
        let daily = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                loop {
                    let at = this.rebuild_time();
                    tokio::time::sleep(until_next(this.clock.now(), at)).await;
                    info!("🌙 Daily rebuild");
                    if let Err(e) = this.rebuild() {
                        error!("❌ Daily rebuild failed: {:#}", e);
                    }
                }
            })
        };

        let refresh = {
            let this = Arc::clone(&self);
            let period = this.refresh_period();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    this.refresh_devices().await;
                }
            })
        };

        info!(
            "🕑 Maintenance started (rebuild at {}, device refresh every {:?})",
            self.rebuild_time().format("%H:%M"),
            self.refresh_period()
        );
        MaintenanceHandle {
            handles: vec![daily, refresh],
        }
    }
}

/// Running maintenance loops; dropping it stops them
pub struct MaintenanceHandle {
    handles: Vec<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
