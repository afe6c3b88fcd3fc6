use anyhow::{Context, Result};
use athanconfig::{AppConfig, Config};
use athancontrol::{
    DeviceAddressCache, DeviceDiscovery, FanOut, SsdpDiscovery, UpnpControlTransport,
};
use athanscheduler::{
    AnchorResolver, BroadcastSettings, Broadcaster, DirectoryCatalog, Maintenance, PlaybackGate,
    PrayerCalculator, ResolverFactory, Scheduler, SystemClock, VolumePolicy,
    control_channel::{parse_broker, run_control_channel},
};
use athanserver::{Server, init_logging};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // ========== PHASE 1 : Configuration and logs ==========
    // Optional config directory as first argument, else ATHAN_CONFIG / .athan / ~/.athan
    let config_dir = std::env::args().nth(1).unwrap_or_default();
    let config = Arc::new(Config::load_config(&config_dir).context("Cannot load configuration")?);
    let app = config.app_config()?;

    let log_state = init_logging(&config)?;
    info!("📖 Configuration loaded from {}", config.path());

    // ========== PHASE 2 : Speakers ==========
    let devices = &app.devices;
    let cache = Arc::new(DeviceAddressCache::new(devices.fallback.clone()));
    let discovery: Arc<dyn DeviceDiscovery> = Arc::new(SsdpDiscovery::new(
        devices.search_target.clone(),
        Duration::from_secs(devices.discovery_window_secs),
    ));

    info!("🔍 Initial speaker discovery...");
    cache.refresh(discovery.as_ref()).await;
    info!("🔊 {} speaker address(es) available", cache.current().len());

    // ========== PHASE 3 : Audio server ==========
    let mut server = Server::from_config("Athan", &config);
    server.init_logging_routes(log_state).await;
    {
        let cache = Arc::clone(&cache);
        server
            .add_route("/devices", move || {
                let cache = Arc::clone(&cache);
                async move {
                    serde_json::json!({
                        "current": *cache.current(),
                        "discovered": *cache.discovered(),
                    })
                }
            })
            .await;
    }
    server.start().await?;

    // ========== PHASE 4 : Broadcast and schedule ==========
    let step_timeout = Duration::from_secs(devices.control_timeout_secs);
    let transport = Arc::new(UpnpControlTransport::new(devices.control_port, step_timeout));
    let clock = Arc::new(SystemClock);

    let broadcaster = Broadcaster::new(
        PlaybackGate::new(Duration::from_secs(app.playback.cooldown_secs)),
        Arc::new(DirectoryCatalog::new(config.get_audio_dir())),
        Arc::clone(&cache),
        FanOut::new(transport, step_timeout),
        clock.clone(),
        BroadcastSettings {
            audio_host: config.get_base_url(),
            http_port: server.http_port(),
            volume_policy: VolumePolicy::from(&app.playback),
        },
    );

    let scheduler = Arc::new(Scheduler::new(clock.clone(), Arc::new(broadcaster.clone())));
    let resolver_factory: ResolverFactory =
        Arc::new(|app: &AppConfig| -> Arc<dyn AnchorResolver> {
            Arc::new(PrayerCalculator::from_config(app, chrono::Local))
        });

    let maintenance = Arc::new(Maintenance::new(
        Arc::clone(&config),
        Arc::clone(&scheduler),
        Arc::clone(&cache),
        discovery,
        broadcaster.clone(),
        clock,
        resolver_factory,
    ));
    maintenance.apply(&app);
    let maintenance_handle = maintenance.spawn();

    // ========== PHASE 5 : MQTT control channel ==========
    let control_channel = match app.mqtt_broker() {
        Some(broker) => match parse_broker(broker) {
            Some((host, port)) => Some(tokio::spawn(run_control_channel(
                host,
                port,
                app.mqtt_topic.clone(),
                broadcaster.clone(),
            ))),
            None => {
                warn!("⚠️ Invalid MQTT broker address '{}', control channel disabled", broker);
                None
            }
        },
        None => {
            info!("📴 MQTT control channel disabled");
            None
        }
    };

    info!("✅ Athan is ready ({} event(s) armed)", scheduler.armed());
    wait_for_shutdown().await?;

    info!("🛑 Shutting down");
    if let Some(task) = control_channel {
        task.abort();
    }
    maintenance_handle.shutdown();
    scheduler.clear();
    server.stop();

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Cannot install the SIGTERM handler")?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Cannot listen for SIGINT")?;
            info!("SIGINT received");
        }
        _ = terminate.recv() => info!("SIGTERM received"),
    }
    Ok(())
}
