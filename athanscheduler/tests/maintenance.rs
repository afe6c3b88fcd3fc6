mod common;

use athancontrol::DeviceAddressCache;
use athanconfig::{AppConfig, Config};
use athanscheduler::{
    Anchor, AnchorResolver, FixedClock, Maintenance, ResolverFactory, Scheduler, SimulatedClock,
};
use common::*;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CONFIG: &str = r#"
athan:
  location:
    latitude: 52.52
    longitude: 13.405
  devices:
    fallback: ["10.0.0.50"]
    refresh_minutes: 15
  playback:
    night_volume: 3
  events:
    - name: Fajr
      base: fajr
      folder: fajr
    - name: Morning
      base: "07:00"
      folder: morning_adhkar
"#;

const CONFIG_RELOADED: &str = r#"
athan:
  location:
    latitude: 52.52
    longitude: 13.405
  devices:
    fallback: ["10.0.0.60", "10.0.0.61"]
  events:
    - name: Fajr
      base: fajr
      offset: -5
      folder: fajr
"#;

struct Fixture {
    config_dir: TempDir,
    _audio: TempDir,
    cache: Arc<DeviceAddressCache>,
    scheduler: Arc<Scheduler>,
    broadcaster: athanscheduler::Broadcaster,
    maintenance: Arc<Maintenance>,
}

fn fixture(clock: Arc<dyn athanscheduler::Clock>, discovered: &[&str]) -> Fixture {
    let config_dir = tempfile::tempdir().unwrap();
    fs::write(config_dir.path().join("config.yaml"), CONFIG).unwrap();
    let config = Arc::new(Config::load_config(config_dir.path().to_str().unwrap()).unwrap());

    let audio = audio_tree();
    let cache = Arc::new(DeviceAddressCache::new(Vec::new()));
    let transport = Arc::new(RecordingTransport::default());
    let broadcaster = broadcaster(&audio, cache.clone(), transport, clock.clone());
    let scheduler = Arc::new(Scheduler::new(clock.clone(), Arc::new(broadcaster.clone())));

    let factory: ResolverFactory = Arc::new(|_app: &AppConfig| {
        Arc::new(FixtureResolver(vec![(Anchor::Fajr, (5, 12))])) as Arc<dyn AnchorResolver>
    });
    let discovery = Arc::new(StaticDiscovery(
        discovered.iter().map(|s| s.to_string()).collect(),
    ));

    let maintenance = Arc::new(Maintenance::new(
        config,
        scheduler.clone(),
        cache.clone(),
        discovery,
        broadcaster.clone(),
        clock,
        factory,
    ));

    Fixture {
        config_dir,
        _audio: audio,
        cache,
        scheduler,
        broadcaster,
        maintenance,
    }
}

#[tokio::test]
async fn test_rebuild_applies_configuration() {
    let f = fixture(Arc::new(FixedClock(at(1, 0))), &[]);

    let schedule = f.maintenance.rebuild().unwrap();
    assert_eq!(schedule.events.len(), 2);
    assert_eq!(*f.cache.current(), vec!["10.0.0.50".to_string()]);
    assert_eq!(f.broadcaster.settings().volume_policy.night_volume, 3);
}

#[tokio::test]
async fn test_rebuild_picks_up_edited_configuration() {
    let f = fixture(Arc::new(FixedClock(at(1, 0))), &[]);
    f.maintenance.rebuild().unwrap();

    fs::write(f.config_dir.path().join("config.yaml"), CONFIG_RELOADED).unwrap();
    let schedule = f.maintenance.rebuild().unwrap();

    assert_eq!(schedule.events.len(), 1);
    assert_eq!(schedule.events[0].fire_at.format("%H:%M").to_string(), "05:07");
    assert_eq!(
        *f.cache.current(),
        vec!["10.0.0.60".to_string(), "10.0.0.61".to_string()]
    );
    assert_eq!(f.scheduler.current(), Some(schedule));
}

#[tokio::test]
async fn test_broken_configuration_keeps_previous() {
    let f = fixture(Arc::new(FixedClock(at(1, 0))), &[]);
    f.maintenance.rebuild().unwrap();

    fs::write(f.config_dir.path().join("config.yaml"), "athan: [not: valid").unwrap();
    let schedule = f.maintenance.rebuild().unwrap();

    assert_eq!(schedule.events.len(), 2);
    assert_eq!(*f.cache.current(), vec!["10.0.0.50".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_loops_rebuild_daily_and_refresh_periodically() {
    let clock = Arc::new(SimulatedClock::starting_at(at(1, 0)));
    let f = fixture(clock, &["10.0.0.7"]);
    let _handle = f.maintenance.clone().spawn();

    // no discovery before the first period
    tokio::time::sleep(Duration::from_secs(14 * 60)).await;
    assert!(f.cache.discovered().is_empty());

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(*f.cache.discovered(), vec!["10.0.0.7".to_string()]);

    // 02:00 rebuild
    assert!(f.scheduler.current().is_none());
    tokio::time::sleep(Duration::from_secs(45 * 60)).await;
    let schedule = f.scheduler.current().unwrap();
    assert_eq!(schedule.events.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loops() {
    let clock = Arc::new(SimulatedClock::starting_at(at(1, 0)));
    let f = fixture(clock, &["10.0.0.7"]);
    let handle = f.maintenance.clone().spawn();
    handle.shutdown();

    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
    assert!(f.cache.discovered().is_empty());
    assert!(f.scheduler.current().is_none());
}
