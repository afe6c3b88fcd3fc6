use athanconfig::{CalculationMethod, Config};
use std::fs;
use tempfile::TempDir;

const SAMPLE: &str = r#"
host:
  http_port: 9090
  audio_dir: audio
athan:
  location:
    latitude: 52.52
    longitude: 13.405
    elevation: 34
  calculation_method: MWL
  time_corrections:
    Fajr: 2
  devices:
    fallback: ["192.168.1.20", "192.168.1.21"]
  events:
    - name: Fajr
      base: fajr
      folder: fajr
    - name: Morning
      base: "07:00"
      folder: morning_adhkar
      volume: 12
"#;

fn write_config(content: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), content).unwrap();
    dir
}

#[test]
fn test_load_merges_over_defaults() {
    let dir = write_config(SAMPLE);
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

    assert_eq!(config.get_http_port(), 9090);
    assert!(config.get_log_enable_console());
    assert_eq!(config.get_log_min_level(), "INFO");

    let app = config.app_config().unwrap();
    assert_eq!(app.calculation_method, CalculationMethod::Mwl);
    assert_eq!(app.events.len(), 2);
    assert_eq!(app.events[1].volume, 12);
    assert_eq!(app.devices.fallback, vec!["192.168.1.20", "192.168.1.21"]);
    // Keys are normalised to lower case
    assert_eq!(app.time_corrections.get("fajr"), Some(&2));
    // Defaults from the embedded document
    assert_eq!(app.devices.control_port, 1400);
    assert_eq!(app.playback.cooldown_secs, 60);
    assert_eq!(app.schedule.rebuild_hour, 2);
    assert_eq!(app.mqtt_broker(), None);
}

#[test]
fn test_relative_audio_dir_is_resolved_against_config_dir() {
    let dir = write_config(SAMPLE);
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(
        config.get_audio_dir(),
        dir.path().join("audio").to_string_lossy()
    );
}

#[test]
fn test_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_config(dir.path().to_str().unwrap()).is_err());
}

#[test]
fn test_malformed_file_is_fatal() {
    let dir = write_config("athan: [unterminated\n");
    assert!(Config::load_config(dir.path().to_str().unwrap()).is_err());
}

#[test]
fn test_missing_location_is_fatal() {
    let dir = write_config("athan:\n  events: []\n");
    assert!(Config::load_config(dir.path().to_str().unwrap()).is_err());
}

#[test]
fn test_reload_replaces_document() {
    let dir = write_config(SAMPLE);
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(config.app_config().unwrap().events.len(), 2);

    let updated = SAMPLE.replace(
        "    - name: Morning\n      base: \"07:00\"\n      folder: morning_adhkar\n      volume: 12\n",
        "",
    );
    fs::write(dir.path().join("config.yaml"), updated).unwrap();
    config.reload().unwrap();

    assert_eq!(config.app_config().unwrap().events.len(), 1);
}

#[test]
fn test_failed_reload_keeps_previous_document() {
    let dir = write_config(SAMPLE);
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

    fs::write(dir.path().join("config.yaml"), "athan: {{{").unwrap();
    assert!(config.reload().is_err());

    let app = config.app_config().unwrap();
    assert_eq!(app.events.len(), 2);
    assert_eq!(config.get_http_port(), 9090);
}

#[test]
fn test_env_override() {
    // SAFETY: no other test in this binary reads this variable.
    unsafe {
        std::env::set_var("ATHAN_CONFIG__HOST__LOGGER__BUFFER_CAPACITY", "42");
    }
    let dir = write_config(SAMPLE);
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(config.get_log_cache_size(), 42);
}
