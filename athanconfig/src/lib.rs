//! # Athan Configuration Module
//!
//! This module provides configuration management for Athan, including:
//! - Loading `config.yaml` from the configuration directory
//! - Merging it over the embedded default configuration
//! - Environment variable overrides
//! - Typed getters for host settings and a typed [`AppConfig`] snapshot
//! - Full reload, used by the daily schedule rebuild
//!
//! ## Usage
//!
//! ```no_run
//! use athanconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let port = config.get_http_port();
//! let app = config.app_config()?;
//! println!("{} events on port {}", app.events.len(), port);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::RwLock,
};
use tracing::{info, warn};

pub mod app;
mod net;

pub use app::{
    AppConfig, AsrConvention, CalculationMethod, DeviceSettings, EventSpec, HighLatitudeRule,
    Location, PlaybackSettings, ScheduleSettings,
};
pub use net::guess_local_ip;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("athan.yaml");

const ENV_CONFIG_DIR: &str = "ATHAN_CONFIG";
const ENV_PREFIX: &str = "ATHAN_CONFIG__";
const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_AUDIO_DIR: &str = "/opt/athan/audio";
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate a getter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> usize {
            match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_u64().map(|v| v as usize).unwrap_or($default),
                _ => $default,
            }
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }
    };
}

/// Configuration manager for Athan
///
/// Holds the merged YAML tree. The whole tree is replaced on [`Config::reload`];
/// readers never see a half-updated document.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: RwLock<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".athan").exists() {
            return ".athan".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".athan");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".athan".to_string()
    }

    /// Loads the configuration from the specified directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `ATHAN_CONFIG` environment variable
    /// 3. `.athan` in the current directory
    /// 4. `.athan` in the user's home directory
    ///
    /// The `config.yaml` file is mandatory: a missing or malformed document,
    /// or one whose `athan` section does not validate, is an error.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        info!(config_dir=%config_dir, "Using config directory");

        let path = Path::new(&config_dir)
            .join(CONFIG_FILE)
            .to_string_lossy()
            .to_string();

        let data = Self::read_document(&path)?;
        let config = Config {
            config_dir,
            path,
            data: RwLock::new(data),
        };

        // Fail fast on a document the scheduler could not use
        config.app_config()?;
        Ok(config)
    }

    /// Re-reads `config.yaml` and swaps the whole document in.
    ///
    /// On error the current document is kept untouched.
    pub fn reload(&self) -> Result<()> {
        let data = Self::read_document(&self.path)?;
        Self::parse_app_config(&data)?;

        let mut current = self
            .data
            .write()
            .map_err(|_| anyhow!("configuration lock poisoned"))?;
        *current = data;
        info!(config_file=%self.path, "Configuration reloaded");
        Ok(())
    }

    fn read_document(path: &str) -> Result<Value> {
        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)
            .context("embedded default configuration is invalid")?;

        let yaml_data = fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {path}"))?;
        info!(config_file=%path, "Loaded config file");

        let external_value: Value = serde_yaml::from_str(&yaml_data)
            .with_context(|| format!("malformed configuration file {path}"))?;

        merge_yaml(&mut default_value, &external_value);
        let mut config_value = lower_keys_value(default_value);
        apply_env_overrides(&mut config_value);
        Ok(config_value)
    }

    fn parse_app_config(data: &Value) -> Result<AppConfig> {
        let section = get_value_internal(data, &["athan"])?;
        let app: AppConfig = serde_yaml::from_value(section)
            .context("invalid 'athan' configuration section")?;
        app.validate()?;
        Ok(app)
    }

    /// Returns the directory the configuration was loaded from
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Returns the path of the `config.yaml` file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow!("configuration lock poisoned"))?;
        get_value_internal(&data, path)
    }

    /// Typed snapshot of the `athan` section
    pub fn app_config(&self) -> Result<AppConfig> {
        let data = self
            .data
            .read()
            .map_err(|_| anyhow!("configuration lock poisoned"))?;
        Self::parse_app_config(&data)
    }

    /// Gets the HTTP port of the audio server
    ///
    /// Returns the configured port, or 8080 if not configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!("Invalid HTTP port '{}', using default {}", n, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(Value::String(s)) => match s.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Invalid HTTP port '{}', using default {}", s, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(_) => {
                warn!(
                    "HTTP port not a number or string, using default {}",
                    DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
            Err(err) => {
                warn!(
                    "Failed to get HTTP port: {}, using default {}",
                    err, DEFAULT_HTTP_PORT
                );
                DEFAULT_HTTP_PORT
            }
        }
    }

    /// Gets the host speakers use to fetch audio from us
    ///
    /// Returns the configured `host.base_url`, or the guessed local IP address.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Ok(_) => guess_local_ip(),
            Err(err) => {
                warn!("Failed to get base URL: {}, guessing local address", err);
                guess_local_ip()
            }
        }
    }

    /// Gets the root of the audio catalog
    ///
    /// Relative paths are resolved against the configuration directory.
    pub fn get_audio_dir(&self) -> String {
        let dir = match self.get_value(&["host", "audio_dir"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_AUDIO_DIR.to_string(),
        };

        let path = Path::new(&dir);
        if path.is_absolute() {
            dir
        } else {
            Path::new(&self.config_dir)
                .join(path)
                .to_string_lossy()
                .to_string()
        }
    }

    impl_usize_config!(
        get_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Gets the minimum log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            let key = key.to_lowercase();

            if let Some(next) = map.get(&Value::String(key)) {
                current = next;
            } else {
                return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
            }
        } else {
            return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key_value = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key_value, value);
        } else {
            let entry = map
                .entry(key_value)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            if let Err(err) = set_value_internal(config, &key_path, yaml_value) {
                warn!(env_var=%key, "Ignoring configuration override: {}", err);
            }
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
        return parsed;
    }
    Value::String(value.to_string())
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                if let Value::String(s) = k {
                    new_map.insert(Value::String(s.to_lowercase()), lower_keys_value(v));
                } else {
                    new_map.insert(k, lower_keys_value(v));
                }
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings, keys from `external` are merged recursively into `default`
/// - For scalars and sequences, the external value replaces the default one
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_replaces_scalars_and_sequences() {
        let mut default: Value =
            serde_yaml::from_str("a: 1\nb: { c: 2, d: 3 }\nlist: [1, 2]\n").unwrap();
        let external: Value = serde_yaml::from_str("b: { c: 20 }\nlist: [9]\n").unwrap();
        merge_yaml(&mut default, &external);

        assert_eq!(get_value_internal(&default, &["a"]).unwrap(), Value::from(1));
        assert_eq!(get_value_internal(&default, &["b", "c"]).unwrap(), Value::from(20));
        assert_eq!(get_value_internal(&default, &["b", "d"]).unwrap(), Value::from(3));
        let list: Vec<i64> =
            serde_yaml::from_value(get_value_internal(&default, &["list"]).unwrap()).unwrap();
        assert_eq!(list, vec![9]);
    }

    #[test]
    fn test_keys_are_lowercased() {
        let value: Value = serde_yaml::from_str("Host: { HTTP_Port: 9000 }\n").unwrap();
        let lowered = lower_keys_value(value);
        assert_eq!(
            get_value_internal(&lowered, &["host", "http_port"]).unwrap(),
            Value::from(9000)
        );
    }

    #[test]
    fn test_set_value_creates_intermediate_maps() {
        let mut value = Value::Mapping(Mapping::new());
        set_value_internal(&mut value, &["host", "logger", "min_level"], Value::from("DEBUG"))
            .unwrap();
        assert_eq!(
            get_value_internal(&value, &["host", "logger", "min_level"]).unwrap(),
            Value::from("DEBUG")
        );
    }

    #[test]
    fn test_env_value_conversion() {
        assert_eq!(convert_env_value("9000"), Value::from(9000));
        assert_eq!(convert_env_value("true"), Value::Bool(true));
        assert_eq!(convert_env_value("hello"), Value::from("hello"));
    }
}
