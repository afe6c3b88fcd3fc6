//! Typed view of the `athan` section of the configuration document.
//!
//! [`crate::Config`] keeps the raw YAML tree (defaults, overrides, reloads);
//! [`AppConfig`] is the snapshot handed to the scheduler on every rebuild.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default control port of Sonos ZonePlayers
pub const DEFAULT_CONTROL_PORT: u16 = 1400;
pub const DEFAULT_CONTROL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DISCOVERY_WINDOW_SECS: u64 = 3;
pub const DEFAULT_REFRESH_MINUTES: u64 = 15;
pub const DEFAULT_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_NIGHT_START_HOUR: u32 = 21;
pub const DEFAULT_NIGHT_END_HOUR: u32 = 7;
pub const DEFAULT_NIGHT_VOLUME: u8 = 5;
pub const DEFAULT_DAY_VOLUME: u8 = 15;
pub const DEFAULT_REBUILD_HOUR: u32 = 2;
pub const DEFAULT_MQTT_TOPIC: &str = "athan/test/#";

/// Sentinel accepted in `mqtt_broker` to disable the control channel.
pub const MQTT_DISABLED: &str = "none";

/// Geographic position used for the prayer-time computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
}

/// Twilight angle convention used for Fajr and Isha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalculationMethod {
    /// Muslim World League
    #[default]
    Mwl,
    /// Islamic Society of North America
    Isna,
    /// Egyptian General Authority of Survey
    Egypt,
    /// Umm al-Qura, Makkah
    Makkah,
    /// University of Islamic Sciences, Karachi
    Karachi,
    /// Institute of Geophysics, University of Tehran
    Tehran,
}

impl FromStr for CalculationMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mwl" => Ok(Self::Mwl),
            "isna" => Ok(Self::Isna),
            "egypt" => Ok(Self::Egypt),
            "makkah" | "ummalqura" | "umm_al_qura" => Ok(Self::Makkah),
            "karachi" => Ok(Self::Karachi),
            "tehran" => Ok(Self::Tehran),
            other => Err(anyhow!("Unknown calculation method '{other}'")),
        }
    }
}

impl TryFrom<String> for CalculationMethod {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalculationMethod> for String {
    fn from(value: CalculationMethod) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mwl => "mwl",
            Self::Isna => "isna",
            Self::Egypt => "egypt",
            Self::Makkah => "makkah",
            Self::Karachi => "karachi",
            Self::Tehran => "tehran",
        };
        f.write_str(name)
    }
}

/// Shadow-length convention used for Asr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AsrConvention {
    #[default]
    Shafii,
    Hanafi,
}

impl AsrConvention {
    /// Shadow length relative to the object height.
    pub fn shadow_factor(self) -> f64 {
        match self {
            Self::Shafii => 1.0,
            Self::Hanafi => 2.0,
        }
    }
}

impl FromStr for AsrConvention {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shafii" | "standard" => Ok(Self::Shafii),
            "hanafi" => Ok(Self::Hanafi),
            other => Err(anyhow!("Unknown asr convention '{other}'")),
        }
    }
}

impl TryFrom<String> for AsrConvention {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AsrConvention> for String {
    fn from(value: AsrConvention) -> Self {
        match value {
            AsrConvention::Shafii => "shafii".to_string(),
            AsrConvention::Hanafi => "hanafi".to_string(),
        }
    }
}

/// How Fajr and Isha are placed when the sun stays above the twilight
/// angle all night (high latitudes in summer).
///
/// The rule gives a portion of the night (sunset to sunrise): Fajr is never
/// earlier than sunrise minus that portion, Isha never later than sunset
/// plus it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HighLatitudeRule {
    /// night × angle / 60
    #[default]
    AngleBased,
    /// one seventh of the night
    OneSeventh,
    /// half of the night
    MiddleOfNight,
    /// leave the anchor out when the angle is not reached
    None,
}

impl FromStr for HighLatitudeRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "angle_based" | "anglebased" | "angle" => Ok(Self::AngleBased),
            "one_seventh" | "oneseventh" | "seventh" => Ok(Self::OneSeventh),
            "middle_of_night" | "middleofnight" | "midnight" => Ok(Self::MiddleOfNight),
            "none" => Ok(Self::None),
            other => Err(anyhow!("Unknown high latitude rule '{other}'")),
        }
    }
}

impl TryFrom<String> for HighLatitudeRule {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HighLatitudeRule> for String {
    fn from(value: HighLatitudeRule) -> Self {
        match value {
            HighLatitudeRule::AngleBased => "angle_based",
            HighLatitudeRule::OneSeventh => "one_seventh",
            HighLatitudeRule::MiddleOfNight => "middle_of_night",
            HighLatitudeRule::None => "none",
        }
        .to_string()
    }
}

/// One configured broadcast.
///
/// `base` is either a symbolic anchor name (`fajr`, `asr`, ...) or a literal
/// `HH:MM` clock time. `offset` only applies to symbolic anchors.
/// A `volume` of 0 or below lets the day/night policy decide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    #[serde(alias = "anchor")]
    pub base: String,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub volume: i32,
}

/// Speaker addressing and control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Addresses used while discovery has not found anything yet.
    pub fallback: Vec<String>,
    pub control_port: u16,
    pub control_timeout_secs: u64,
    pub discovery_window_secs: u64,
    pub refresh_minutes: u64,
    pub search_target: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            fallback: Vec::new(),
            control_port: DEFAULT_CONTROL_PORT,
            control_timeout_secs: DEFAULT_CONTROL_TIMEOUT_SECS,
            discovery_window_secs: DEFAULT_DISCOVERY_WINDOW_SECS,
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
            search_target: DEFAULT_SEARCH_TARGET.to_string(),
        }
    }
}

/// Gate cooldown and day/night volume policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub cooldown_secs: u64,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    pub night_volume: u8,
    pub day_volume: u8,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            night_start_hour: DEFAULT_NIGHT_START_HOUR,
            night_end_hour: DEFAULT_NIGHT_END_HOUR,
            night_volume: DEFAULT_NIGHT_VOLUME,
            day_volume: DEFAULT_DAY_VOLUME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Local hour at which the daily rebuild runs.
    pub rebuild_hour: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            rebuild_hour: DEFAULT_REBUILD_HOUR,
        }
    }
}

/// Typed snapshot of the `athan` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub location: Location,
    #[serde(default)]
    pub calculation_method: CalculationMethod,
    #[serde(default)]
    pub asr_convention: AsrConvention,
    #[serde(default)]
    pub high_latitude_rule: HighLatitudeRule,
    /// Minutes added to a computed anchor, keyed by anchor name.
    #[serde(default)]
    pub time_corrections: BTreeMap<String, i32>,
    #[serde(default)]
    pub mqtt_broker: String,
    #[serde(default = "default_mqtt_topic")]
    pub mqtt_topic: String,
    #[serde(default)]
    pub devices: DeviceSettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

fn default_mqtt_topic() -> String {
    DEFAULT_MQTT_TOPIC.to_string()
}

impl AppConfig {
    /// Returns the broker address, or `None` when the control channel is disabled.
    pub fn mqtt_broker(&self) -> Option<&str> {
        let broker = self.mqtt_broker.trim();
        if broker.is_empty() || broker.eq_ignore_ascii_case(MQTT_DISABLED) {
            None
        } else {
            Some(broker)
        }
    }

    /// Checks the ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if !loc.latitude.is_finite() || !(-90.0..=90.0).contains(&loc.latitude) {
            return Err(anyhow!("latitude {} is out of range", loc.latitude));
        }
        if !loc.longitude.is_finite() || !(-180.0..=180.0).contains(&loc.longitude) {
            return Err(anyhow!("longitude {} is out of range", loc.longitude));
        }
        // Below sea level is fine, the horizon dip is clamped at 0 m
        if !loc.elevation.is_finite() {
            return Err(anyhow!("elevation {} is not a number", loc.elevation));
        }

        let playback = &self.playback;
        if playback.night_start_hour > 23 || playback.night_end_hour > 23 {
            return Err(anyhow!(
                "night window {}-{} must use hours between 0 and 23",
                playback.night_start_hour,
                playback.night_end_hour
            ));
        }
        if playback.night_volume > 100 || playback.day_volume > 100 {
            return Err(anyhow!("volumes must be between 0 and 100"));
        }
        if self.schedule.rebuild_hour > 23 {
            return Err(anyhow!(
                "rebuild_hour {} must be between 0 and 23",
                self.schedule.rebuild_hour
            ));
        }
        if self.devices.discovery_window_secs == 0 || self.devices.refresh_minutes == 0 {
            return Err(anyhow!(
                "discovery_window_secs and refresh_minutes must be greater than 0"
            ));
        }

        for event in &self.events {
            if event.volume > 100 {
                return Err(anyhow!(
                    "event '{}' has volume {} (expected at most 100)",
                    event.name,
                    event.volume
                ));
            }
        }
        Ok(())
    }
}
