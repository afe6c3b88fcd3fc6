//! Named daily time anchors and the seam that resolves them.

use athanconfig::Location;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Astronomical anchor an event can be scheduled against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anchor {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Anchor {
    pub const ALL: [Anchor; 6] = [
        Anchor::Fajr,
        Anchor::Sunrise,
        Anchor::Dhuhr,
        Anchor::Asr,
        Anchor::Maghrib,
        Anchor::Isha,
    ];

    /// Canonical lower-case key, as used in the configuration
    pub fn key(self) -> &'static str {
        match self {
            Anchor::Fajr => "fajr",
            Anchor::Sunrise => "sunrise",
            Anchor::Dhuhr => "dhuhr",
            Anchor::Asr => "asr",
            Anchor::Maghrib => "maghrib",
            Anchor::Isha => "isha",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Anchor {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fajr" => Ok(Anchor::Fajr),
            "sunrise" => Ok(Anchor::Sunrise),
            "dhuhr" | "zuhr" => Ok(Anchor::Dhuhr),
            "asr" => Ok(Anchor::Asr),
            "maghrib" => Ok(Anchor::Maghrib),
            "isha" => Ok(Anchor::Isha),
            other => Err(AnchorError::UnknownAnchor(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("unknown anchor '{0}'")]
    UnknownAnchor(String),
    #[error("invalid location: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },
    #[error("cannot resolve anchors for {date}: {reason}")]
    Unresolvable { date: NaiveDate, reason: String },
}

/// Local instants of the anchors of one day.
///
/// An anchor may be missing when it does not occur that day, e.g. Isha
/// at high latitude in summer with `HighLatitudeRule::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTimes {
    date: NaiveDate,
    times: BTreeMap<Anchor, NaiveDateTime>,
}

impl AnchorTimes {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            times: BTreeMap::new(),
        }
    }

    pub fn with(mut self, anchor: Anchor, at: NaiveDateTime) -> Self {
        self.insert(anchor, at);
        self
    }

    pub fn insert(&mut self, anchor: Anchor, at: NaiveDateTime) {
        self.times.insert(anchor, at);
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn get(&self, anchor: Anchor) -> Option<NaiveDateTime> {
        self.times.get(&anchor).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Anchor, NaiveDateTime)> + '_ {
        self.times.iter().map(|(a, t)| (*a, *t))
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Computes the anchors of a day for a location.
///
/// Must be deterministic for a given (date, location).
pub trait AnchorResolver: Send + Sync {
    fn resolve(&self, date: NaiveDate, location: &Location) -> Result<AnchorTimes, AnchorError>;
}
