//! Prayer times from the sun position.
//!
//! Low-precision solar coordinates (about one arc-minute between 1950 and
//! 2050) are enough for minute-resolution schedules.

use crate::anchors::{Anchor, AnchorError, AnchorResolver, AnchorTimes};
use athanconfig::{AppConfig, AsrConvention, CalculationMethod, HighLatitudeRule, Location};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Twilight parameters of a calculation method
#[derive(Debug, Clone, Copy, PartialEq)]
struct MethodParams {
    fajr_angle: f64,
    isha: IshaRule,
    maghrib_angle: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum IshaRule {
    Angle(f64),
    MinutesAfterMaghrib(i64),
}

fn method_params(method: CalculationMethod) -> MethodParams {
    let (fajr_angle, isha, maghrib_angle) = match method {
        CalculationMethod::Mwl => (18.0, IshaRule::Angle(17.0), None),
        CalculationMethod::Isna => (15.0, IshaRule::Angle(15.0), None),
        CalculationMethod::Egypt => (19.5, IshaRule::Angle(17.5), None),
        CalculationMethod::Makkah => (18.5, IshaRule::MinutesAfterMaghrib(90), None),
        CalculationMethod::Karachi => (18.0, IshaRule::Angle(18.0), None),
        CalculationMethod::Tehran => (17.7, IshaRule::Angle(14.0), Some(4.5)),
    };
    MethodParams {
        fajr_angle,
        isha,
        maghrib_angle,
    }
}

/// Production [`AnchorResolver`]: computes the six anchors and expresses
/// them in the time zone `tz`.
#[derive(Debug, Clone)]
pub struct PrayerCalculator<Tz: TimeZone> {
    method: CalculationMethod,
    asr: AsrConvention,
    high_latitude: HighLatitudeRule,
    corrections: BTreeMap<Anchor, i32>,
    tz: Tz,
}

impl<Tz: TimeZone> PrayerCalculator<Tz> {
    pub fn new(method: CalculationMethod, asr: AsrConvention, tz: Tz) -> Self {
        Self {
            method,
            asr,
            high_latitude: HighLatitudeRule::default(),
            corrections: BTreeMap::new(),
            tz,
        }
    }

    /// Builds a calculator from the configuration. Correction keys that
    /// are not anchors are reported and ignored.
    pub fn from_config(config: &AppConfig, tz: Tz) -> Self {
        let mut calculator = Self::new(config.calculation_method, config.asr_convention, tz)
            .with_high_latitude_rule(config.high_latitude_rule);
        for (key, minutes) in &config.time_corrections {
            match key.parse::<Anchor>() {
                Ok(anchor) => {
                    calculator.corrections.insert(anchor, *minutes);
                }
                Err(e) => warn!("⚠️ Ignoring time correction: {}", e),
            }
        }
        calculator
    }

    pub fn with_high_latitude_rule(mut self, rule: HighLatitudeRule) -> Self {
        self.high_latitude = rule;
        self
    }

    /// Minutes added to `anchor` after computation
    pub fn with_correction(mut self, anchor: Anchor, minutes: i32) -> Self {
        self.corrections.insert(anchor, minutes);
        self
    }

    /// Longest twilight allowed by the high latitude rule, in hours
    fn night_portion(&self, night: f64, angle: f64) -> Option<f64> {
        match self.high_latitude {
            HighLatitudeRule::AngleBased => Some(night * angle / 60.0),
            HighLatitudeRule::OneSeventh => Some(night / 7.0),
            HighLatitudeRule::MiddleOfNight => Some(night / 2.0),
            HighLatitudeRule::None => None,
        }
    }

    /// Anchors as fractional UTC hours of `date`. `NaN` marks an anchor
    /// whose sun angle is never reached that day.
    fn utc_hours(&self, date: NaiveDate, location: &Location) -> BTreeMap<Anchor, f64> {
        let params = method_params(self.method);
        let lat = location.latitude;
        let jd = julian_day(date) - location.longitude / (15.0 * 24.0);
        let sun = SunModel { jd, lat };

        let horizon = 0.833 + 0.0347 * location.elevation.max(0.0).sqrt();

        let mut fajr = sun.angle_time(params.fajr_angle, 5.0, Direction::BeforeNoon);
        let sunrise = sun.angle_time(horizon, 6.0, Direction::BeforeNoon);
        let dhuhr = sun.mid_day(12.0);
        let asr = sun.asr_time(self.asr.shadow_factor(), 13.0);
        let sunset = sun.angle_time(horizon, 18.0, Direction::AfterNoon);
        let maghrib = match params.maghrib_angle {
            Some(angle) => sun.angle_time(angle, 18.0, Direction::AfterNoon),
            None => sunset,
        };
        let mut isha = match params.isha {
            IshaRule::Angle(angle) => sun.angle_time(angle, 18.0, Direction::AfterNoon),
            IshaRule::MinutesAfterMaghrib(minutes) => maghrib + minutes as f64 / 60.0,
        };

        if sunrise.is_finite() && sunset.is_finite() {
            let night = 24.0 - (sunset - sunrise);
            if let Some(portion) = self.night_portion(night, params.fajr_angle) {
                if !fajr.is_finite() || sunrise - fajr > portion {
                    debug!("Fajr on {} set by the {:?} rule", date, self.high_latitude);
                    fajr = sunrise - portion;
                }
            }
            if let IshaRule::Angle(angle) = params.isha {
                if let Some(portion) = self.night_portion(night, angle) {
                    if !isha.is_finite() || isha - sunset > portion {
                        debug!("Isha on {} set by the {:?} rule", date, self.high_latitude);
                        isha = sunset + portion;
                    }
                }
            }
        }

        // local solar time -> UTC
        let shift = location.longitude / 15.0;
        [
            (Anchor::Fajr, fajr),
            (Anchor::Sunrise, sunrise),
            (Anchor::Dhuhr, dhuhr),
            (Anchor::Asr, asr),
            (Anchor::Maghrib, maghrib),
            (Anchor::Isha, isha),
        ]
        .into_iter()
        .map(|(anchor, hours)| (anchor, hours - shift))
        .collect()
    }
}

impl<Tz> AnchorResolver for PrayerCalculator<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn resolve(&self, date: NaiveDate, location: &Location) -> Result<AnchorTimes, AnchorError> {
        let valid = location.latitude.is_finite()
            && location.longitude.is_finite()
            && (-90.0..=90.0).contains(&location.latitude)
            && (-180.0..=180.0).contains(&location.longitude);
        if !valid {
            return Err(AnchorError::InvalidLocation {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }

        let midnight_utc = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AnchorError::Unresolvable {
                date,
                reason: "invalid date".to_string(),
            })?;

        let mut times = AnchorTimes::new(date);
        for (anchor, hours) in self.utc_hours(date, location) {
            if !hours.is_finite() {
                warn!(
                    "⚠️ {} does not occur on {} at latitude {:.2}, skipping",
                    anchor, date, location.latitude
                );
                continue;
            }

            let correction = self.corrections.get(&anchor).copied().unwrap_or(0);
            // nearest minute
            let minutes = (hours * 60.0).round() as i64 + i64::from(correction);
            let instant = Utc.from_utc_datetime(&(midnight_utc + Duration::minutes(minutes)));
            let local: NaiveDateTime = instant.with_timezone(&self.tz).naive_local();

            debug!("{} on {} -> {}", anchor, date, local.format("%Y-%m-%d %H:%M"));
            times.insert(anchor, local);
        }

        if times.is_empty() {
            return Err(AnchorError::Unresolvable {
                date,
                reason: "no anchor occurs on this day".to_string(),
            });
        }
        Ok(times)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    BeforeNoon,
    AfterNoon,
}

/// Sun position for one day at one latitude
struct SunModel {
    jd: f64,
    lat: f64,
}

struct SunPosition {
    declination: f64,
    equation_of_time: f64,
}

impl SunModel {
    /// `hours` is the rough local solar time the position is evaluated at
    fn position(&self, hours: f64) -> SunPosition {
        let d = self.jd + hours / 24.0 - 2451545.0;
        let g = fix_angle(357.529 + 0.98560028 * d);
        let q = fix_angle(280.459 + 0.98564736 * d);
        let l = fix_angle(q + 1.915 * dsin(g) + 0.020 * dsin(2.0 * g));
        let e = 23.439 - 0.00000036 * d;

        let ra = darctan2(dcos(e) * dsin(l), dcos(l)) / 15.0;
        SunPosition {
            declination: darcsin(dsin(e) * dsin(l)),
            equation_of_time: q / 15.0 - fix_hour(ra),
        }
    }

    fn mid_day(&self, hours: f64) -> f64 {
        let eqt = self.position(hours).equation_of_time;
        fix_hour(12.0 - eqt)
    }

    /// Local solar time at which the sun is `angle` degrees below the horizon
    fn angle_time(&self, angle: f64, hours: f64, direction: Direction) -> f64 {
        let decl = self.position(hours).declination;
        let noon = self.mid_day(hours);
        let t = darccos(
            (-dsin(angle) - dsin(decl) * dsin(self.lat)) / (dcos(decl) * dcos(self.lat)),
        ) / 15.0;
        match direction {
            Direction::BeforeNoon => noon - t,
            Direction::AfterNoon => noon + t,
        }
    }

    /// Asr: shadow length = `factor` × object height + noon shadow
    fn asr_time(&self, factor: f64, hours: f64) -> f64 {
        let decl = self.position(hours).declination;
        let angle = -darccot(factor + dtan((self.lat - decl).abs()));
        self.angle_time(angle, hours, Direction::AfterNoon)
    }
}

fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    let day = date.day() as f64;
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
}

fn dsin(d: f64) -> f64 {
    d.to_radians().sin()
}

fn dcos(d: f64) -> f64 {
    d.to_radians().cos()
}

fn dtan(d: f64) -> f64 {
    d.to_radians().tan()
}

fn darcsin(x: f64) -> f64 {
    x.asin().to_degrees()
}

// NaN outside [-1, 1]: the angle is never reached
fn darccos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn darctan2(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn darccot(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}

fn fix_angle(a: f64) -> f64 {
    a.rem_euclid(360.0)
}

fn fix_hour(h: f64) -> f64 {
    h.rem_euclid(24.0)
}
