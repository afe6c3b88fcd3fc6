use chrono::{Local, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tokio::time::Instant;

/// Local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Starts at a given local time and advances with the tokio clock, so a
/// paused runtime (`start_paused`) drives it.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedClock {
    start: NaiveDateTime,
    origin: Instant,
}

impl SimulatedClock {
    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            start,
            origin: Instant::now(),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.start + elapsed
    }
}

/// Time left until the next occurrence of `at` strictly after `now`.
///
/// Computed on naive local time: across a DST change the wait is off by
/// the shift for that one night.
pub fn until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut next = now.date().and_time(at);
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_later_today() {
        assert_eq!(until_next(at(5, 0, 0), time(5, 12)), Duration::from_secs(12 * 60));
    }

    #[test]
    fn test_already_passed_means_tomorrow() {
        assert_eq!(
            until_next(at(5, 13, 0), time(5, 12)),
            Duration::from_secs(24 * 3600 - 60)
        );
    }

    #[test]
    fn test_exactly_now_means_tomorrow() {
        assert_eq!(
            until_next(at(5, 12, 0), time(5, 12)),
            Duration::from_secs(24 * 3600)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_clock_follows_tokio_time() {
        let clock = SimulatedClock::starting_at(at(4, 0, 0));
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), at(4, 1, 30));
    }
}
