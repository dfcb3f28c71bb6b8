//! # Time Window & Decay
//!
//! "Today" is the span from local midnight to `now`, where local time is UTC
//! shifted by a fixed number of minutes. Only items published inside that span
//! are scored, and older items inside it count for less.
//!
//! The offset arithmetic needs no timezone database: shift `now` into the local
//! frame, truncate to midnight there, shift back.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// The local "today" window evaluated at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub now: DateTime<Utc>,
    /// Whole minutes between `start` and `now`, at least 1.
    pub minutes: i64,
    pub offset_minutes: i32,
}

impl TimeWindow {
    pub fn today(now: DateTime<Utc>, offset_minutes: i32) -> Self {
        let start = start_of_day(now, offset_minutes);
        Self {
            start,
            now,
            minutes: window_minutes(start, now),
            offset_minutes,
        }
    }

    /// Fractional minutes between `ts` and `now`; negative for future timestamps.
    pub fn minutes_ago(&self, ts: DateTime<Utc>) -> f64 {
        (self.now - ts).num_milliseconds() as f64 / 60_000.0
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        in_window(self.minutes_ago(ts), self.minutes)
    }

    /// Decay multiplier for an item published at `ts`; 0 outside the window.
    pub fn decay_at(&self, ts: DateTime<Utc>, floor: f64) -> f64 {
        decay(self.minutes_ago(ts), self.minutes, floor)
    }
}

/// Local midnight (per `offset_minutes`) expressed in UTC.
pub fn start_of_day(now: DateTime<Utc>, offset_minutes: i32) -> DateTime<Utc> {
    let offset = Duration::minutes(i64::from(offset_minutes));
    let shifted = now + offset;
    let local_midnight = shifted.date_naive().and_time(NaiveTime::MIN).and_utc();
    local_midnight - offset
}

/// `max(1, round(minutes from start to now))`.
pub fn window_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let mins = (now - start).num_milliseconds() as f64 / 60_000.0;
    (mins.round() as i64).max(1)
}

pub fn in_window(minutes_ago: f64, window_minutes: i64) -> bool {
    minutes_ago >= 0.0 && minutes_ago <= window_minutes as f64
}

/// Linear decay from 1.0 at age 0 down to `floor` at the window edge.
pub fn decay(minutes_ago: f64, window_minutes: i64, floor: f64) -> f64 {
    if !in_window(minutes_ago, window_minutes) {
        return 0.0;
    }
    let w = window_minutes.max(1) as f64;
    let ratio = (minutes_ago / w).clamp(0.0, 1.0);
    (1.0 - (1.0 - floor) * ratio).clamp(floor, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FLOOR: f64 = 0.7;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn utc_window_example() {
        let w = TimeWindow::today(at(2024, 1, 1, 5, 30), 0);
        assert_eq!(w.start, at(2024, 1, 1, 0, 0));
        assert_eq!(w.minutes, 330);
    }

    #[test]
    fn positive_offset_crosses_utc_midnight() {
        // 2024-01-01T20:00Z is 05:00 on Jan 2 in UTC+9; local midnight is 15:00Z on Jan 1.
        let w = TimeWindow::today(at(2024, 1, 1, 20, 0), 540);
        assert_eq!(w.start, at(2024, 1, 1, 15, 0));
        assert_eq!(w.minutes, 300);
    }

    #[test]
    fn negative_and_odd_offsets() {
        // UTC-5: 03:00Z on Jan 2 is 22:00 on Jan 1 locally.
        assert_eq!(start_of_day(at(2024, 1, 2, 3, 0), -300), at(2024, 1, 1, 5, 0));
        // UTC+5:45
        assert_eq!(start_of_day(at(2024, 1, 1, 12, 0), 345), at(2023, 12, 31, 18, 15));
    }

    #[test]
    fn window_is_at_least_one_minute() {
        let now = at(2024, 1, 1, 0, 0);
        assert_eq!(TimeWindow::today(now, 0).minutes, 1);
    }

    #[test]
    fn decay_endpoints_and_outside() {
        assert!((decay(0.0, 330, FLOOR) - 1.0).abs() < 1e-12);
        assert!((decay(330.0, 330, FLOOR) - 0.7).abs() < 1e-12);
        assert_eq!(decay(-0.5, 330, FLOOR), 0.0);
        assert_eq!(decay(331.0, 330, FLOOR), 0.0);
    }

    #[test]
    fn decay_is_monotonic_and_bounded() {
        let w = 600;
        let mut prev = f64::INFINITY;
        for m in 0..=w {
            let d = decay(m as f64, w, FLOOR);
            assert!(d <= prev, "decay must not increase at {m}");
            assert!((FLOOR..=1.0).contains(&d));
            prev = d;
        }
    }

    #[test]
    fn contains_respects_bounds() {
        let w = TimeWindow::today(at(2024, 1, 1, 5, 30), 0);
        assert!(w.contains(at(2024, 1, 1, 0, 0)));
        assert!(w.contains(at(2024, 1, 1, 5, 30)));
        assert!(!w.contains(at(2023, 12, 31, 23, 59)));
        assert!(!w.contains(at(2024, 1, 1, 5, 31)));
    }
}
