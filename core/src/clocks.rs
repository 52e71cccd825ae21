// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Collection of clock implementations.

use time::OffsetDateTime;

/// Generic definition of a clock.
pub trait Clock {
    /// Returns the current UTC time.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Truncates `ts` to microsecond resolution.
///
/// Microseconds are the resolution supported by timestamps in both database backends, so every
/// timestamp that reaches the persistence layer goes through here first.
pub fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    let nanos = ts.unix_timestamp_nanos();
    let truncated = nanos - nanos.rem_euclid(1000);
    OffsetDateTime::from_unix_timestamp_nanos(truncated).unwrap_or(ts)
}

/// Clock implementation that uses the system clock.
#[derive(Clone, Default)]
pub struct SystemClock {}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        truncate_to_micros(OffsetDateTime::now_utc())
    }
}

/// Test utilities.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;
    use time::{Date, Month, Time};

    /// Creates a new UTC timestamp from its individual components.  Panics on invalid input.
    pub fn utc_datetime(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> OffsetDateTime {
        let month = Month::try_from(month).expect("Hardcoded month must be valid");
        let date =
            Date::from_calendar_date(year, month, day).expect("Hardcoded date must be valid");
        let time = Time::from_hms(hour, minute, second).expect("Hardcoded time must be valid");
        date.with_time(time).assume_utc()
    }

    /// A clock that returns a preconfigured instant and that can be modified at will.
    ///
    /// Only supports microsecond-level precision.
    pub struct SettableClock {
        /// Current fake time in microseconds since the epoch.
        now_us: AtomicI64,
    }

    impl SettableClock {
        /// Creates a new clock that returns `now` until reconfigured with `set`.
        pub fn new(now: OffsetDateTime) -> Self {
            Self { now_us: AtomicI64::new(to_micros(now)) }
        }

        /// Sets the new value of `now` that the clock returns.
        pub fn set(&self, now: OffsetDateTime) {
            self.now_us.store(to_micros(now), Ordering::SeqCst);
        }

        /// Advances the current time by `delta`.
        pub fn advance(&self, delta: Duration) {
            let delta_ns = delta.as_nanos();
            assert!(delta_ns % 1000 == 0, "Nanosecond precision not supported");
            let delta_us = i64::try_from(delta_ns / 1000).unwrap();
            self.now_us.fetch_add(delta_us, Ordering::SeqCst);
        }
    }

    /// Converts `ts` to microseconds since the epoch, rejecting sub-microsecond precision.
    fn to_micros(ts: OffsetDateTime) -> i64 {
        let ns = ts.unix_timestamp_nanos();
        assert!(ns % 1000 == 0, "Nanosecond precision not supported");
        i64::try_from(ns / 1000).unwrap()
    }

    impl Clock for SettableClock {
        fn now_utc(&self) -> OffsetDateTime {
            let now_us = self.now_us.load(Ordering::SeqCst);
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(now_us) * 1000).unwrap()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_systemclock_trivial() {
        let clock = SystemClock::default();
        let now1 = clock.now_utc();
        assert!(now1.unix_timestamp_nanos() > 0);
        let now2 = clock.now_utc();
        assert!(now2 >= now1);
    }

    #[test]
    fn test_systemclock_microsecond_resolution() {
        let clock = SystemClock::default();
        let now = clock.now_utc();
        assert!(now.unix_timestamp_nanos() > 0);
        assert_eq!(0, now.nanosecond() % 1000);
    }

    #[test]
    fn test_truncate_to_micros() {
        assert_eq!(
            datetime!(2023-12-01 10:15:00.123456 UTC),
            truncate_to_micros(datetime!(2023-12-01 10:15:00.123456789 UTC))
        );
        assert_eq!(
            datetime!(1969-12-31 23:59:59.999999 UTC),
            truncate_to_micros(datetime!(1969-12-31 23:59:59.9999995 UTC))
        );
    }
}
