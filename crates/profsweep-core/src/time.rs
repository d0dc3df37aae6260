//! Profile timestamps.
//!
//! The profile list stores load and unload times as two `REG_DWORD` halves of a
//! `FILETIME`: 100-nanosecond ticks since 1601-01-01 UTC. [`FileTime`] combines
//! the halves and converts to and from `chrono` for arithmetic and display.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticks per second (one tick is 100 ns).
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Ticks per day.
pub const TICKS_PER_DAY: u64 = TICKS_PER_SECOND * 86_400;

/// Seconds between 1601-01-01 and 1970-01-01.
const EPOCH_DIFFERENCE_SECS: i64 = 11_644_473_600;

/// A `FILETIME` instant. Zero means "unset".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileTime(u64);

impl FileTime {
    /// The platform epoch (1601-01-01), also the "never" marker.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw tick count.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Combine the registry's high and low halves: `(high << 32) | low`.
    pub const fn from_parts(high: u32, low: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    /// Raw tick count.
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// High and low 32-bit halves, as stored in the registry.
    pub const fn parts(self) -> (u32, u32) {
        ((self.0 >> 32) as u32, self.0 as u32)
    }

    /// True for the unset instant.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert a UTC datetime. Instants before 1601 clamp to zero.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp() + EPOCH_DIFFERENCE_SECS;
        if secs < 0 {
            return Self::ZERO;
        }
        let ticks = (secs as u64)
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(u64::from(dt.timestamp_subsec_nanos()) / 100);
        Self(ticks)
    }

    /// The current instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Convert to a UTC datetime, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = (self.0 / TICKS_PER_SECOND) as i64 - EPOCH_DIFFERENCE_SECS;
        let nanos = ((self.0 % TICKS_PER_SECOND) * 100) as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }

    /// This instant moved back by `days` days, saturating at zero.
    pub const fn minus_days(self, days: u32) -> Self {
        Self(self.0.saturating_sub(days as u64 * TICKS_PER_DAY))
    }

    /// This instant moved forward by `days` days.
    pub const fn plus_days(self, days: u32) -> Self {
        Self(self.0.saturating_add(days as u64 * TICKS_PER_DAY))
    }
}

impl fmt::Display for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("never");
        }
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            None => write!(f, "@{}", self.0),
        }
    }
}

/// Whole days from `instant` to `now`, rounded up.
///
/// An instant in the future yields zero or a negative count.
pub fn age_in_days(now: FileTime, instant: FileTime) -> i64 {
    let diff = i128::from(now.ticks()) - i128::from(instant.ticks());
    let per_day = i128::from(TICKS_PER_DAY);
    (diff + per_day - 1).div_euclid(per_day) as i64
}

/// A session that never closed cleanly: loaded, and the recorded unload
/// precedes the load.
pub fn is_unclean(load: FileTime, unload: FileTime) -> bool {
    !load.is_zero() && unload < load
}
