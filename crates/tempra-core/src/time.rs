//! Time primitives for Tempra
//!
//! A stopwatch shows `MM:SS,CC`. Everything that rewrites the display works on
//! that decomposition, so it lives next to the elapsed-time type itself.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MS_PER_CENTI: u64 = 10;
pub const MS_PER_SECOND: u64 = 1_000;
pub const MS_PER_MINUTE: u64 = 60_000;

/// Elapsed stopwatch time in milliseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElapsedMs(pub u64);

impl ElapsedMs {
    pub const ZERO: ElapsedMs = ElapsedMs(0);

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        ElapsedMs(millis)
    }

    /// Compose from displayed minutes, seconds and centiseconds
    #[inline]
    pub fn from_parts(minutes: u64, seconds: u64, centis: u64) -> Self {
        ElapsedMs(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + centis * MS_PER_CENTI)
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Displayed minutes (unbounded)
    #[inline]
    pub fn minutes(self) -> u64 {
        self.0 / MS_PER_MINUTE
    }

    /// Displayed seconds, 0..=59
    #[inline]
    pub fn seconds(self) -> u64 {
        (self.0 % MS_PER_MINUTE) / MS_PER_SECOND
    }

    /// Displayed centiseconds, 0..=99
    #[inline]
    pub fn centis(self) -> u64 {
        (self.0 % MS_PER_SECOND) / MS_PER_CENTI
    }

    /// Whole seconds since start, `floor(ms / 1000)`
    #[inline]
    pub fn whole_seconds(self) -> u64 {
        self.0 / MS_PER_SECOND
    }

    /// `(minutes, seconds, centis)` as shown on the display
    #[inline]
    pub fn parts(self) -> (u64, u64, u64) {
        (self.minutes(), self.seconds(), self.centis())
    }

    #[inline]
    pub fn saturating_sub(self, other: ElapsedMs) -> ElapsedMs {
        ElapsedMs(self.0.saturating_sub(other.0))
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Add<Duration> for ElapsedMs {
    type Output = ElapsedMs;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        ElapsedMs(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

impl Sub<ElapsedMs> for ElapsedMs {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: ElapsedMs) -> Self::Output {
        Duration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for ElapsedMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Elapsed({}ms = {})", self.0, self)
    }
}

/// Stopwatch display format: `MM:SS,CC`
impl fmt::Display for ElapsedMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mm, ss, cs) = self.parts();
        write!(f, "{:02}:{:02},{:02}", mm, ss, cs)
    }
}

/// Parse `MM:SS,CC` (also `MM:SS.CC`) or a bare millisecond count
impl FromStr for ElapsedMs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(millis) = s.parse::<u64>() {
            return Ok(ElapsedMs(millis));
        }
        let bad = || format!("expected MM:SS,CC or milliseconds, got {:?}", s);
        let (mm, rest) = s.split_once(':').ok_or_else(bad)?;
        let (ss, cs) = rest
            .split_once(',')
            .or_else(|| rest.split_once('.'))
            .ok_or_else(bad)?;
        let mm: u64 = mm.parse().map_err(|_| bad())?;
        let ss: u64 = ss.parse().map_err(|_| bad())?;
        let cs: u64 = cs.parse().map_err(|_| bad())?;
        if ss >= 60 || cs >= 100 {
            return Err(bad());
        }
        Ok(ElapsedMs::from_parts(mm, ss, cs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decomposition() {
        let t = ElapsedMs::from_millis(754_321);
        assert_eq!(t.minutes(), 12);
        assert_eq!(t.seconds(), 34);
        assert_eq!(t.centis(), 32);
        assert_eq!(t.whole_seconds(), 754);
    }

    #[test]
    fn test_from_parts_truncates_sub_centisecond() {
        let t = ElapsedMs::from_millis(61_239);
        let (mm, ss, cs) = t.parts();
        assert_eq!(ElapsedMs::from_parts(mm, ss, cs), ElapsedMs::from_millis(61_230));
    }

    #[test]
    fn test_display_format() {
        assert_eq!(ElapsedMs::ZERO.to_string(), "00:00,00");
        assert_eq!(ElapsedMs::from_parts(3, 7, 5).to_string(), "03:07,05");
        assert_eq!(ElapsedMs::from_parts(123, 0, 99).to_string(), "123:00,99");
    }

    #[test]
    fn test_parse_display() {
        assert_eq!("03:07,05".parse::<ElapsedMs>().unwrap(), ElapsedMs::from_parts(3, 7, 5));
        assert_eq!("0:12.34".parse::<ElapsedMs>().unwrap(), ElapsedMs::from_parts(0, 12, 34));
        assert_eq!("1500".parse::<ElapsedMs>().unwrap(), ElapsedMs::from_millis(1_500));
        assert!("00:60,00".parse::<ElapsedMs>().is_err());
        assert!("soon".parse::<ElapsedMs>().is_err());
    }

    #[test]
    fn test_sub_saturates() {
        let a = ElapsedMs::from_millis(100);
        let b = ElapsedMs::from_millis(250);
        assert_eq!(a - b, Duration::ZERO);
        assert_eq!(b - a, Duration::from_millis(150));
    }

    proptest! {
        #[test]
        fn prop_parts_compose_back(mm in 0u64..10_000, ss in 0u64..60, cs in 0u64..100) {
            let t = ElapsedMs::from_parts(mm, ss, cs);
            prop_assert_eq!(t.parts(), (mm, ss, cs));
        }

        #[test]
        fn prop_display_parses_back(ms in 0u64..1_000_000_000) {
            let t = ElapsedMs::from_millis(ms);
            let shown: ElapsedMs = t.to_string().parse().unwrap();
            prop_assert_eq!(shown, ElapsedMs::from_millis(ms - ms % 10));
            prop_assert_eq!(shown.to_string(), t.to_string());
        }
    }
}
