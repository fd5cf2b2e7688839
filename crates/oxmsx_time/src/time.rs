//! Emulated time points and durations measured in master-clock ticks.
//!
//! [`EmuTime`] is the single unit of measure for every scheduling decision.
//! It counts elementary ticks of [`MAIN_FREQ`], which is a common multiple of
//! the clock rates found in the emulated hardware, so device clocks convert to
//! master ticks without drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub};
use std::str::FromStr;

use crate::error::ParseDurationError;
use crate::frequency::Frequency;

/// Master clock frequency in Hz: the CPU crystal (3.579545 MHz) times 960.
pub const MAIN_FREQ: u64 = 3_579_545 * 960;

const NANOS_PER_SEC: u64 = 1_000_000_000;
const MICROS_PER_SEC: u64 = 1_000_000;
const MILLIS_PER_SEC: u64 = 1_000;

/// A point on the emulated timeline.
///
/// Totally ordered; [`EmuTime::INFINITY`] compares greater than every finite
/// value and is used as "no pending event". Serializes as a bare tick count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmuTime(u64);

impl EmuTime {
    /// The moment the machine was powered on.
    pub const ZERO: EmuTime = EmuTime(0);

    /// Sentinel later than any reachable time.
    pub const INFINITY: EmuTime = EmuTime(u64::MAX);

    /// Creates a time point from a raw master-tick count.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the raw master-tick count.
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns `true` for the [`INFINITY`](Self::INFINITY) sentinel.
    pub const fn is_infinity(self) -> bool {
        self.0 == u64::MAX
    }

    /// Adds a duration, returning `None` if the result would reach the
    /// infinity sentinel.
    pub fn checked_add(self, d: EmuDuration) -> Option<EmuTime> {
        match self.0.checked_add(d.0) {
            Some(t) if t != u64::MAX => Some(EmuTime(t)),
            _ => None,
        }
    }

    /// Converts to seconds since power-on. Infinity maps to `f64::INFINITY`.
    pub fn as_secs_f64(self) -> f64 {
        if self.is_infinity() {
            f64::INFINITY
        } else {
            self.0 as f64 / MAIN_FREQ as f64
        }
    }
}

impl Default for EmuTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add<EmuDuration> for EmuTime {
    type Output = EmuTime;

    /// Saturates at [`EmuTime::INFINITY`].
    fn add(self, rhs: EmuDuration) -> EmuTime {
        EmuTime(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<EmuDuration> for EmuTime {
    fn add_assign(&mut self, rhs: EmuDuration) {
        *self = *self + rhs;
    }
}

impl Sub for EmuTime {
    type Output = EmuDuration;

    fn sub(self, rhs: EmuTime) -> EmuDuration {
        assert!(
            self >= rhs,
            "negative time difference: {} - {}",
            self,
            rhs
        );
        EmuDuration(self.0 - rhs.0)
    }
}

impl fmt::Display for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            write!(f, "T=inf")
        } else {
            write!(f, "T={}", self.0)
        }
    }
}

/// A distance between two [`EmuTime`] points, in master ticks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EmuDuration(u64);

impl EmuDuration {
    /// The empty duration.
    pub const ZERO: EmuDuration = EmuDuration(0);

    /// Creates a duration from a raw master-tick count.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the raw master-tick count.
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Creates a duration from nanoseconds, truncated to whole ticks.
    pub fn from_nanos(ns: u64) -> Self {
        Self::scaled(ns, NANOS_PER_SEC)
    }

    /// Creates a duration from microseconds, truncated to whole ticks.
    pub fn from_micros(us: u64) -> Self {
        Self::scaled(us, MICROS_PER_SEC)
    }

    /// Creates a duration from milliseconds, truncated to whole ticks.
    pub fn from_millis(ms: u64) -> Self {
        Self::scaled(ms, MILLIS_PER_SEC)
    }

    /// Creates a duration from (fractional) seconds, rounded to the nearest tick.
    pub fn from_secs_f64(secs: f64) -> Self {
        assert!(secs >= 0.0 && secs.is_finite(), "invalid duration: {secs}s");
        Self((secs * MAIN_FREQ as f64).round() as u64)
    }

    /// One period of `freq`, rounded to the nearest tick.
    ///
    /// # Panics
    ///
    /// Panics if the frequency is not a positive finite number.
    pub fn from_frequency(freq: Frequency) -> Self {
        let hz = freq.hz();
        assert!(hz > 0.0 && hz.is_finite(), "invalid frequency: {freq}");
        Self((MAIN_FREQ as f64 / hz).round() as u64)
    }

    /// Converts to seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MAIN_FREQ as f64
    }

    fn scaled(value: u64, units_per_sec: u64) -> Self {
        let ticks = u128::from(value) * u128::from(MAIN_FREQ) / u128::from(units_per_sec);
        Self(u64::try_from(ticks).unwrap_or(u64::MAX))
    }
}

impl Add for EmuDuration {
    type Output = EmuDuration;

    fn add(self, rhs: EmuDuration) -> EmuDuration {
        EmuDuration(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u64> for EmuDuration {
    type Output = EmuDuration;

    fn mul(self, rhs: u64) -> EmuDuration {
        EmuDuration(self.0.saturating_mul(rhs))
    }
}

impl Div for EmuDuration {
    type Output = u64;

    /// Number of whole `rhs` periods that fit in `self`.
    fn div(self, rhs: EmuDuration) -> u64 {
        self.0 / rhs.0
    }
}

impl fmt::Display for EmuDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

impl FromStr for EmuDuration {
    type Err = ParseDurationError;

    /// Parses `"<integer><unit>"` with unit `ticks`, `ns`, `us`, `ms` or `s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseDurationError::Empty);
        }

        let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digit_end == 0 {
            return Err(ParseDurationError::NoNumber(s.to_string()));
        }

        let number: u64 = s[..digit_end]
            .parse()
            .map_err(|_| ParseDurationError::InvalidNumber(s.to_string()))?;

        match s[digit_end..].trim() {
            "ticks" => Ok(Self::from_ticks(number)),
            "ns" => Ok(Self::from_nanos(number)),
            "us" => Ok(Self::from_micros(number)),
            "ms" => Ok(Self::from_millis(number)),
            "s" => Ok(Self::scaled(number, 1)),
            "" => Err(ParseDurationError::MissingUnit(s.to_string())),
            unit => Err(ParseDurationError::UnknownUnit {
                unit: unit.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_default() {
        assert_eq!(EmuTime::default(), EmuTime::ZERO);
        assert_eq!(EmuTime::ZERO.ticks(), 0);
    }

    #[test]
    fn infinity_is_greatest() {
        assert!(EmuTime::from_ticks(u64::MAX - 1) < EmuTime::INFINITY);
        assert!(EmuTime::INFINITY.is_infinity());
        assert!(!EmuTime::ZERO.is_infinity());
    }

    #[test]
    fn add_saturates_at_infinity() {
        let t = EmuTime::INFINITY + EmuDuration::from_ticks(5);
        assert_eq!(t, EmuTime::INFINITY);
        let near = EmuTime::from_ticks(u64::MAX - 2) + EmuDuration::from_ticks(10);
        assert!(near.is_infinity());
    }

    #[test]
    fn checked_add_rejects_infinity() {
        let t = EmuTime::from_ticks(10);
        assert_eq!(
            t.checked_add(EmuDuration::from_ticks(5)),
            Some(EmuTime::from_ticks(15))
        );
        assert_eq!(EmuTime::INFINITY.checked_add(EmuDuration::ZERO), None);
    }

    #[test]
    fn sub_gives_duration() {
        let a = EmuTime::from_ticks(100);
        let b = EmuTime::from_ticks(30);
        assert_eq!(a - b, EmuDuration::from_ticks(70));
    }

    #[test]
    #[should_panic(expected = "negative time difference")]
    fn sub_negative_panics() {
        let _ = EmuTime::from_ticks(1) - EmuTime::from_ticks(2);
    }

    #[test]
    fn cpu_frequency_is_960_ticks() {
        let d = EmuDuration::from_frequency(Frequency::new(3_579_545.0));
        assert_eq!(d.ticks(), 960);
    }

    #[test]
    fn sixty_hertz_period() {
        let d = EmuDuration::from_frequency(Frequency::new(60.0));
        assert_eq!(d.ticks(), 57_272_720);
    }

    #[test]
    #[should_panic(expected = "invalid frequency")]
    fn zero_frequency_panics() {
        let _ = EmuDuration::from_frequency(Frequency::new(0.0));
    }

    #[test]
    fn unit_constructors_truncate() {
        assert_eq!(EmuDuration::from_millis(1).ticks(), 3_436_363);
        assert_eq!(EmuDuration::from_micros(1).ticks(), 3_436);
        assert_eq!(EmuDuration::from_nanos(1_000).ticks(), 3_436);
        assert_eq!(EmuDuration::from_secs_f64(1.0).ticks(), MAIN_FREQ);
    }

    #[test]
    fn duration_arithmetic() {
        let d = EmuDuration::from_ticks(7);
        assert_eq!(d * 3, EmuDuration::from_ticks(21));
        assert_eq!(d + d, EmuDuration::from_ticks(14));
        assert_eq!(EmuDuration::from_ticks(22) / d, 3);
    }

    #[test]
    fn parse_units() {
        assert_eq!("123ticks".parse::<EmuDuration>().unwrap().ticks(), 123);
        assert_eq!(
            "20ms".parse::<EmuDuration>().unwrap(),
            EmuDuration::from_millis(20)
        );
        assert_eq!(
            "500us".parse::<EmuDuration>().unwrap(),
            EmuDuration::from_micros(500)
        );
        assert_eq!(
            "100ns".parse::<EmuDuration>().unwrap(),
            EmuDuration::from_nanos(100)
        );
        assert_eq!("1s".parse::<EmuDuration>().unwrap().ticks(), MAIN_FREQ);
        assert_eq!(
            "  50ns  ".parse::<EmuDuration>().unwrap(),
            EmuDuration::from_nanos(50)
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<EmuDuration>(), Err(ParseDurationError::Empty));
        assert!(matches!(
            "ms".parse::<EmuDuration>(),
            Err(ParseDurationError::NoNumber(_))
        ));
        assert!(matches!(
            "100".parse::<EmuDuration>(),
            Err(ParseDurationError::MissingUnit(_))
        ));
        assert!(matches!(
            "100xyz".parse::<EmuDuration>(),
            Err(ParseDurationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            "99999999999999999999999ns".parse::<EmuDuration>(),
            Err(ParseDurationError::InvalidNumber(_))
        ));
    }

    #[test]
    fn display() {
        assert_eq!(EmuTime::from_ticks(42).to_string(), "T=42");
        assert_eq!(EmuTime::INFINITY.to_string(), "T=inf");
        assert_eq!(EmuDuration::from_ticks(9).to_string(), "9 ticks");
    }

    #[test]
    fn seconds_conversion() {
        let t = EmuTime::ZERO + EmuDuration::from_secs_f64(2.0);
        assert_eq!(t.as_secs_f64(), 2.0);
        assert_eq!(EmuTime::INFINITY.as_secs_f64(), f64::INFINITY);
    }

    #[test]
    fn serializes_as_scalar() {
        let t = EmuTime::from_ticks(12345);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "12345");
        let back: EmuTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
