//! A device clock that counts its own cycles on the master timeline.

use serde::{Deserialize, Serialize};

use crate::frequency::Frequency;
use crate::time::{EmuDuration, EmuTime};

/// Tracks the time of a device's most recent clock edge.
///
/// Devices run on their own clock (the CPU at 3.58 MHz, a line timer at
/// 15.7 kHz, ...). A `TickClock` stores the last edge and the length of one
/// cycle in master ticks, and answers "how many of my cycles until `time`?".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTickClock")]
pub struct TickClock {
    last_tick: EmuTime,
    step: EmuDuration,
}

/// Unchecked wire form of [`TickClock`].
#[derive(Deserialize)]
struct RawTickClock {
    last_tick: EmuTime,
    step: EmuDuration,
}

impl TryFrom<RawTickClock> for TickClock {
    type Error = &'static str;

    fn try_from(raw: RawTickClock) -> Result<Self, Self::Error> {
        if raw.step == EmuDuration::ZERO {
            return Err("clock step must be non-zero");
        }
        Ok(Self {
            last_tick: raw.last_tick,
            step: raw.step,
        })
    }
}

impl TickClock {
    /// Creates a clock whose last edge is at `time`, ticking at `freq`.
    pub fn new(time: EmuTime, freq: Frequency) -> Self {
        Self::with_step(time, freq.period())
    }

    /// Creates a clock with an explicit cycle length.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero.
    pub fn with_step(time: EmuTime, step: EmuDuration) -> Self {
        assert!(step > EmuDuration::ZERO, "clock step must be non-zero");
        Self {
            last_tick: time,
            step,
        }
    }

    /// Time of the most recent edge.
    pub fn time(&self) -> EmuTime {
        self.last_tick
    }

    /// Length of one cycle.
    pub fn step(&self) -> EmuDuration {
        self.step
    }

    /// Moves the last edge to `time` without counting cycles.
    pub fn reset(&mut self, time: EmuTime) {
        self.last_tick = time;
    }

    /// Changes the clock rate; the last edge is kept.
    pub fn set_frequency(&mut self, freq: Frequency) {
        self.step = freq.period();
    }

    /// Number of whole cycles between the last edge and `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is before the last edge.
    pub fn ticks_till(&self, time: EmuTime) -> u64 {
        (time - self.last_tick) / self.step
    }

    /// Advances the last edge by as many whole cycles as fit before `time`.
    pub fn advance(&mut self, time: EmuTime) {
        let n = self.ticks_till(time);
        self.last_tick += self.step * n;
    }

    /// The time `n` cycles after the last edge.
    pub fn time_after(&self, n: u64) -> EmuTime {
        self.last_tick + self.step * n
    }

    /// Moves the last edge forward by `n` cycles.
    pub fn fast_add(&mut self, n: u64) {
        self.last_tick += self.step * n;
    }
}
