//! Virtual clock value types for the oxmsx emulator.
//!
//! Every scheduling decision in the emulator is expressed in [`EmuTime`], a
//! 64-bit count of master-clock ticks. [`EmuDuration`] measures distances
//! between time points, [`Frequency`] describes device clock rates and
//! [`TickClock`] converts between a device's own clock and master ticks.

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod frequency;
pub mod time;

pub use clock::TickClock;
pub use error::ParseDurationError;
pub use frequency::{Frequency, ParseFrequencyError};
pub use time::{EmuDuration, EmuTime, MAIN_FREQ};
