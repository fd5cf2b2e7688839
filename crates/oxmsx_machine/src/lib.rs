//! Machine assembly: one scheduler, the processor that drives it, and the
//! timer devices attached to it.
//!
//! The processor model here executes no instructions. It only advances its
//! clock in whole steps and hands control to the scheduler whenever it
//! passes the next sync point, which is how the real emulator interleaves
//! the CPU with every other device.

#![warn(missing_docs)]

pub mod cpu;
pub mod error;
pub mod machine;
pub mod sequencer;
pub mod timer;

pub use cpu::{Cpu, CpuState, RunStats};
pub use error::MachineError;
pub use machine::{DeviceSummary, DeviceType, Machine, MachineState};
pub use sequencer::Sequencer;
pub use timer::PeriodicTimer;
