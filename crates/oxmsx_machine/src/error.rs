//! Error types for building, saving and restoring machines.

use oxmsx_config::ConfigError;
use oxmsx_serialize::ArchiveError;
use oxmsx_time::EmuDuration;

/// Errors produced by [`Machine`](crate::Machine) operations.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// The machine description is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A save-state could not be written or read.
    #[error("save-state error: {0}")]
    Archive(#[from] ArchiveError),

    /// A save-state was made by a differently configured machine.
    #[error("save-state does not match this machine: {0}")]
    Mismatch(String),

    /// A run would end beyond the last representable emulated time.
    #[error("cannot run for {duration}: end time is out of range")]
    TimeOverflow {
        /// Requested run length.
        duration: EmuDuration,
    },
}
