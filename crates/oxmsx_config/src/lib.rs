//! Parsing and validation of `machine.toml` files.
//!
//! A machine file names the machine, sets the processor clock, lists the
//! timer devices to attach to the scheduler, and carries run and logging
//! defaults for the command-line tool. [`load_config`] produces the raw
//! [`MachineConfig`]; [`resolve_machine`] turns its strings into clock types.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{default_config, load_config, load_config_from_str, DEFAULT_CONFIG};
pub use resolve::{resolve_machine, DeviceKind, ResolvedDevice, ResolvedMachine, ResolvedRun};
pub use types::*;
