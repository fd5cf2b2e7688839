//! Configuration types deserialized from `machine.toml`.

use std::collections::BTreeMap;
use std::fmt;

use oxmsx_serialize::ArchiveFormat;
use serde::Deserialize;

/// The top-level configuration parsed from `machine.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Machine identity and processor clock.
    pub machine: MachineMeta,
    /// Timer devices keyed by name. Attach order follows key order.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceConfig>,
    /// Defaults for `oxmsx run`.
    #[serde(default)]
    pub run: RunConfig,
    /// Logging defaults.
    #[serde(default)]
    pub log: LogConfig,
}

/// The `[machine]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineMeta {
    /// Machine name, stored in save-states.
    pub name: String,
    /// Processor clock, e.g. `"3.579545MHz"`.
    #[serde(default = "default_cpu_frequency")]
    pub cpu_frequency: String,
    /// Processor cycles executed between sync point checks.
    #[serde(default = "default_cycles_per_step")]
    pub cycles_per_step: u64,
}

fn default_cpu_frequency() -> String {
    "3.579545MHz".to_string()
}

fn default_cycles_per_step() -> u64 {
    4
}

/// One `[devices.<name>]` table, selected by its `kind` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// Fires once per period, forever.
    Periodic {
        /// Firing rate, e.g. `"15.734KHz"`.
        frequency: String,
    },
    /// Fires at fixed offsets from power-on.
    Sequence {
        /// Offsets such as `"1ms"` or `"500us"`.
        at: Vec<String>,
    },
}

/// The `[run]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// How long `oxmsx run` emulates when `--for` is not given.
    #[serde(default)]
    pub duration: Option<String>,
    /// Encoding used when saving a state.
    #[serde(default)]
    pub state_format: ArchiveFormat,
}

/// The `[log]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Default verbosity.
    #[serde(default)]
    pub level: LogLevel,
}

/// Verbosity levels accepted in `[log] level`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Normal progress messages.
    #[default]
    Info,
    /// Registration and persistence details.
    Debug,
    /// Every dispatch.
    Trace,
}

impl LogLevel {
    /// The level as a filter directive.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
