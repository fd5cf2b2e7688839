//! Conversion of the string-typed configuration into clock types.

use oxmsx_serialize::ArchiveFormat;
use oxmsx_time::{EmuDuration, Frequency};

use crate::error::ConfigError;
use crate::types::{DeviceConfig, LogLevel, MachineConfig};

/// A machine description ready to be instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMachine {
    /// Machine name.
    pub name: String,
    /// Processor clock.
    pub cpu_frequency: Frequency,
    /// Processor cycles per step.
    pub cycles_per_step: u64,
    /// Devices in attach order.
    pub devices: Vec<ResolvedDevice>,
    /// Run defaults.
    pub run: ResolvedRun,
    /// Default log level.
    pub log_level: LogLevel,
}

/// A named device with parsed timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDevice {
    /// Key from `[devices.<name>]`.
    pub name: String,
    /// Device behaviour.
    pub kind: DeviceKind,
}

/// Parsed device behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceKind {
    /// Fires every `period`.
    Periodic {
        /// Configured rate.
        frequency: Frequency,
        /// One cycle of `frequency` in master ticks.
        period: EmuDuration,
    },
    /// Fires at each offset from power-on.
    Sequence {
        /// Offsets in configuration order.
        offsets: Vec<EmuDuration>,
    },
}

/// Parsed `[run]` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    /// Default run length.
    pub duration: Option<EmuDuration>,
    /// Save-state encoding.
    pub state_format: ArchiveFormat,
}

fn frequency(field: String, value: &str) -> Result<Frequency, ConfigError> {
    let freq: Frequency = value.parse().map_err(|e: oxmsx_time::ParseFrequencyError| {
        ConfigError::InvalidValue {
            field: field.clone(),
            reason: e.to_string(),
        }
    })?;
    if !freq.is_valid() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("frequency must be positive, got '{value}'"),
        });
    }
    Ok(freq)
}

fn duration(field: String, value: &str) -> Result<EmuDuration, ConfigError> {
    value
        .parse()
        .map_err(|e: oxmsx_time::ParseDurationError| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })
}

/// Parses every frequency and duration in `config`.
///
/// Fails on unparsable values, non-positive frequencies, and periodic
/// devices too fast for the master clock to represent.
pub fn resolve_machine(config: &MachineConfig) -> Result<ResolvedMachine, ConfigError> {
    let cpu_frequency = frequency(
        "machine.cpu_frequency".to_string(),
        &config.machine.cpu_frequency,
    )?;
    if cpu_frequency.period() == EmuDuration::ZERO {
        return Err(ConfigError::InvalidValue {
            field: "machine.cpu_frequency".to_string(),
            reason: format!("{cpu_frequency} is faster than the master clock"),
        });
    }

    let mut devices = Vec::with_capacity(config.devices.len());
    for (name, device) in &config.devices {
        let kind = match device {
            DeviceConfig::Periodic { frequency: rate } => {
                let field = format!("devices.{name}.frequency");
                let freq = frequency(field.clone(), rate)?;
                let period = freq.period();
                if period == EmuDuration::ZERO {
                    return Err(ConfigError::InvalidValue {
                        field,
                        reason: format!("{freq} is faster than the master clock"),
                    });
                }
                DeviceKind::Periodic {
                    frequency: freq,
                    period,
                }
            }
            DeviceConfig::Sequence { at } => {
                let offsets = at
                    .iter()
                    .enumerate()
                    .map(|(i, s)| duration(format!("devices.{name}.at[{i}]"), s))
                    .collect::<Result<Vec<_>, _>>()?;
                DeviceKind::Sequence { offsets }
            }
        };
        devices.push(ResolvedDevice {
            name: name.clone(),
            kind,
        });
    }

    let run_duration = config
        .run
        .duration
        .as_deref()
        .map(|s| duration("run.duration".to_string(), s))
        .transpose()?;

    Ok(ResolvedMachine {
        name: config.machine.name.clone(),
        cpu_frequency,
        cycles_per_step: config.machine.cycles_per_step,
        devices,
        run: ResolvedRun {
            duration: run_duration,
            state_format: config.run.state_format,
        },
        log_level: config.log.level,
    })
}
