//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::resolve::resolve_machine;
use crate::types::{DeviceConfig, MachineConfig};

/// Machine used when no `machine.toml` is given: a 60 Hz frame interrupt, a
/// line timer and a short disk-motor sequence.
pub const DEFAULT_CONFIG: &str = r#"
[machine]
name = "msx2"
cpu_frequency = "3.579545MHz"
cycles_per_step = 4

[devices.frame_irq]
kind = "periodic"
frequency = "60Hz"

[devices.line_timer]
kind = "periodic"
frequency = "15.734KHz"

[devices.fdc_motor]
kind = "sequence"
at = ["1ms", "2ms", "5ms"]

[run]
duration = "20ms"
state_format = "binary"

[log]
level = "info"
"#;

/// Loads and validates the machine file at `path`.
pub fn load_config(path: &Path) -> Result<MachineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a machine file held in memory.
pub fn load_config_from_str(content: &str) -> Result<MachineConfig, ConfigError> {
    let config: MachineConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// The built-in [`DEFAULT_CONFIG`].
pub fn default_config() -> Result<MachineConfig, ConfigError> {
    load_config_from_str(DEFAULT_CONFIG)
}

/// Checks required fields, then that every value converts.
fn validate_config(config: &MachineConfig) -> Result<(), ConfigError> {
    if config.machine.name.trim().is_empty() {
        return Err(ConfigError::MissingField("machine.name".to_string()));
    }
    if config.machine.cycles_per_step == 0 {
        return Err(ConfigError::ValidationError(
            "machine.cycles_per_step must be at least 1".to_string(),
        ));
    }
    for (name, device) in &config.devices {
        if let DeviceConfig::Sequence { at } = device {
            if at.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "sequence device '{name}' has no entries in 'at'"
                )));
            }
        }
    }
    resolve_machine(config).map(|_| ())
}
