//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `machine.toml` file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field holds a value that cannot be converted.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field, e.g. `devices.vdp_line.frequency`.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration is well-formed but inconsistent.
    #[error("validation error: {0}")]
    ValidationError(String),
}
