//! Error types for parsing human-readable durations.

/// Errors produced when parsing an [`EmuDuration`](crate::EmuDuration) from a
/// string such as `"20ms"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDurationError {
    /// The input was empty or whitespace only.
    #[error("empty duration string")]
    Empty,

    /// The input did not start with a number.
    #[error("invalid duration: no numeric value in '{0}'")]
    NoNumber(String),

    /// The numeric part did not fit in 64 bits.
    #[error("invalid number in duration '{0}'")]
    InvalidNumber(String),

    /// A number was given without a unit.
    #[error("missing unit in duration '{0}' (use ticks, ns, us, ms, or s)")]
    MissingUnit(String),

    /// The unit suffix is not recognized.
    #[error("unknown duration unit '{unit}' (use ticks, ns, us, ms, or s)")]
    UnknownUnit {
        /// The unrecognized suffix.
        unit: String,
    },
}
