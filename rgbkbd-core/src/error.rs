use core::fmt;

/// A malformed LED wiring table or timing configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Grid cell `(x, y)` has no driver address.
    MissingAddress { x: usize, y: usize },
    /// Grid cell `(x, y)` names a cathode step the hardware does not have.
    StepOutOfRange { x: usize, y: usize, step: u8 },
    /// Grid cell `(x, y)` names an anode the hardware does not have.
    AnodeOutOfRange { x: usize, y: usize, anode: u8 },
    /// Two grid cells are wired to the same LED.
    DuplicateAddress {
        first: (usize, usize),
        second: (usize, usize),
    },
    /// A full refresh cycle takes longer than the flicker limit.
    RefreshTooSlow { refresh_us: u32, limit_us: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::MissingAddress { x, y } => {
                write!(f, "LED ({x}, {y}) has no driver address")
            }
            ConfigError::StepOutOfRange { x, y, step } => {
                write!(f, "LED ({x}, {y}) uses step {step}, beyond the last cathode")
            }
            ConfigError::AnodeOutOfRange { x, y, anode } => {
                write!(f, "LED ({x}, {y}) uses anode {anode}, beyond the last anode")
            }
            ConfigError::DuplicateAddress { first, second } => write!(
                f,
                "LEDs ({}, {}) and ({}, {}) share a driver address",
                first.0, first.1, second.0, second.1
            ),
            ConfigError::RefreshTooSlow {
                refresh_us,
                limit_us,
            } => write!(
                f,
                "refresh cycle takes {refresh_us} us, limit is {limit_us} us"
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
