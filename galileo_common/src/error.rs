//! Board-level error type returned by every fallible host operation.

use crate::binding::BindingError;
use crate::config::ConfigError;
use crate::io::PinMode;
use thiserror::Error;

/// Errors raised synchronously to the host.
///
/// Pin resolution and mode errors are fatal for the call that raised
/// them; hardware write failures never surface here (they are logged).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    /// The pin does not exist or is not connected on this board.
    #[error("{board} does not have a connection at pin {pin}")]
    InvalidPin { board: String, pin: String },

    /// The pin exists but cannot operate in the requested mode.
    #[error("{board} pin {pin} does not support {mode} mode")]
    UnsupportedMode {
        board: String,
        pin: String,
        mode: PinMode,
    },

    /// Host operation with no implementation on this board.
    #[error("{0} is not yet implemented")]
    NotImplemented(&'static str),

    /// Servo pulse range with `min_us >= max_us`.
    #[error("Invalid servo range: min {min_us}us must be below max {max_us}us")]
    InvalidServoRange { min_us: u32, max_us: u32 },

    /// Stepper index that was never configured.
    #[error("Stepper {0} is not configured")]
    UnknownStepper(u8),

    /// Error reported by the native binding.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
