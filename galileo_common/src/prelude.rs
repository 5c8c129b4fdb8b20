//! Prelude module for common re-exports.
//!
//! ```rust
//! use galileo_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    BoardConfig, ConfigError, ConfigLoader, I2cHandleMode, LogLevel, SharedConfig,
};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::BoardError;

// ─── Binding ────────────────────────────────────────────────────────
pub use crate::binding::{BindingError, BindingFactory, I2cHandleId, IoBinding};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::{Direction, Level, ModeSet, PinId, PinMode};

// ─── Platform ───────────────────────────────────────────────────────
pub use crate::platform::{
    MuxLine, PinDescriptor, Platform, PlatformProfile, PlatformQuery, PwmTiming,
};

/// Logic high.
pub const HIGH: u8 = 1;
/// Logic low.
pub const LOW: u8 = 0;
