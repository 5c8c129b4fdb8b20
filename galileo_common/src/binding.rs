//! Native binding trait and error types.
//!
//! This module defines:
//! - `IoBinding` trait - Interface to the native GPIO/ADC/PWM/I2C layer
//! - `BindingError` enum - Error types for binding operations
//! - `BindingFactory` type alias - Factory function type
//! - `I2cHandleId` - Opaque handle to an opened I2C bus context

use crate::config::BoardConfig;
use crate::io::{Direction, Level};
use thiserror::Error;

/// Error types for binding operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    /// The binding has no implementation for this feature.
    #[error("Feature not supported by binding: {0}")]
    NotSupported(String),

    /// The line, channel or handle does not exist on this binding.
    #[error("Invalid line or channel: {0}")]
    InvalidLine(String),

    /// Hardware communication error.
    #[error("Hardware I/O error: {0}")]
    Io(String),

    /// Binding not found in the registry.
    #[error("Binding not found: {0}")]
    BindingNotFound(String),

    /// Binding initialization failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),
}

impl From<std::io::Error> for BindingError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Factory function type for creating binding instances.
pub type BindingFactory = fn(&BoardConfig) -> Result<Box<dyn IoBinding>, BindingError>;

/// Handle to an I2C bus context opened through `IoBinding::i2c_open`.
///
/// Each handle carries its own selected device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct I2cHandleId(pub u32);

/// Trait defining the interface to the native I/O layer.
///
/// The board engine reaches hardware only through this trait, enabling
/// pluggable backends (in-memory simulation, Linux sysfs, a native
/// library wrapper).
///
/// # Line numbering
///
/// `line` arguments are binding-level GPIO numbers as stored in the pin
/// tables, never host pin numbers. `channel` arguments are ADC or PWM
/// channel numbers.
///
/// # Error contract
///
/// | Operation | Failure handling in the engine |
/// |-----------|--------------------------------|
/// | platform queries | None (infallible) |
/// | `gpio_*`, `pwm_*` writes | logged at `warn`, not propagated |
/// | `gpio_read`, `aio_read` | logged, sample skipped |
/// | `i2c_*` | logged, reply emitted with partial data |
pub trait IoBinding: Send {
    /// Returns the binding's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Returns the binding's semantic version.
    fn version(&self) -> &'static str;

    // ─── Platform identity ──────────────────────────────────────────

    /// Platform family id (0 = Galileo Gen 1, 1 = Galileo Gen 2,
    /// 2 = Edison, 13 = Joule).
    fn platform_type(&self) -> u32;

    /// Human readable platform name.
    fn platform_name(&self) -> String;

    /// Number of pins the native layer exposes.
    fn pin_count(&self) -> u32;

    /// Default I2C bus of the platform.
    fn default_i2c_bus(&self) -> u8;

    // ─── GPIO ───────────────────────────────────────────────────────

    fn gpio_open(&mut self, line: u16) -> Result<(), BindingError>;

    fn gpio_dir(&mut self, line: u16, direction: Direction) -> Result<(), BindingError>;

    fn gpio_read(&mut self, line: u16) -> Result<Level, BindingError>;

    fn gpio_write(&mut self, line: u16, level: Level) -> Result<(), BindingError>;

    // ─── Analog input ───────────────────────────────────────────────

    fn aio_open(&mut self, channel: u8) -> Result<(), BindingError>;

    /// Raw ADC reading.
    fn aio_read(&mut self, channel: u8) -> Result<u16, BindingError>;

    // ─── PWM ────────────────────────────────────────────────────────

    fn pwm_open(&mut self, channel: u8) -> Result<(), BindingError>;

    fn pwm_enable(&mut self, channel: u8, enable: bool) -> Result<(), BindingError>;

    fn pwm_period_ns(&mut self, channel: u8, period_ns: u32) -> Result<(), BindingError>;

    fn pwm_duty_ns(&mut self, channel: u8, duty_ns: u32) -> Result<(), BindingError>;

    /// Current duty as a fraction of the period (0.0 - 1.0).
    fn pwm_read(&mut self, channel: u8) -> Result<f32, BindingError>;

    // ─── I2C ────────────────────────────────────────────────────────

    /// Open a new context on `bus`.
    fn i2c_open(&mut self, bus: u8) -> Result<I2cHandleId, BindingError>;

    /// Select the device address for subsequent transfers on `handle`.
    fn i2c_address(&mut self, handle: I2cHandleId, address: u8) -> Result<(), BindingError>;

    /// Read up to `length` bytes. May return fewer.
    fn i2c_read(&mut self, handle: I2cHandleId, length: usize) -> Result<Vec<u8>, BindingError>;

    /// Read up to `length` bytes starting at `register`. May return fewer.
    fn i2c_read_reg(
        &mut self,
        handle: I2cHandleId,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, BindingError>;

    fn i2c_write(&mut self, handle: I2cHandleId, bytes: &[u8]) -> Result<(), BindingError>;

    fn i2c_write_reg(
        &mut self,
        handle: I2cHandleId,
        register: u8,
        value: u8,
    ) -> Result<(), BindingError>;

    /// Release native resources.
    /// Default: No-op
    fn shutdown(&mut self) -> Result<(), BindingError> {
        Ok(())
    }
}
