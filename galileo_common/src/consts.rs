//! Board-wide constants shared by the engine and the bindings.

/// Default service name used when the configuration omits one.
pub const DEFAULT_SERVICE_NAME: &str = "galileo-hal";

/// Default configuration file location for the runner.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/galileo/board.toml";

// ─── Sampling ───────────────────────────────────────────────────────

/// Default period of the sampling loop in milliseconds.
pub const DEFAULT_SAMPLING_INTERVAL_MS: u32 = 10;

/// Upper bound accepted by `set_sampling_interval`.
pub const MAX_SAMPLING_INTERVAL_MS: u32 = 65_535;

/// Repeating timers never re-arm faster than this.
pub const MIN_TIMER_PERIOD_MS: u64 = 1;

// ─── I2C ────────────────────────────────────────────────────────────

/// Default delay between I2C operations in milliseconds.
pub const DEFAULT_I2C_DELAY_MS: u32 = 5;

// ─── PWM / Servo ────────────────────────────────────────────────────

/// Full-scale value of an `analog_write` duty request.
pub const PWM_MAX_VALUE: u32 = 255;

/// Largest servo angle in degrees.
pub const SERVO_MAX_ANGLE: u32 = 180;

/// Default servo pulse range in microseconds.
pub const DEFAULT_SERVO_MIN_US: u32 = 600;
pub const DEFAULT_SERVO_MAX_US: u32 = 2_600;

// ─── Pin layout ─────────────────────────────────────────────────────

/// Table index of `A0` on Arduino-layout boards.
pub const ARDUINO_ANALOG_OFFSET: u16 = 14;

/// Edison reports more pins than this when seated on the Mini breakout.
pub const MINIBOARD_PIN_COUNT_THRESHOLD: u32 = 20;

/// Default I2C bus on the Edison Mini breakout.
pub const MINIBOARD_I2C_BUS: u8 = 1;

// ─── Stepper ────────────────────────────────────────────────────────

/// Width of the step pulse on driver-topology steppers, in microseconds.
pub const STEPPER_PULSE_US: u64 = 1;

/// Microseconds per minute, used for inter-step delay.
pub const MICROS_PER_MINUTE: f64 = 60_000_000.0;
