//! Per-pin capability and routing descriptors.

use crate::io::{Level, ModeSet, PinMode};

/// Auxiliary control line that must sit at `level` before the pin it
/// gates is usable. Lines may be shared between pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MuxLine {
    pub line: u16,
    pub level: Level,
}

impl MuxLine {
    pub const fn new(line: u16, level: Level) -> Self {
        Self { line, level }
    }
}

/// Static description of one physical pin.
///
/// Built with `const` builders so that whole tables live in read-only
/// memory:
///
/// ```rust
/// use galileo_common::io::{Level, PinMode};
/// use galileo_common::platform::{MuxLine, PinDescriptor};
///
/// const PIN: PinDescriptor = PinDescriptor::gpio(14)
///     .pwm(1, &[MuxLine::new(64, Level::High)]);
/// assert!(PIN.supports(PinMode::Servo));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinDescriptor {
    /// Supported modes.
    pub modes: ModeSet,
    /// GPIO line in binding numbering.
    pub line: u16,
    /// ADC channel for ANALOG mode.
    pub analog_channel: Option<u8>,
    /// PWM channel for PWM and SERVO modes.
    pub pwm_channel: Option<u8>,
    /// Mux chain for digital input/output.
    pub gpio_mux: &'static [MuxLine],
    /// Mux chain for ANALOG mode.
    pub analog_mux: &'static [MuxLine],
    /// Mux chain for PWM and SERVO modes.
    pub pwm_mux: &'static [MuxLine],
    /// Level-shifter enable line; driven low for output, high for input.
    pub output_enable: Option<u16>,
}

impl PinDescriptor {
    /// Plain digital pin on `line`.
    pub const fn gpio(line: u16) -> Self {
        Self {
            modes: ModeSet::DIGITAL,
            line,
            analog_channel: None,
            pwm_channel: None,
            gpio_mux: &[],
            analog_mux: &[],
            pwm_mux: &[],
            output_enable: None,
        }
    }

    /// Route PWM and SERVO to `channel` through `mux`.
    pub const fn pwm(mut self, channel: u8, mux: &'static [MuxLine]) -> Self {
        self.modes = self.modes.union(ModeSet::PWM).union(ModeSet::SERVO);
        self.pwm_channel = Some(channel);
        self.pwm_mux = mux;
        self
    }

    /// Route ANALOG to ADC `channel` through `mux`.
    pub const fn analog(mut self, channel: u8, mux: &'static [MuxLine]) -> Self {
        self.modes = self.modes.union(ModeSet::ANALOG);
        self.analog_channel = Some(channel);
        self.analog_mux = mux;
        self
    }

    /// Mux chain for the digital function.
    pub const fn muxed(mut self, mux: &'static [MuxLine]) -> Self {
        self.gpio_mux = mux;
        self
    }

    /// Present but unusable by the host in any mode (UART lines).
    pub const fn reserved(mut self) -> Self {
        self.modes = ModeSet::empty();
        self
    }

    pub const fn output_enable(mut self, line: u16) -> Self {
        self.output_enable = Some(line);
        self
    }

    #[inline]
    pub const fn supports(&self, mode: PinMode) -> bool {
        self.modes.supports(mode)
    }

    /// Mux chain that must be applied before using the pin in `mode`.
    pub const fn mux_chain(&self, mode: PinMode) -> &'static [MuxLine] {
        match mode {
            PinMode::Analog => self.analog_mux,
            PinMode::Pwm | PinMode::Servo => self.pwm_mux,
            PinMode::Input | PinMode::Output | PinMode::Stepper => self.gpio_mux,
        }
    }
}
