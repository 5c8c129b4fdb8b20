//! Pin modes and per-pin capability sets.
//!
//! Mode codes follow the Firmata numbering used by host automation
//! libraries: `INPUT=0, OUTPUT=1, ANALOG=2, PWM=3, SERVO=4, STEPPER=8`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating mode of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PinMode {
    Input = 0,
    Output = 1,
    Analog = 2,
    Pwm = 3,
    Servo = 4,
    Stepper = 8,
}

impl PinMode {
    /// Numeric Firmata code of the mode.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a Firmata mode code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Input),
            1 => Some(Self::Output),
            2 => Some(Self::Analog),
            3 => Some(Self::Pwm),
            4 => Some(Self::Servo),
            8 => Some(Self::Stepper),
            _ => None,
        }
    }

    /// PWM and servo both drive a PWM channel.
    #[inline]
    pub const fn uses_pwm(self) -> bool {
        matches!(self, Self::Pwm | Self::Servo)
    }

    /// Capability flag matching this mode.
    pub const fn flag(self) -> ModeSet {
        match self {
            Self::Input => ModeSet::INPUT,
            Self::Output => ModeSet::OUTPUT,
            Self::Analog => ModeSet::ANALOG,
            Self::Pwm => ModeSet::PWM,
            Self::Servo => ModeSet::SERVO,
            Self::Stepper => ModeSet::STEPPER,
        }
    }
}

impl TryFrom<u8> for PinMode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::Analog => "ANALOG",
            Self::Pwm => "PWM",
            Self::Servo => "SERVO",
            Self::Stepper => "STEPPER",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Set of modes a physical pin supports.
    ///
    /// Bit `n` is set when mode code `n` is supported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeSet: u16 {
        const INPUT   = 1 << 0;
        const OUTPUT  = 1 << 1;
        const ANALOG  = 1 << 2;
        const PWM     = 1 << 3;
        const SERVO   = 1 << 4;
        const STEPPER = 1 << 8;
    }
}

impl ModeSet {
    /// Plain GPIO pin. Any output-capable pin can be bound to a stepper.
    pub const DIGITAL: Self = Self::from_bits_truncate(
        Self::INPUT.bits() | Self::OUTPUT.bits() | Self::STEPPER.bits(),
    );

    /// GPIO pin that also routes to a PWM channel.
    pub const DIGITAL_PWM: Self = Self::from_bits_truncate(
        Self::DIGITAL.bits() | Self::PWM.bits() | Self::SERVO.bits(),
    );

    /// GPIO pin that also routes to an ADC channel.
    pub const DIGITAL_ANALOG: Self =
        Self::from_bits_truncate(Self::DIGITAL.bits() | Self::ANALOG.bits());

    /// Returns true if `mode` is in the set.
    #[inline]
    pub const fn supports(&self, mode: PinMode) -> bool {
        self.contains(mode.flag())
    }

    /// Supported modes in ascending code order.
    pub fn modes(&self) -> Vec<PinMode> {
        [
            PinMode::Input,
            PinMode::Output,
            PinMode::Analog,
            PinMode::Pwm,
            PinMode::Servo,
            PinMode::Stepper,
        ]
        .into_iter()
        .filter(|m| self.supports(*m))
        .collect()
    }
}

impl Default for ModeSet {
    fn default() -> Self {
        Self::empty()
    }
}
