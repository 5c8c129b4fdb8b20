//! Resolved platform profile.
//!
//! A `PlatformProfile` is selected once when the board opens and is
//! immutable afterwards. Every pin resolution, capability check and PWM
//! timing decision reads it.

use super::descriptor::PinDescriptor;
use super::tables::{
    ARDUINO_PINS, EDISON_ARDUINO_PINS, GALILEO_GEN1_PINS, GALILEO_GEN2_PINS, JOULE_PINS,
    MINIBOARD_ALIASES, MINIBOARD_PINS,
};
use super::{Platform, PlatformQuery, identify};
use crate::consts::{ARDUINO_ANALOG_OFFSET, MINIBOARD_I2C_BUS};
use crate::io::{Direction, PinId, PinMode};
use std::time::Duration;

/// How the host names pins on this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinNaming {
    /// Numbers, plus `A<n>` at `analog_offset + n`.
    Arduino { analog_offset: u16 },
    /// Numbers, plus header aliases (case-insensitive, `_` and `-` equal).
    Named {
        aliases: &'static [(&'static str, u16)],
    },
}

/// Conversion from raw ADC counts to the reported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogScale {
    Identity,
    /// Drop low bits (12-bit IIO reads reported as 10-bit).
    Shift(u8),
}

impl AnalogScale {
    #[inline]
    pub const fn apply(self, raw: u16) -> u16 {
        match self {
            Self::Identity => raw,
            Self::Shift(bits) => raw >> bits,
        }
    }
}

/// PWM period table of a board family, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmTiming {
    /// Period used for `analog_write` duty output.
    pub pwm_period_ns: u32,
    /// Period used for servo pulses.
    pub servo_period_ns: u32,
    /// Duty is clamped to `period - guard`.
    pub guard_ns: u32,
    /// Wait between a period write and the following duty write.
    pub settle: Duration,
    /// All channels share one period register.
    pub shared_period: bool,
}

impl PwmTiming {
    /// Native-library boards.
    pub const MRAA: Self = Self {
        pwm_period_ns: 700_000,
        servo_period_ns: 7_968_000,
        guard_ns: 100,
        settle: Duration::ZERO,
        shared_period: false,
    };

    pub const GALILEO_GEN1: Self = Self {
        pwm_period_ns: 2_400_000,
        servo_period_ns: 2_300_000,
        guard_ns: 100,
        settle: Duration::ZERO,
        shared_period: false,
    };

    pub const GALILEO_GEN2: Self = Self {
        pwm_period_ns: 2_400_000,
        servo_period_ns: 2_800_000,
        guard_ns: 600,
        settle: Duration::from_millis(1),
        shared_period: true,
    };

    /// Period for a PWM-family mode.
    pub const fn period_ns(&self, mode: PinMode) -> u32 {
        match mode {
            PinMode::Servo => self.servo_period_ns,
            _ => self.pwm_period_ns,
        }
    }
}

/// Everything the engine needs to know about the running board.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub pins: &'static [Option<PinDescriptor>],
    pub naming: PinNaming,
    pub i2c_bus: u8,
    /// Analog reference voltage, if the board has an ADC.
    pub aref: Option<f32>,
    pub vref: f32,
    /// Direction written to an analog pin's GPIO line in ANALOG mode.
    /// `None` when the ADC channel has no GPIO line behind it.
    pub analog_direction: Option<Direction>,
    pub analog_scale: AnalogScale,
    pub pwm: PwmTiming,
}

impl PlatformProfile {
    /// Identify the platform from binding answers and build its profile.
    pub fn resolve(query: &PlatformQuery) -> Self {
        Self::for_platform(identify(query), query.default_i2c_bus)
    }

    /// Profile of a known platform. `default_i2c_bus` is used except on
    /// the Mini breakout, which always uses bus 1.
    pub fn for_platform(platform: Platform, default_i2c_bus: u8) -> Self {
        let arduino = PinNaming::Arduino {
            analog_offset: ARDUINO_ANALOG_OFFSET,
        };

        let base = Self {
            platform,
            pins: ARDUINO_PINS,
            naming: arduino,
            i2c_bus: default_i2c_bus,
            aref: Some(5.0),
            vref: 5.0,
            analog_direction: None,
            analog_scale: AnalogScale::Identity,
            pwm: PwmTiming::MRAA,
        };

        match platform {
            Platform::GalileoGen1 => Self {
                pins: GALILEO_GEN1_PINS,
                analog_direction: Some(Direction::Out),
                analog_scale: AnalogScale::Shift(2),
                pwm: PwmTiming::GALILEO_GEN1,
                ..base
            },
            Platform::GalileoGen2 => Self {
                pins: GALILEO_GEN2_PINS,
                analog_direction: Some(Direction::Out),
                analog_scale: AnalogScale::Shift(2),
                pwm: PwmTiming::GALILEO_GEN2,
                ..base
            },
            Platform::EdisonArduino => Self {
                pins: EDISON_ARDUINO_PINS,
                ..base
            },
            Platform::EdisonMiniboard => Self {
                pins: &MINIBOARD_PINS,
                naming: PinNaming::Named {
                    aliases: MINIBOARD_ALIASES,
                },
                i2c_bus: MINIBOARD_I2C_BUS,
                aref: None,
                vref: 1.8,
                ..base
            },
            Platform::Joule => Self {
                pins: &JOULE_PINS,
                naming: PinNaming::Named { aliases: &[] },
                aref: None,
                vref: 1.8,
                ..base
            },
            Platform::Generic => base,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.platform.name()
    }

    #[inline]
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Descriptor at a table index; `None` for absent or out-of-range.
    pub fn descriptor(&self, index: u16) -> Option<&'static PinDescriptor> {
        let pins: &'static [Option<PinDescriptor>] = self.pins;
        pins.get(usize::from(index)).and_then(Option::as_ref)
    }

    /// Number of ADC channels on the board.
    pub fn analog_count(&self) -> u16 {
        self.pins
            .iter()
            .flatten()
            .filter(|p| p.analog_channel.is_some())
            .count() as u16
    }

    /// Table index of ADC channel `channel` (`3` ⇒ `A3`).
    pub fn analog_index(&self, channel: u16) -> Option<u16> {
        match self.naming {
            PinNaming::Arduino { analog_offset } if channel < self.analog_count() => {
                Some(analog_offset + channel)
            }
            _ => None,
        }
    }

    /// Table index a host pin refers to, without checking presence.
    pub fn index_of(&self, pin: &PinId) -> Option<u16> {
        match (pin, self.naming) {
            (PinId::Number(n), _) => Some(*n),
            (PinId::Name(_), PinNaming::Arduino { analog_offset }) => {
                pin.analog_channel().map(|ch| analog_offset + ch)
            }
            (PinId::Name(name), PinNaming::Named { aliases }) => lookup_alias(aliases, name),
        }
    }

    /// Host-facing pin number.
    ///
    /// On Arduino layouts `"A<n>"` normalizes to `n` and numbers pass
    /// through unchanged. On named-header boards aliases resolve to their
    /// table index.
    pub fn normalize(&self, pin: &PinId) -> Option<u16> {
        match (pin, self.naming) {
            (PinId::Number(n), _) => Some(*n),
            (PinId::Name(_), PinNaming::Arduino { .. }) => pin.analog_channel(),
            (PinId::Name(name), PinNaming::Named { aliases }) => lookup_alias(aliases, name),
        }
    }
}

fn lookup_alias(aliases: &[(&str, u16)], name: &str) -> Option<u16> {
    aliases
        .iter()
        .find(|(alias, _)| alias_matches(alias, name))
        .map(|(_, index)| *index)
}

fn alias_matches(alias: &str, name: &str) -> bool {
    let fold = |b: u8| match b {
        b'_' => b'-',
        other => other.to_ascii_uppercase(),
    };
    alias.len() == name.len()
        && alias
            .bytes()
            .zip(name.bytes())
            .all(|(a, b)| fold(a) == fold(b))
}
