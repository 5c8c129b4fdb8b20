//! In-memory model of the GPIO, ADC, PWM and I2C lines behind the
//! simulation binding.

use galileo_common::binding::{BindingError, I2cHandleId};
use galileo_common::io::{Direction, Level};
use std::collections::{HashMap, HashSet};

/// One simulated GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimLine {
    pub direction: Option<Direction>,
    /// Driven level for outputs, externally applied level for inputs.
    pub level: Level,
}

/// One simulated PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimPwm {
    pub enabled: bool,
    pub period_ns: u32,
    pub duty_ns: u32,
}

impl SimPwm {
    /// Duty cycle as a fraction of the period.
    pub fn fraction(&self) -> f32 {
        if self.period_ns == 0 {
            0.0
        } else {
            self.duty_ns as f32 / self.period_ns as f32
        }
    }
}

/// Simulated peripherals. Reads return what tests preloaded.
#[derive(Debug, Default)]
pub struct SimLines {
    gpio: HashMap<u16, SimLine>,
    adc: HashMap<u8, u16>,
    adc_open: HashSet<u8>,
    pwm: HashMap<u8, SimPwm>,
    /// Selected address per opened I2C context.
    i2c_handles: Vec<Option<u8>>,
    /// Raw read data per device address.
    i2c_data: HashMap<u8, Vec<u8>>,
    /// Register read data per (address, register).
    i2c_registers: HashMap<(u8, u8), Vec<u8>>,
    i2c_failing: HashSet<u8>,
}

impl SimLines {
    // ─── GPIO ───────────────────────────────────────────────────────

    pub fn gpio_open(&mut self, line: u16) {
        self.gpio.entry(line).or_default();
    }

    pub fn gpio_dir(&mut self, line: u16, direction: Direction) -> Result<(), BindingError> {
        self.gpio_mut(line)?.direction = Some(direction);
        Ok(())
    }

    pub fn gpio_write(&mut self, line: u16, level: Level) -> Result<(), BindingError> {
        self.gpio_mut(line)?.level = level;
        Ok(())
    }

    pub fn gpio_read(&self, line: u16) -> Result<Level, BindingError> {
        self.gpio
            .get(&line)
            .map(|l| l.level)
            .ok_or_else(|| BindingError::InvalidLine(format!("gpio {line} not open")))
    }

    /// Apply an external level. Opens the line if needed.
    pub fn set_input(&mut self, line: u16, level: Level) {
        self.gpio.entry(line).or_default().level = level;
    }

    pub fn line(&self, line: u16) -> Option<SimLine> {
        self.gpio.get(&line).copied()
    }

    fn gpio_mut(&mut self, line: u16) -> Result<&mut SimLine, BindingError> {
        self.gpio
            .get_mut(&line)
            .ok_or_else(|| BindingError::InvalidLine(format!("gpio {line} not open")))
    }

    // ─── ADC ────────────────────────────────────────────────────────

    pub fn aio_open(&mut self, channel: u8) {
        self.adc_open.insert(channel);
    }

    pub fn aio_read(&self, channel: u8) -> Result<u16, BindingError> {
        if !self.adc_open.contains(&channel) {
            return Err(BindingError::InvalidLine(format!("adc {channel} not open")));
        }
        Ok(self.adc.get(&channel).copied().unwrap_or(0))
    }

    pub fn set_analog(&mut self, channel: u8, raw: u16) {
        self.adc.insert(channel, raw);
    }

    // ─── PWM ────────────────────────────────────────────────────────

    pub fn pwm_open(&mut self, channel: u8) {
        self.pwm.entry(channel).or_default();
    }

    pub fn pwm_mut(&mut self, channel: u8) -> Result<&mut SimPwm, BindingError> {
        self.pwm
            .get_mut(&channel)
            .ok_or_else(|| BindingError::InvalidLine(format!("pwm {channel} not open")))
    }

    pub fn pwm(&self, channel: u8) -> Option<SimPwm> {
        self.pwm.get(&channel).copied()
    }

    // ─── I2C ────────────────────────────────────────────────────────

    pub fn i2c_open(&mut self) -> I2cHandleId {
        self.i2c_handles.push(None);
        I2cHandleId(self.i2c_handles.len() as u32 - 1)
    }

    pub fn i2c_address(&mut self, handle: I2cHandleId, address: u8) -> Result<(), BindingError> {
        let slot = self
            .i2c_handles
            .get_mut(handle.0 as usize)
            .ok_or_else(|| BindingError::InvalidLine(format!("i2c handle {}", handle.0)))?;
        *slot = Some(address);
        Ok(())
    }

    /// Address currently selected on `handle`.
    pub fn i2c_selected(&self, handle: I2cHandleId) -> Result<u8, BindingError> {
        self.i2c_handles
            .get(handle.0 as usize)
            .copied()
            .flatten()
            .ok_or_else(|| BindingError::InvalidLine(format!("i2c handle {} has no address", handle.0)))
    }

    pub fn i2c_read(&self, address: u8, register: Option<u8>, length: usize) -> Result<Vec<u8>, BindingError> {
        if self.i2c_failing.contains(&address) {
            return Err(BindingError::Io(format!("no ack from 0x{address:02x}")));
        }
        let data = match register {
            Some(reg) => self.i2c_registers.get(&(address, reg)),
            None => self.i2c_data.get(&address),
        };
        Ok(data
            .map(|d| d.iter().copied().take(length).collect())
            .unwrap_or_default())
    }

    pub fn i2c_check_write(&self, address: u8) -> Result<(), BindingError> {
        if self.i2c_failing.contains(&address) {
            return Err(BindingError::Io(format!("no ack from 0x{address:02x}")));
        }
        Ok(())
    }

    pub fn set_i2c_data(&mut self, address: u8, register: Option<u8>, data: Vec<u8>) {
        match register {
            Some(reg) => {
                self.i2c_registers.insert((address, reg), data);
            }
            None => {
                self.i2c_data.insert(address, data);
            }
        }
    }

    pub fn set_i2c_failing(&mut self, address: u8, failing: bool) {
        if failing {
            self.i2c_failing.insert(address);
        } else {
            self.i2c_failing.remove(&address);
        }
    }

    pub fn i2c_handle_count(&self) -> usize {
        self.i2c_handles.len()
    }
}
