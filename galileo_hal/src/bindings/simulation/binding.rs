//! Simulation binding implementation.
//!
//! `SimulationBinding` implements `IoBinding` against [`SimLines`] and
//! records every hardware call in order. A `SimulationProbe` shares the
//! same state so tests can drive inputs and inspect the call log after
//! the binding has been moved into a `Board`.

use super::lines::{SimLine, SimLines, SimPwm};
use galileo_common::binding::{BindingError, I2cHandleId, IoBinding};
use galileo_common::config::SimulationSection;
use galileo_common::io::{Direction, Level};
use galileo_common::platform::{
    PLATFORM_EDISON, PLATFORM_GALILEO_GEN1, PLATFORM_GALILEO_GEN2, PLATFORM_JOULE, Platform,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// One recorded hardware call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwCall {
    GpioOpen(u16),
    GpioDir(u16, Direction),
    GpioRead(u16),
    GpioWrite(u16, Level),
    AioOpen(u8),
    AioRead(u8),
    PwmOpen(u8),
    PwmEnable(u8, bool),
    PwmPeriod(u8, u32),
    PwmDuty(u8, u32),
    PwmRead(u8),
    I2cOpen(u8),
    I2cAddress(u32, u8),
    /// Device address, byte count.
    I2cRead(u8, usize),
    /// Device address, register, byte count.
    I2cReadReg(u8, u8, usize),
    I2cWrite(u8, Vec<u8>),
    I2cWriteReg(u8, u8, u8),
}

#[derive(Debug, Default)]
struct SimState {
    lines: SimLines,
    calls: Vec<HwCall>,
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Software binding for development and tests.
#[derive(Debug)]
pub struct SimulationBinding {
    platform_type: u32,
    pin_count: u32,
    default_i2c_bus: u8,
    state: Shared,
}

impl SimulationBinding {
    /// Binding reporting the given platform identity.
    pub fn new(platform_type: u32, pin_count: u32, default_i2c_bus: u8) -> Self {
        Self {
            platform_type,
            pin_count,
            default_i2c_bus,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn from_config(config: &SimulationSection) -> Self {
        Self::new(config.platform_type, config.pin_count, config.default_i2c_bus)
    }

    /// Binding whose identity resolves to `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::GalileoGen1 => Self::new(PLATFORM_GALILEO_GEN1, 20, 0),
            Platform::GalileoGen2 => Self::new(PLATFORM_GALILEO_GEN2, 20, 0),
            Platform::EdisonArduino => Self::new(PLATFORM_EDISON, 20, 6),
            Platform::EdisonMiniboard => Self::new(PLATFORM_EDISON, 56, 6),
            Platform::Joule => Self::new(PLATFORM_JOULE, 104, 0),
            Platform::Generic => Self::new(99, 20, 0),
        }
    }

    /// Handle sharing this binding's state.
    pub fn probe(&self) -> SimulationProbe {
        SimulationProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn record(&self, call: HwCall) -> MutexGuard<'_, SimState> {
        trace!("sim: {:?}", call);
        let mut state = lock(&self.state);
        state.calls.push(call);
        state
    }
}

impl IoBinding for SimulationBinding {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn platform_type(&self) -> u32 {
        self.platform_type
    }

    fn platform_name(&self) -> String {
        format!("Simulated platform {}", self.platform_type)
    }

    fn pin_count(&self) -> u32 {
        self.pin_count
    }

    fn default_i2c_bus(&self) -> u8 {
        self.default_i2c_bus
    }

    fn gpio_open(&mut self, line: u16) -> Result<(), BindingError> {
        self.record(HwCall::GpioOpen(line)).lines.gpio_open(line);
        Ok(())
    }

    fn gpio_dir(&mut self, line: u16, direction: Direction) -> Result<(), BindingError> {
        self.record(HwCall::GpioDir(line, direction))
            .lines
            .gpio_dir(line, direction)
    }

    fn gpio_read(&mut self, line: u16) -> Result<Level, BindingError> {
        self.record(HwCall::GpioRead(line)).lines.gpio_read(line)
    }

    fn gpio_write(&mut self, line: u16, level: Level) -> Result<(), BindingError> {
        self.record(HwCall::GpioWrite(line, level))
            .lines
            .gpio_write(line, level)
    }

    fn aio_open(&mut self, channel: u8) -> Result<(), BindingError> {
        self.record(HwCall::AioOpen(channel)).lines.aio_open(channel);
        Ok(())
    }

    fn aio_read(&mut self, channel: u8) -> Result<u16, BindingError> {
        self.record(HwCall::AioRead(channel)).lines.aio_read(channel)
    }

    fn pwm_open(&mut self, channel: u8) -> Result<(), BindingError> {
        self.record(HwCall::PwmOpen(channel)).lines.pwm_open(channel);
        Ok(())
    }

    fn pwm_enable(&mut self, channel: u8, enable: bool) -> Result<(), BindingError> {
        self.record(HwCall::PwmEnable(channel, enable))
            .lines
            .pwm_mut(channel)?
            .enabled = enable;
        Ok(())
    }

    fn pwm_period_ns(&mut self, channel: u8, period_ns: u32) -> Result<(), BindingError> {
        self.record(HwCall::PwmPeriod(channel, period_ns))
            .lines
            .pwm_mut(channel)?
            .period_ns = period_ns;
        Ok(())
    }

    fn pwm_duty_ns(&mut self, channel: u8, duty_ns: u32) -> Result<(), BindingError> {
        self.record(HwCall::PwmDuty(channel, duty_ns))
            .lines
            .pwm_mut(channel)?
            .duty_ns = duty_ns;
        Ok(())
    }

    fn pwm_read(&mut self, channel: u8) -> Result<f32, BindingError> {
        Ok(self
            .record(HwCall::PwmRead(channel))
            .lines
            .pwm_mut(channel)?
            .fraction())
    }

    fn i2c_open(&mut self, bus: u8) -> Result<I2cHandleId, BindingError> {
        let handle = self.record(HwCall::I2cOpen(bus)).lines.i2c_open();
        debug!("Simulated I2C bus {} opened as handle {}", bus, handle.0);
        Ok(handle)
    }

    fn i2c_address(&mut self, handle: I2cHandleId, address: u8) -> Result<(), BindingError> {
        self.record(HwCall::I2cAddress(handle.0, address))
            .lines
            .i2c_address(handle, address)
    }

    fn i2c_read(&mut self, handle: I2cHandleId, length: usize) -> Result<Vec<u8>, BindingError> {
        let mut state = lock(&self.state);
        let address = state.lines.i2c_selected(handle)?;
        state.calls.push(HwCall::I2cRead(address, length));
        state.lines.i2c_read(address, None, length)
    }

    fn i2c_read_reg(
        &mut self,
        handle: I2cHandleId,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, BindingError> {
        let mut state = lock(&self.state);
        let address = state.lines.i2c_selected(handle)?;
        state.calls.push(HwCall::I2cReadReg(address, register, length));
        state.lines.i2c_read(address, Some(register), length)
    }

    fn i2c_write(&mut self, handle: I2cHandleId, bytes: &[u8]) -> Result<(), BindingError> {
        let mut state = lock(&self.state);
        let address = state.lines.i2c_selected(handle)?;
        state.calls.push(HwCall::I2cWrite(address, bytes.to_vec()));
        state.lines.i2c_check_write(address)
    }

    fn i2c_write_reg(
        &mut self,
        handle: I2cHandleId,
        register: u8,
        value: u8,
    ) -> Result<(), BindingError> {
        let mut state = lock(&self.state);
        let address = state.lines.i2c_selected(handle)?;
        state.calls.push(HwCall::I2cWriteReg(address, register, value));
        state.lines.i2c_check_write(address)
    }
}

/// Test-side view of a `SimulationBinding`.
#[derive(Debug, Clone)]
pub struct SimulationProbe {
    state: Shared,
}

impl SimulationProbe {
    /// Calls recorded since the last `clear_calls`.
    pub fn calls(&self) -> Vec<HwCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&HwCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|c| pred(c)).count()
    }

    pub fn set_input(&self, line: u16, level: Level) {
        lock(&self.state).lines.set_input(line, level);
    }

    pub fn set_analog(&self, channel: u8, raw: u16) {
        lock(&self.state).lines.set_analog(channel, raw);
    }

    /// Bytes returned by reads from `address` (at `register`, if given).
    pub fn set_i2c_data(&self, address: u8, register: Option<u8>, data: Vec<u8>) {
        lock(&self.state).lines.set_i2c_data(address, register, data);
    }

    /// Make every transfer to `address` fail.
    pub fn set_i2c_failing(&self, address: u8, failing: bool) {
        lock(&self.state).lines.set_i2c_failing(address, failing);
    }

    pub fn line(&self, line: u16) -> Option<SimLine> {
        lock(&self.state).lines.line(line)
    }

    pub fn pwm(&self, channel: u8) -> Option<SimPwm> {
        lock(&self.state).lines.pwm(channel)
    }

    pub fn i2c_handle_count(&self) -> usize {
        lock(&self.state).lines.i2c_handle_count()
    }
}
