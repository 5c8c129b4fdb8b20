//! Pin state machine and multiplexer coordinator.
//!
//! One `PinState` per present table entry. Mode transitions drive the
//! pin's mux chain (in declared order, each line gated by its last known
//! level), then the PWM channel or GPIO direction. Hardware write failures
//! are logged and never abort a transition.

use galileo_common::binding::{BindingError, IoBinding};
use galileo_common::consts::{DEFAULT_SERVO_MAX_US, DEFAULT_SERVO_MIN_US, PWM_MAX_VALUE};
use galileo_common::error::BoardError;
use galileo_common::io::{Direction, Level, PinId, PinMode};
use galileo_common::platform::{MuxLine, PinDescriptor, PlatformProfile};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Servo pulse window in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoRange {
    pub min_us: u32,
    pub max_us: u32,
}

impl ServoRange {
    /// # Errors
    /// `BoardError::InvalidServoRange` unless `min_us < max_us`.
    pub fn new(min_us: u32, max_us: u32) -> Result<Self, BoardError> {
        if min_us >= max_us {
            return Err(BoardError::InvalidServoRange { min_us, max_us });
        }
        Ok(Self { min_us, max_us })
    }
}

impl Default for ServoRange {
    fn default() -> Self {
        Self {
            min_us: DEFAULT_SERVO_MIN_US,
            max_us: DEFAULT_SERVO_MAX_US,
        }
    }
}

/// PWM channel bookkeeping, allocated on first PWM/SERVO use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannel {
    pub channel: u8,
    pub enabled: bool,
    pub period_ns: Option<u32>,
    pub duty_ns: Option<u32>,
}

impl PwmChannel {
    fn new(channel: u8) -> Self {
        Self {
            channel,
            enabled: false,
            period_ns: None,
            duty_ns: None,
        }
    }
}

/// Runtime state of one physical pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PinState {
    /// Table index.
    pub index: u16,
    /// `None` until the first mode change.
    pub mode: Option<PinMode>,
    /// Last direction written to the GPIO line.
    pub direction: Option<Direction>,
    /// Last written or sampled value.
    pub value: u32,
    /// Registered with the sampling loop.
    pub report: bool,
    pub servo: ServoRange,
    pub pwm: Option<PwmChannel>,
    gpio_open: bool,
}

impl PinState {
    fn new(index: u16, servo: ServoRange) -> Self {
        Self {
            index,
            mode: None,
            direction: None,
            value: 0,
            report: false,
            servo,
            pwm: None,
            gpio_open: false,
        }
    }

    /// Currently in PWM or SERVO mode.
    pub fn is_pwm(&self) -> bool {
        self.mode.is_some_and(PinMode::uses_pwm)
    }
}

/// A host pin resolved against the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPin {
    /// The pin as the host named it.
    pub id: PinId,
    pub index: u16,
    pub descriptor: &'static PinDescriptor,
}

/// Per-pin state plus the level of every auxiliary line driven so far.
#[derive(Debug)]
pub struct PinBank {
    states: Vec<Option<PinState>>,
    /// Mux and output-enable lines; presence means initialized.
    lines: HashMap<u16, Level>,
}

impl PinBank {
    /// Fresh state for every present pin. No hardware access.
    pub fn new(profile: &PlatformProfile, servo: ServoRange) -> Self {
        let states = profile
            .pins
            .iter()
            .enumerate()
            .map(|(i, slot)| slot.as_ref().map(|_| PinState::new(i as u16, servo)))
            .collect();
        Self {
            states,
            lines: HashMap::new(),
        }
    }

    /// Open every pin: digital lines as low outputs, ADC channels for reading.
    pub fn init_hardware(&mut self, binding: &mut dyn IoBinding, profile: &PlatformProfile) {
        for state in self.states.iter_mut().flatten() {
            let Some(descriptor) = profile.descriptor(state.index) else {
                continue;
            };
            if let Some(channel) = descriptor.analog_channel {
                log_hw(binding.aio_open(channel), "aio open", u16::from(channel));
                continue;
            }
            let line = descriptor.line;
            log_hw(binding.gpio_open(line), "gpio open", line);
            log_hw(binding.gpio_dir(line, Direction::Out), "gpio dir", line);
            log_hw(binding.gpio_write(line, Level::Low), "gpio write", line);
            state.gpio_open = true;
            state.direction = Some(Direction::Out);
        }
        debug!("Initialized {} pins", self.states.iter().flatten().count());
    }

    /// Resolve a host pin to a present table entry.
    ///
    /// # Errors
    /// `BoardError::InvalidPin` if the pin is absent or out of range.
    pub fn resolve(&self, profile: &PlatformProfile, pin: &PinId) -> Result<ResolvedPin, BoardError> {
        profile
            .index_of(pin)
            .and_then(|index| {
                profile.descriptor(index).map(|descriptor| ResolvedPin {
                    id: pin.clone(),
                    index,
                    descriptor,
                })
            })
            .ok_or_else(|| invalid_pin(profile, pin))
    }

    pub fn state(&self, index: u16) -> Option<&PinState> {
        self.states.get(usize::from(index)).and_then(Option::as_ref)
    }

    pub fn state_mut(&mut self, index: u16) -> Option<&mut PinState> {
        self.states.get_mut(usize::from(index)).and_then(Option::as_mut)
    }

    /// Every slot of the table, `None` for absent pins.
    pub fn states(&self) -> &[Option<PinState>] {
        &self.states
    }

    /// Last level driven on an auxiliary line.
    pub fn line_level(&self, line: u16) -> Option<Level> {
        self.lines.get(&line).copied()
    }

    /// Switch a pin to `mode`.
    ///
    /// Re-entering the current mode writes nothing, except that PWM and
    /// SERVO re-assert the channel enable.
    ///
    /// # Errors
    /// `BoardError::UnsupportedMode` if the pin does not list `mode`.
    pub fn set_mode(
        &mut self,
        binding: &mut dyn IoBinding,
        profile: &PlatformProfile,
        pin: &ResolvedPin,
        mode: PinMode,
    ) -> Result<(), BoardError> {
        let descriptor = pin.descriptor;
        if !descriptor.supports(mode) {
            return Err(BoardError::UnsupportedMode {
                board: profile.name().to_string(),
                pin: pin.id.to_string(),
                mode,
            });
        }

        let previous = self.state(pin.index).and_then(|s| s.mode);
        if previous == Some(mode) {
            if mode.uses_pwm() {
                self.enable_pwm(binding, pin);
            }
            return Ok(());
        }

        if previous.is_some_and(PinMode::uses_pwm) && !mode.uses_pwm() {
            self.disable_pwm(binding, pin.index);
        }

        self.apply_mux(binding, descriptor.mux_chain(mode));

        match mode {
            PinMode::Pwm | PinMode::Servo => self.enable_pwm(binding, pin),
            PinMode::Analog => {
                if let Some(direction) = profile.analog_direction {
                    self.set_direction(binding, pin, direction);
                }
            }
            PinMode::Input => self.set_direction(binding, pin, Direction::In),
            PinMode::Output | PinMode::Stepper => self.set_direction(binding, pin, Direction::Out),
        }

        if let Some(state) = self.state_mut(pin.index) {
            state.mode = Some(mode);
        }
        debug!("Pin {} ({}) mode {:?} -> {}", pin.id, pin.index, previous, mode);
        Ok(())
    }

    /// Drive a digital output. The pin must already be in OUTPUT mode.
    pub fn write_digital(&mut self, binding: &mut dyn IoBinding, pin: &ResolvedPin, level: Level) {
        self.set_direction(binding, pin, Direction::Out);
        let line = pin.descriptor.line;
        log_hw(binding.gpio_write(line, level), "gpio write", line);
        if let Some(state) = self.state_mut(pin.index) {
            state.value = u32::from(level.value());
        }
    }

    /// Sample a digital input.
    ///
    /// A pin driving PWM reports its duty cycle scaled to `0..=255`.
    pub fn read_digital(&mut self, binding: &mut dyn IoBinding, index: u16, line: u16) -> Result<u8, BindingError> {
        let pwm = self
            .state(index)
            .filter(|s| s.is_pwm())
            .and_then(|s| s.pwm)
            .map(|p| p.channel);
        if let Some(channel) = pwm {
            let fraction = binding.pwm_read(channel)?.clamp(0.0, 1.0);
            return Ok((fraction * PWM_MAX_VALUE as f32).round() as u8);
        }
        let value = binding.gpio_read(line)?.value();
        if let Some(state) = self.state_mut(index) {
            state.value = u32::from(value);
        }
        Ok(value)
    }

    /// Sample an ADC channel and apply the profile's scaling.
    pub fn read_analog(
        &mut self,
        binding: &mut dyn IoBinding,
        profile: &PlatformProfile,
        index: u16,
        channel: u8,
    ) -> Result<u16, BindingError> {
        let value = profile.analog_scale.apply(binding.aio_read(channel)?);
        if let Some(state) = self.state_mut(index) {
            state.value = u32::from(value);
        }
        Ok(value)
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn apply_mux(&mut self, binding: &mut dyn IoBinding, chain: &[MuxLine]) {
        for mux in chain {
            self.drive_line(binding, mux.line, mux.level);
        }
    }

    /// First use opens the line as an output; later uses write only on change.
    fn drive_line(&mut self, binding: &mut dyn IoBinding, line: u16, level: Level) {
        match self.lines.get(&line) {
            Some(current) if *current == level => return,
            Some(_) => {
                log_hw(binding.gpio_write(line, level), "mux write", line);
            }
            None => {
                log_hw(binding.gpio_open(line), "mux open", line);
                log_hw(binding.gpio_dir(line, Direction::Out), "mux dir", line);
                log_hw(binding.gpio_write(line, level), "mux write", line);
            }
        }
        trace!("Mux line {} -> {:?}", line, level);
        self.lines.insert(line, level);
    }

    fn set_direction(&mut self, binding: &mut dyn IoBinding, pin: &ResolvedPin, direction: Direction) {
        let line = pin.descriptor.line;
        let Some(state) = self.state_mut(pin.index) else {
            return;
        };
        if !state.gpio_open {
            log_hw(binding.gpio_open(line), "gpio open", line);
            state.gpio_open = true;
        }
        if state.direction != Some(direction) {
            log_hw(binding.gpio_dir(line, direction), "gpio dir", line);
            state.direction = Some(direction);
        }
        if let Some(enable) = pin.descriptor.output_enable {
            let level = match direction {
                Direction::Out => Level::Low,
                Direction::In => Level::High,
            };
            self.drive_line(binding, enable, level);
        }
    }

    fn enable_pwm(&mut self, binding: &mut dyn IoBinding, pin: &ResolvedPin) {
        let Some(channel) = pin.descriptor.pwm_channel else {
            return;
        };
        let Some(state) = self.state_mut(pin.index) else {
            return;
        };
        let pwm = state.pwm.get_or_insert_with(|| {
            log_hw(binding.pwm_open(channel), "pwm open", u16::from(channel));
            PwmChannel::new(channel)
        });
        log_hw(binding.pwm_enable(channel, true), "pwm enable", u16::from(channel));
        pwm.enabled = true;
    }

    fn disable_pwm(&mut self, binding: &mut dyn IoBinding, index: u16) {
        let Some(pwm) = self.state_mut(index).and_then(|s| s.pwm.as_mut()) else {
            return;
        };
        if pwm.enabled {
            log_hw(
                binding.pwm_enable(pwm.channel, false),
                "pwm disable",
                u16::from(pwm.channel),
            );
            pwm.enabled = false;
        }
    }
}

pub(crate) fn invalid_pin(profile: &PlatformProfile, pin: &PinId) -> BoardError {
    BoardError::InvalidPin {
        board: profile.name().to_string(),
        pin: pin.to_string(),
    }
}

/// Hardware writes are fire-and-forget.
pub(crate) fn log_hw(result: Result<(), BindingError>, op: &str, line: u16) {
    if let Err(e) = result {
        warn!("{} on {} failed: {}", op, line, e);
    }
}
