//! Open-loop stepper sequencing.
//!
//! Runs at constant speed. ACCEL and DECEL are part of the state set but
//! no ramp drives them yet.

use crate::events::{BoardEvent, EventBus, ListenerId};
use crate::pins::{PinBank, ResolvedPin};
use crate::scheduler::{Scheduler, Task, TimerId};
use galileo_common::binding::IoBinding;
use galileo_common::consts::{MICROS_PER_MINUTE, STEPPER_PULSE_US};
use galileo_common::error::BoardError;
use galileo_common::io::{Level, PinId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Pin assignment of a stepper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepperWiring {
    /// Step/direction driver board.
    Driver { step: PinId, direction: PinId },
    TwoWire { motor1: PinId, motor2: PinId },
    FourWire {
        motor1: PinId,
        motor2: PinId,
        motor3: PinId,
        motor4: PinId,
    },
}

impl StepperWiring {
    /// Bound pins, in the order the commutation tables index them.
    pub fn pins(&self) -> Vec<&PinId> {
        match self {
            Self::Driver { step, direction } => vec![step, direction],
            Self::TwoWire { motor1, motor2 } => vec![motor1, motor2],
            Self::FourWire {
                motor1,
                motor2,
                motor3,
                motor4,
            } => vec![motor1, motor2, motor3, motor4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepDirection {
    #[default]
    Ccw,
    Cw,
}

impl From<u8> for StepDirection {
    fn from(v: u8) -> Self {
        if v == 0 { Self::Ccw } else { Self::Cw }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stop,
    Accel,
    Run,
    Decel,
}

const TWO_WIRE: [[Level; 2]; 4] = [
    [Level::Low, Level::High],
    [Level::High, Level::High],
    [Level::High, Level::Low],
    [Level::Low, Level::Low],
];

const FOUR_WIRE: [[Level; 4]; 4] = [
    [Level::High, Level::Low, Level::High, Level::Low],
    [Level::Low, Level::High, Level::High, Level::Low],
    [Level::Low, Level::High, Level::Low, Level::High],
    [Level::High, Level::Low, Level::Low, Level::High],
];

/// Inter-step delay for a speed in RPM. Speeds below 1 RPM run at 1 RPM.
pub fn step_delay(rpm: f64, steps_per_rev: u32) -> Duration {
    let micros = MICROS_PER_MINUTE / (rpm.max(1.0) * f64::from(steps_per_rev.max(1)));
    Duration::from_micros(micros.round() as u64)
}

#[derive(Debug)]
pub struct StepperState {
    pub wiring: StepperWiring,
    pub steps_per_rev: u32,
    pub direction: StepDirection,
    pub delay: Duration,
    /// Position within one revolution.
    pub step_number: u32,
    pub remaining: u32,
    pub run_state: RunState,
    pins: Vec<ResolvedPin>,
    last_step: Duration,
    timer: Option<TimerId>,
    /// Completion listener of the move in progress.
    completion: Option<ListenerId>,
}

impl StepperState {
    /// Cancel the move in progress along with its completion listener.
    fn abandon(&mut self, scheduler: &mut Scheduler, events: &mut EventBus) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        if let Some(listener) = self.completion.take() {
            events.off(listener);
        }
    }

    fn advance(&mut self) {
        self.step_number = match self.direction {
            StepDirection::Cw => (self.step_number + 1) % self.steps_per_rev.max(1),
            StepDirection::Ccw if self.step_number == 0 => self.steps_per_rev.max(1) - 1,
            StepDirection::Ccw => self.step_number - 1,
        };
    }

    fn drive(&self, binding: &mut dyn IoBinding, pins: &mut PinBank) {
        let phase = (self.step_number % 4) as usize;
        match self.wiring {
            StepperWiring::Driver { .. } => {
                let (step, dir) = (&self.pins[0], &self.pins[1]);
                let level = Level::from(self.direction == StepDirection::Cw);
                pins.write_digital(binding, dir, level);
                pins.write_digital(binding, step, Level::High);
                pulse_guard();
                pins.write_digital(binding, step, Level::Low);
            }
            StepperWiring::TwoWire { .. } => {
                for (pin, level) in self.pins.iter().zip(TWO_WIRE[phase]) {
                    pins.write_digital(binding, pin, level);
                }
            }
            StepperWiring::FourWire { .. } => {
                for (pin, level) in self.pins.iter().zip(FOUR_WIRE[phase]) {
                    pins.write_digital(binding, pin, level);
                }
            }
        }
    }
}

/// Busy-wait for the driver's minimum pulse width.
fn pulse_guard() {
    let start = Instant::now();
    let width = Duration::from_micros(STEPPER_PULSE_US);
    while start.elapsed() < width {
        std::hint::spin_loop();
    }
}

/// Configured steppers by host index.
#[derive(Debug, Default)]
pub struct Steppers {
    steppers: HashMap<u8, StepperState>,
}

impl Steppers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stepper. `pins` must follow `wiring.pins()` order and be
    /// in OUTPUT mode already. Replaces any stepper on the same index.
    pub fn configure(
        &mut self,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
        index: u8,
        wiring: StepperWiring,
        steps_per_rev: u32,
        pins: Vec<ResolvedPin>,
    ) {
        if let Some(mut old) = self.steppers.remove(&index) {
            old.abandon(scheduler, events);
        }
        debug!("Stepper {} configured: {:?}, {} steps/rev", index, wiring, steps_per_rev);
        self.steppers.insert(
            index,
            StepperState {
                wiring,
                steps_per_rev,
                direction: StepDirection::default(),
                delay: Duration::ZERO,
                step_number: 0,
                remaining: 0,
                run_state: RunState::Stop,
                pins,
                last_step: scheduler.now(),
                timer: None,
                completion: None,
            },
        );
    }

    /// Begin moving `steps` steps. Zero steps completes immediately.
    ///
    /// # Errors
    /// `BoardError::UnknownStepper` if `index` was never configured.
    pub fn start(
        &mut self,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
        index: u8,
        direction: StepDirection,
        steps: u32,
        rpm: f64,
    ) -> Result<(), BoardError> {
        let state = self
            .steppers
            .get_mut(&index)
            .ok_or(BoardError::UnknownStepper(index))?;
        state.abandon(scheduler, events);
        state.direction = direction;
        state.delay = step_delay(rpm, state.steps_per_rev);
        state.remaining = steps;
        state.last_step = scheduler.now();

        if steps == 0 {
            state.run_state = RunState::Stop;
            events.emit(BoardEvent::StepperComplete { index });
            return Ok(());
        }
        state.run_state = RunState::Run;
        state.timer = Some(scheduler.schedule_repeating(state.delay, Task::Stepper(index)));
        debug!(
            "Stepper {}: {} steps {:?} every {:?}",
            index, steps, direction, state.delay
        );
        Ok(())
    }

    /// Drive one step if the delay has elapsed since the last one.
    pub fn tick(
        &mut self,
        binding: &mut dyn IoBinding,
        pins: &mut PinBank,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
        index: u8,
    ) {
        let Some(state) = self.steppers.get_mut(&index) else {
            return;
        };
        let now = scheduler.now();
        if state.remaining == 0 || now.saturating_sub(state.last_step) < state.delay {
            return;
        }

        state.advance();
        state.drive(binding, pins);
        state.remaining -= 1;
        state.last_step = now;
        trace!("Stepper {} at {}, {} left", index, state.step_number, state.remaining);

        if state.remaining == 0 {
            state.run_state = RunState::Stop;
            if let Some(timer) = state.timer.take() {
                scheduler.cancel(timer);
            }
            events.emit(BoardEvent::StepperComplete { index });
        }
    }

    /// Bind the completion listener of the move just started on `index`.
    pub fn attach_completion(&mut self, index: u8, listener: ListenerId) {
        if let Some(state) = self.steppers.get_mut(&index) {
            state.completion = Some(listener);
        }
    }

    pub fn get(&self, index: u8) -> Option<&StepperState> {
        self.steppers.get(&index)
    }
}
