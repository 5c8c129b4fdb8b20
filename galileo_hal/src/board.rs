//! Host-facing board facade.
//!
//! `Board` owns the binding, the resolved platform profile and the engine
//! context. All requests run on the caller's thread; scheduled work runs
//! when the owner calls [`Board::poll`], [`Board::advance`] or
//! [`Board::run`].

use crate::binding_registry::BindingRegistry;
use crate::context::EngineContext;
use crate::events::{
    BoardEvent, ListenerId, analog_event, digital_event, i2c_event, stepper_event,
};
use crate::i2c::{I2cOptions, I2cWrite};
use crate::pins::{PinState, ResolvedPin, ServoRange, invalid_pin};
use crate::pwm::{analog_duty_ns, servo_pulse_ns};
use crate::sampling::{Registration, ReportKey};
use crate::scheduler::Task;
use crate::stepper::{StepDirection, StepperWiring};
use galileo_common::binding::IoBinding;
use galileo_common::config::BoardConfig;
use galileo_common::consts::{PWM_MAX_VALUE, SERVO_MAX_ANGLE};
use galileo_common::error::BoardError;
use galileo_common::io::{Level, PinId, PinMode};
use galileo_common::platform::{PlatformProfile, PlatformQuery};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest sleep of the wall-clock loop between passes.
const MAX_IDLE: Duration = Duration::from_millis(1);

/// Wall-clock loop statistics.
#[derive(Debug, Default)]
struct LoopStats {
    passes: u64,
    tasks: u64,
    max_pass_us: u64,
}

/// A connected board.
pub struct Board {
    binding: Box<dyn IoBinding>,
    profile: PlatformProfile,
    config: BoardConfig,
    servo_default: ServoRange,
    ctx: EngineContext,
    running: Arc<AtomicBool>,
    stats: LoopStats,
}

impl Board {
    /// Connect through `binding`.
    ///
    /// Resolves the platform (unless the configuration forces one), opens
    /// every pin and queues the `Connect` and `Ready` events.
    ///
    /// # Errors
    /// Returns `BoardError::Config` if the configuration is invalid.
    pub fn open(mut binding: Box<dyn IoBinding>, config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let servo_default = ServoRange::new(config.servo.min_us, config.servo.max_us)?;

        let profile = match config.board.platform {
            Some(platform) => {
                info!("Platform forced by configuration: {}", platform);
                PlatformProfile::for_platform(platform, binding.default_i2c_bus())
            }
            None => PlatformProfile::resolve(&PlatformQuery::from_binding(binding.as_ref())),
        };
        info!(
            "Connected to {} via binding '{}' v{} ({}), {} pins, I2C bus {}",
            profile.name(),
            binding.name(),
            binding.version(),
            binding.platform_name(),
            profile.pin_count(),
            profile.i2c_bus
        );

        let mut ctx = EngineContext::new(&profile, &config, servo_default);
        ctx.events.emit(BoardEvent::Connect);
        ctx.pins.init_hardware(binding.as_mut(), &profile);
        ctx.events.emit(BoardEvent::Ready);

        Ok(Self {
            binding,
            profile,
            config,
            servo_default,
            ctx,
            running: Arc::new(AtomicBool::new(false)),
            stats: LoopStats::default(),
        })
    }

    /// Create the configured binding from `registry` and connect.
    ///
    /// # Errors
    /// `BoardError::Binding` if the binding is unknown or fails to start.
    pub fn from_registry(registry: &BindingRegistry, config: BoardConfig) -> Result<Self, BoardError> {
        let binding = registry.create_binding(&config.board.binding, &config)?;
        Self::open(binding, config)
    }

    // ─── Pins ───────────────────────────────────────────────────────

    /// Set a pin's mode.
    ///
    /// # Errors
    /// `InvalidPin` for absent pins, `UnsupportedMode` if the pin does not
    /// support `mode`.
    pub fn pin_mode(&mut self, pin: impl Into<PinId>, mode: PinMode) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), mode == PinMode::Analog)?;
        self.ctx
            .pins
            .set_mode(self.binding.as_mut(), &self.profile, &pin, mode)
    }

    /// Host pin number of `pin`.
    ///
    /// # Errors
    /// `InvalidPin` if the name is not known on this board.
    pub fn normalize(&self, pin: impl Into<PinId>) -> Result<u16, BoardError> {
        let pin = pin.into();
        self.profile
            .normalize(&pin)
            .ok_or_else(|| invalid_pin(&self.profile, &pin))
    }

    /// Drive a pin high (nonzero) or low, switching it to OUTPUT if needed.
    pub fn digital_write(&mut self, pin: impl Into<PinId>, value: u8) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), false)?;
        self.coerce(&pin, PinMode::Output)?;
        self.ctx.pins.write_digital(
            self.binding.as_mut(),
            &pin,
            Level::from_value(u32::from(value)),
        );
        Ok(())
    }

    /// Report a pin's digital value to `handler` every sampling tick.
    ///
    /// Replaces an earlier registration on the same line.
    pub fn digital_read(
        &mut self,
        pin: impl Into<PinId>,
        mut handler: impl FnMut(u8) + 'static,
    ) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), false)?;
        self.coerce(&pin, PinMode::Input)?;
        let listener = self.ctx.events.on(digital_event(&pin.id), move |event| {
            if let BoardEvent::DigitalRead { value, .. } = event {
                handler(*value);
            }
        });
        self.register(ReportKey::Gpio(pin.descriptor.line), pin, listener);
        Ok(())
    }

    /// Report an ADC channel's value to `handler` every sampling tick.
    ///
    /// Numbers below the channel count name channels (`3` is `A3`).
    pub fn analog_read(
        &mut self,
        pin: impl Into<PinId>,
        mut handler: impl FnMut(u16) + 'static,
    ) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), true)?;
        self.coerce(&pin, PinMode::Analog)?;
        let channel = pin
            .descriptor
            .analog_channel
            .ok_or_else(|| self.unsupported(&pin, PinMode::Analog))?;
        let listener = self.ctx.events.on(analog_event(channel), move |event| {
            if let BoardEvent::AnalogRead { value, .. } = event {
                handler(*value);
            }
        });
        self.register(ReportKey::Adc(channel), pin, listener);
        Ok(())
    }

    /// Output a duty cycle of `value / 255`, switching the pin to PWM if needed.
    pub fn analog_write(&mut self, pin: impl Into<PinId>, value: u32) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), false)?;
        self.coerce(&pin, PinMode::Pwm)?;
        let duty = analog_duty_ns(value, &self.profile.pwm);
        self.write_pwm(&pin, PinMode::Pwm, value.min(PWM_MAX_VALUE), duty);
        Ok(())
    }

    /// Set the servo pulse range of a pin and switch it to SERVO.
    ///
    /// # Errors
    /// `InvalidServoRange` unless `min_us < max_us`.
    pub fn servo_config(
        &mut self,
        pin: impl Into<PinId>,
        min_us: u32,
        max_us: u32,
    ) -> Result<(), BoardError> {
        let range = ServoRange::new(min_us, max_us)?;
        let pin = self.resolve(&pin.into(), false)?;
        self.coerce(&pin, PinMode::Servo)?;
        if let Some(state) = self.ctx.pins.state_mut(pin.index) {
            state.servo = range;
        }
        debug!("Pin {} servo range {}..{} us", pin.id, min_us, max_us);
        Ok(())
    }

    /// Move a servo to `angle` degrees (clamped to 180).
    pub fn servo_write(&mut self, pin: impl Into<PinId>, angle: u32) -> Result<(), BoardError> {
        let pin = self.resolve(&pin.into(), false)?;
        self.coerce(&pin, PinMode::Servo)?;
        let range = self
            .ctx
            .pins
            .state(pin.index)
            .map_or(self.servo_default, |s| s.servo);
        let duty = servo_pulse_ns(angle, range, &self.profile.pwm);
        self.write_pwm(&pin, PinMode::Servo, angle.min(SERVO_MAX_ANGLE), duty);
        Ok(())
    }

    // ─── I2C ────────────────────────────────────────────────────────

    /// Apply I2C options and open the bus.
    ///
    /// # Errors
    /// `NotImplemented` if the binding has no I2C support.
    pub fn i2c_config(&mut self, options: impl Into<I2cOptions>) -> Result<(), BoardError> {
        self.ctx.i2c.configure(options.into());
        self.ctx.i2c.ensure_open(self.binding.as_mut())
    }

    /// Write raw bytes or a `(register, value)` pair to a device.
    pub fn i2c_write(&mut self, address: u8, request: impl Into<I2cWrite>) -> Result<(), BoardError> {
        self.ctx
            .i2c
            .write(self.binding.as_mut(), address, request.into())
    }

    pub fn i2c_write_reg(&mut self, address: u8, register: u8, value: u8) -> Result<(), BoardError> {
        self.i2c_write(address, (register, value))
    }

    /// Read `length` bytes every I2C delay and pass them to `handler`.
    /// Returns the read request id.
    pub fn i2c_read(
        &mut self,
        address: u8,
        register: Option<u8>,
        length: usize,
        handler: impl FnMut(&[u8]) + 'static,
    ) -> Result<u32, BoardError> {
        let id = self.request_i2c_read(address, register, length, true)?;
        let listener = self
            .ctx
            .events
            .on(i2c_event(address, register), i2c_handler(handler));
        self.ctx.i2c.attach_listener(id, listener);
        Ok(id)
    }

    /// Read `length` bytes once, after the I2C delay.
    pub fn i2c_read_once(
        &mut self,
        address: u8,
        register: Option<u8>,
        length: usize,
        handler: impl FnMut(&[u8]) + 'static,
    ) -> Result<u32, BoardError> {
        let id = self.request_i2c_read(address, register, length, false)?;
        self.ctx
            .events
            .once(i2c_event(address, register), i2c_handler(handler));
        Ok(id)
    }

    /// Stop a continuous read started with [`Board::i2c_read`] and drop
    /// its handler.
    pub fn i2c_stop_read(&mut self, id: u32) -> bool {
        self.ctx
            .i2c
            .cancel_read(&mut self.ctx.scheduler, &mut self.ctx.events, id)
    }

    pub fn send_i2c_config(&mut self, options: impl Into<I2cOptions>) -> Result<(), BoardError> {
        self.i2c_config(options)
    }

    pub fn send_i2c_write_request(
        &mut self,
        address: u8,
        request: impl Into<I2cWrite>,
    ) -> Result<(), BoardError> {
        self.i2c_write(address, request)
    }

    pub fn send_i2c_read_request(
        &mut self,
        address: u8,
        register: Option<u8>,
        length: usize,
        handler: impl FnMut(&[u8]) + 'static,
    ) -> Result<u32, BoardError> {
        self.i2c_read_once(address, register, length, handler)
    }

    // ─── Steppers ───────────────────────────────────────────────────

    /// Bind a stepper to its pins and switch them to OUTPUT.
    pub fn stepper_config(
        &mut self,
        index: u8,
        wiring: StepperWiring,
        steps_per_rev: u32,
    ) -> Result<(), BoardError> {
        let mut pins = Vec::new();
        for id in wiring.pins() {
            let pin = self.resolve(id, false)?;
            self.ctx
                .pins
                .set_mode(self.binding.as_mut(), &self.profile, &pin, PinMode::Output)?;
            pins.push(pin);
        }
        self.ctx.steppers.configure(
            &mut self.ctx.scheduler,
            &mut self.ctx.events,
            index,
            wiring,
            steps_per_rev,
            pins,
        );
        Ok(())
    }

    /// Move `steps` steps at `rpm`; `callback` runs once they are done.
    ///
    /// A move still in progress is abandoned and its callback never runs.
    ///
    /// # Errors
    /// `UnknownStepper` if `index` was not configured.
    pub fn stepper_step(
        &mut self,
        index: u8,
        direction: StepDirection,
        steps: u32,
        rpm: f64,
        callback: impl FnOnce() + 'static,
    ) -> Result<(), BoardError> {
        self.ctx.steppers.start(
            &mut self.ctx.scheduler,
            &mut self.ctx.events,
            index,
            direction,
            steps,
            rpm,
        )?;
        let mut callback = Some(callback);
        let listener = self.ctx.events.once(stepper_event(index), move |_| {
            if let Some(cb) = callback.take() {
                cb();
            }
        });
        self.ctx.steppers.attach_completion(index, listener);
        Ok(())
    }

    // ─── Sampling ───────────────────────────────────────────────────

    /// Set the sampling period (clamped to 65535 ms) and restart the loop.
    pub fn set_sampling_interval(&mut self, ms: u32) {
        self.ctx
            .sampling
            .set_interval(&mut self.ctx.scheduler, ms);
    }

    pub fn sampling_interval(&self) -> Duration {
        self.ctx.sampling.interval()
    }

    /// The sampling loop is running.
    pub fn is_reading(&self) -> bool {
        self.ctx.sampling.is_reading()
    }

    // ─── Events ─────────────────────────────────────────────────────

    pub fn on(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&BoardEvent) + 'static,
    ) -> ListenerId {
        self.ctx.events.on(name, handler)
    }

    pub fn once(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&BoardEvent) + 'static,
    ) -> ListenerId {
        self.ctx.events.once(name, handler)
    }

    pub fn on_any(&mut self, handler: impl FnMut(&BoardEvent) + 'static) -> ListenerId {
        self.ctx.events.on_any(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.ctx.events.off(id)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Drop every registration, timer, listener and pin state.
    ///
    /// The virtual clock keeps its current time.
    pub fn reset(&mut self) {
        let now = self.ctx.scheduler.now();
        self.ctx = EngineContext::new(&self.profile, &self.config, self.servo_default);
        self.ctx.scheduler.advance_to(now);
        info!("Board state reset");
    }

    /// Run everything due now and deliver queued events.
    /// Returns the number of scheduled tasks run.
    pub fn poll(&mut self) -> usize {
        let now = self.ctx.scheduler.now();
        self.run_until(now)
    }

    /// Move virtual time forward by `dt`, running every task due on the way.
    pub fn advance(&mut self, dt: Duration) -> usize {
        let until = self.ctx.scheduler.now() + dt;
        self.run_until(until)
    }

    /// Drive the scheduler from the wall clock until the running flag clears.
    pub fn run(&mut self) -> Result<(), BoardError> {
        info!("Starting board loop on {}", self.profile.name());
        self.running.store(true, Ordering::SeqCst);

        let started = Instant::now();
        let base = self.ctx.scheduler.now();

        while self.running.load(Ordering::SeqCst) {
            let pass_start = Instant::now();
            let tasks = self.run_until(base + started.elapsed());

            let pass_us = pass_start.elapsed().as_micros() as u64;
            self.stats.passes += 1;
            self.stats.tasks += tasks as u64;
            self.stats.max_pass_us = self.stats.max_pass_us.max(pass_us);

            if self.stats.passes % 1000 == 0 {
                debug!(
                    "Board loop: {} passes, {} tasks, max pass {}us",
                    self.stats.passes, self.stats.tasks, self.stats.max_pass_us
                );
            }

            let idle = self
                .ctx
                .scheduler
                .next_due()
                .map_or(MAX_IDLE, |due| due.saturating_sub(base + started.elapsed()))
                .min(MAX_IDLE);
            if !idle.is_zero() {
                std::thread::sleep(idle);
            }
        }

        info!(
            "Board loop stopped after {} passes ({} tasks)",
            self.stats.passes, self.stats.tasks
        );
        Ok(())
    }

    /// Flag that keeps [`Board::run`] going; clear it to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop the loop and release the binding.
    pub fn shutdown(&mut self) -> Result<(), BoardError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);
        self.ctx.sampling.stop(&mut self.ctx.scheduler);
        self.binding.shutdown()?;
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn aref(&self) -> Option<f32> {
        self.profile.aref
    }

    pub fn vref(&self) -> f32 {
        self.profile.vref
    }

    pub fn binding_name(&self) -> &'static str {
        self.binding.name()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.ctx.scheduler.now()
    }

    /// Runtime state of a pin, if present.
    pub fn pin_state(&self, pin: impl Into<PinId>) -> Option<&PinState> {
        let index = self.profile.index_of(&pin.into())?;
        self.ctx.pins.state(index)
    }

    /// Duty waiting on a PWM settle timer.
    pub fn pending_duty(&self, pin: impl Into<PinId>) -> Option<u32> {
        let index = self.profile.index_of(&pin.into())?;
        self.ctx.pwm.pending_duty(index)
    }

    // ─── Not implemented ────────────────────────────────────────────

    pub fn pulse_in(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("pulse_in"))
    }

    pub fn pulse_out(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("pulse_out"))
    }

    pub fn query_pin_state(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("query_pin_state"))
    }

    pub fn send_one_wire_config(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_config"))
    }

    pub fn send_one_wire_search(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_search"))
    }

    pub fn send_one_wire_alarms_search(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_alarms_search"))
    }

    pub fn send_one_wire_read(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_read"))
    }

    pub fn send_one_wire_reset(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_reset"))
    }

    pub fn send_one_wire_write(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_write"))
    }

    pub fn send_one_wire_delay(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_delay"))
    }

    pub fn send_one_wire_write_and_read(&mut self) -> Result<(), BoardError> {
        Err(BoardError::NotImplemented("send_one_wire_write_and_read"))
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn resolve(&self, pin: &PinId, analog: bool) -> Result<ResolvedPin, BoardError> {
        if analog {
            if let PinId::Number(n) = pin {
                let descriptor = self
                    .profile
                    .analog_index(*n)
                    .and_then(|index| self.profile.descriptor(index).map(|d| (index, d)));
                if let Some((index, descriptor)) = descriptor {
                    return Ok(ResolvedPin {
                        id: pin.clone(),
                        index,
                        descriptor,
                    });
                }
            }
        }
        self.ctx.pins.resolve(&self.profile, pin)
    }

    /// Switch `pin` to `mode` unless it is already there.
    fn coerce(&mut self, pin: &ResolvedPin, mode: PinMode) -> Result<(), BoardError> {
        if self.ctx.pins.state(pin.index).and_then(|s| s.mode) == Some(mode) {
            return Ok(());
        }
        self.ctx
            .pins
            .set_mode(self.binding.as_mut(), &self.profile, pin, mode)
    }

    fn unsupported(&self, pin: &ResolvedPin, mode: PinMode) -> BoardError {
        BoardError::UnsupportedMode {
            board: self.profile.name().to_string(),
            pin: pin.id.to_string(),
            mode,
        }
    }

    fn register(&mut self, key: ReportKey, pin: ResolvedPin, listener: ListenerId) {
        if let Some(state) = self.ctx.pins.state_mut(pin.index) {
            state.report = true;
        }
        let replaced = self.ctx.sampling.register(Registration {
            key,
            index: pin.index,
            pin: pin.id,
            listener: Some(listener),
        });
        if let Some(old) = replaced {
            self.ctx.events.off(old);
        }
        self.ctx.sampling.start(&mut self.ctx.scheduler);
    }

    fn write_pwm(&mut self, pin: &ResolvedPin, mode: PinMode, value: u32, duty_ns: u32) {
        let Some(state) = self.ctx.pins.state_mut(pin.index) else {
            warn!("Pin {} has no state", pin.id);
            return;
        };
        state.value = value;
        self.ctx.pwm.write(
            self.binding.as_mut(),
            &mut self.ctx.scheduler,
            &self.profile.pwm,
            state,
            mode,
            duty_ns,
        );
    }

    fn request_i2c_read(
        &mut self,
        address: u8,
        register: Option<u8>,
        length: usize,
        continuous: bool,
    ) -> Result<u32, BoardError> {
        self.ctx.i2c.request_read(
            self.binding.as_mut(),
            &mut self.ctx.scheduler,
            address,
            register,
            length,
            continuous,
        )
    }

    fn run_until(&mut self, until: Duration) -> usize {
        let mut tasks = 0;
        while let Some((_, task)) = self.ctx.scheduler.pop_due(until) {
            self.handle(task);
            self.ctx.events.dispatch();
            tasks += 1;
        }
        self.ctx.scheduler.advance_to(until);
        self.ctx.events.dispatch();
        tasks
    }

    fn handle(&mut self, task: Task) {
        let binding = self.binding.as_mut();
        let ctx = &mut self.ctx;
        match task {
            Task::Sample => ctx
                .sampling
                .tick(binding, &self.profile, &mut ctx.pins, &mut ctx.events),
            Task::I2cRead(id) => ctx.i2c.perform_read(binding, &mut ctx.events, id),
            Task::PwmSettle(index) => {
                if let Some(state) = ctx.pins.state_mut(index) {
                    ctx.pwm.settle(binding, state);
                }
            }
            Task::Stepper(index) => ctx.steppers.tick(
                binding,
                &mut ctx.pins,
                &mut ctx.scheduler,
                &mut ctx.events,
                index,
            ),
        }
    }
}

fn i2c_handler(mut handler: impl FnMut(&[u8]) + 'static) -> impl FnMut(&BoardEvent) + 'static {
    move |event| {
        if let BoardEvent::I2cReply { data, .. } = event {
            handler(data);
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("platform", &self.profile.platform)
            .field("binding", &self.binding.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}
