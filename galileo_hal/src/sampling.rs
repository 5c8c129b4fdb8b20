//! Sampling and reporting loop.
//!
//! One repeating `Task::Sample` timer reads every registration in the
//! order it was registered and raises a `DigitalRead` or `AnalogRead`
//! event per value. The timer handle doubles as the "reading" flag.

use crate::events::{BoardEvent, EventBus, ListenerId};
use crate::pins::PinBank;
use crate::scheduler::{Scheduler, Task, TimerId};
use galileo_common::binding::IoBinding;
use galileo_common::consts::{DEFAULT_SAMPLING_INTERVAL_MS, MAX_SAMPLING_INTERVAL_MS};
use galileo_common::io::PinId;
use galileo_common::platform::PlatformProfile;
use std::time::Duration;
use tracing::{debug, warn};

/// Physical source a registration reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKey {
    Gpio(u16),
    Adc(u8),
}

/// An active report.
#[derive(Debug)]
pub struct Registration {
    pub key: ReportKey,
    /// Pin table index.
    pub index: u16,
    /// Pin as the host named it; carried in digital events.
    pub pin: PinId,
    /// Listener delivering values to the registering caller.
    pub listener: Option<ListenerId>,
}

#[derive(Debug)]
pub struct Sampler {
    registrations: Vec<Registration>,
    interval: Duration,
    timer: Option<TimerId>,
}

impl Sampler {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            registrations: Vec::new(),
            interval: Duration::from_millis(u64::from(interval_ms.min(MAX_SAMPLING_INTERVAL_MS))),
            timer: None,
        }
    }

    /// Add a registration or replace the one on the same physical pin in
    /// place, whichever source it read from.
    /// Returns the listener of the replaced registration.
    pub fn register(&mut self, registration: Registration) -> Option<ListenerId> {
        match self
            .registrations
            .iter_mut()
            .find(|r| r.index == registration.index || r.key == registration.key)
        {
            Some(existing) => std::mem::replace(existing, registration).listener,
            None => {
                self.registrations.push(registration);
                None
            }
        }
    }

    /// Start the loop if it is not running.
    pub fn start(&mut self, scheduler: &mut Scheduler) {
        if self.timer.is_none() {
            self.timer = Some(scheduler.schedule_repeating(self.interval, Task::Sample));
            debug!("Sampling loop started, interval {:?}", self.interval);
        }
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
            debug!("Sampling loop stopped");
        }
    }

    /// Clamp to `0..=65535` ms and restart a running loop.
    pub fn set_interval(&mut self, scheduler: &mut Scheduler, ms: u32) {
        self.interval = Duration::from_millis(u64::from(ms.min(MAX_SAMPLING_INTERVAL_MS)));
        if self.timer.is_some() {
            self.stop(scheduler);
            self.start(scheduler);
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_reading(&self) -> bool {
        self.timer.is_some()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// One pass over every registration.
    pub fn tick(
        &self,
        binding: &mut dyn IoBinding,
        profile: &PlatformProfile,
        pins: &mut PinBank,
        events: &mut EventBus,
    ) {
        for reg in &self.registrations {
            match reg.key {
                ReportKey::Gpio(line) => match pins.read_digital(binding, reg.index, line) {
                    Ok(value) => events.emit(BoardEvent::DigitalRead {
                        pin: reg.pin.clone(),
                        value,
                    }),
                    Err(e) => warn!("Digital read of pin {} failed: {}", reg.pin, e),
                },
                ReportKey::Adc(channel) => {
                    match pins.read_analog(binding, profile, reg.index, channel) {
                        Ok(value) => events.emit(BoardEvent::AnalogRead { channel, value }),
                        Err(e) => warn!("Analog read of channel {} failed: {}", channel, e),
                    }
                }
            }
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLING_INTERVAL_MS)
    }
}
