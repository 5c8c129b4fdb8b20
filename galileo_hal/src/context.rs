//! Mutable engine state owned by a `Board`.
//!
//! Everything a global reset discards lives here, so a reset is a plain
//! replacement of this value.

use crate::events::EventBus;
use crate::i2c::I2cManager;
use crate::pins::{PinBank, ServoRange};
use crate::pwm::PwmEngine;
use crate::sampling::Sampler;
use crate::scheduler::Scheduler;
use crate::stepper::Steppers;
use galileo_common::config::BoardConfig;
use galileo_common::platform::PlatformProfile;

#[derive(Debug)]
pub struct EngineContext {
    pub pins: PinBank,
    pub scheduler: Scheduler,
    pub events: EventBus,
    pub sampling: Sampler,
    pub i2c: I2cManager,
    pub steppers: Steppers,
    pub pwm: PwmEngine,
}

impl EngineContext {
    pub fn new(profile: &PlatformProfile, config: &BoardConfig, servo: ServoRange) -> Self {
        Self {
            pins: PinBank::new(profile, servo),
            scheduler: Scheduler::new(),
            events: EventBus::new(),
            sampling: Sampler::new(config.board.sampling_interval_ms),
            i2c: I2cManager::new(profile.i2c_bus, &config.i2c),
            steppers: Steppers::new(),
            pwm: PwmEngine::new(),
        }
    }
}
