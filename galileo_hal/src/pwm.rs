//! PWM and servo duty computation and period sequencing.
//!
//! A write whose period differs from the last period written defers its
//! duty write by the platform's settle time. Further writes during that
//! window only replace the pending duty.

use crate::pins::{PinState, ServoRange, log_hw};
use crate::scheduler::{Scheduler, Task, TimerId};
use galileo_common::binding::IoBinding;
use galileo_common::consts::{PWM_MAX_VALUE, SERVO_MAX_ANGLE};
use galileo_common::io::PinMode;
use galileo_common::platform::PwmTiming;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Linear map of `value` in `0..=in_max` onto `out_min..=out_max`.
#[inline]
pub fn scale(value: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + value / in_max * (out_max - out_min)
}

/// Duty in nanoseconds for an `analog_write` value in `0..=255`.
pub fn analog_duty_ns(value: u32, timing: &PwmTiming) -> u32 {
    let period = timing.pwm_period_ns;
    let ns = scale(
        f64::from(value.min(PWM_MAX_VALUE)),
        f64::from(PWM_MAX_VALUE),
        0.0,
        f64::from(period),
    );
    clamp_to_period(ns, period, timing.guard_ns)
}

/// Pulse width in nanoseconds for a servo angle in `0..=180`.
pub fn servo_pulse_ns(angle: u32, range: ServoRange, timing: &PwmTiming) -> u32 {
    let ns = scale(
        f64::from(angle.min(SERVO_MAX_ANGLE)),
        f64::from(SERVO_MAX_ANGLE),
        f64::from(range.min_us) * 1000.0,
        f64::from(range.max_us) * 1000.0,
    );
    clamp_to_period(ns, timing.servo_period_ns, timing.guard_ns)
}

fn clamp_to_period(ns: f64, period: u32, guard: u32) -> u32 {
    ns.clamp(0.0, f64::from(period.saturating_sub(guard))).round() as u32
}

#[derive(Debug, Clone, Copy)]
struct PendingDuty {
    duty_ns: u32,
    timer: TimerId,
}

/// Period bookkeeping and deferred duty writes.
#[derive(Debug, Default)]
pub struct PwmEngine {
    /// Last period written on boards with one shared period register.
    shared_period_ns: Option<u32>,
    pending: HashMap<u16, PendingDuty>,
}

impl PwmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output `duty_ns` on the pin's channel using `mode`'s period.
    pub fn write(
        &mut self,
        binding: &mut dyn IoBinding,
        scheduler: &mut Scheduler,
        timing: &PwmTiming,
        state: &mut PinState,
        mode: PinMode,
        duty_ns: u32,
    ) {
        let index = state.index;
        let Some(pwm) = state.pwm.as_mut() else {
            warn!("Pin {} has no PWM channel allocated", index);
            return;
        };
        let channel = pwm.channel;

        if !pwm.enabled {
            log_hw(binding.pwm_enable(channel, true), "pwm enable", u16::from(channel));
            pwm.enabled = true;
        }

        let period = timing.period_ns(mode);
        let last = if timing.shared_period {
            self.shared_period_ns
        } else {
            pwm.period_ns
        };

        if last != Some(period) {
            log_hw(
                binding.pwm_period_ns(channel, period),
                "pwm period",
                u16::from(channel),
            );
            pwm.period_ns = Some(period);
            self.shared_period_ns = Some(period);
            debug!("Pin {} period {} ns, duty deferred", index, period);
            self.defer(scheduler, timing, index, duty_ns);
            return;
        }
        pwm.period_ns = Some(period);

        if let Some(pending) = self.pending.get_mut(&index) {
            pending.duty_ns = duty_ns;
            return;
        }

        log_hw(binding.pwm_duty_ns(channel, duty_ns), "pwm duty", u16::from(channel));
        pwm.duty_ns = Some(duty_ns);
    }

    /// Apply the deferred duty of `state`'s pin, if any.
    pub fn settle(&mut self, binding: &mut dyn IoBinding, state: &mut PinState) {
        let Some(pending) = self.pending.remove(&state.index) else {
            return;
        };
        let Some(pwm) = state.pwm.as_mut() else {
            return;
        };
        log_hw(
            binding.pwm_duty_ns(pwm.channel, pending.duty_ns),
            "pwm duty",
            u16::from(pwm.channel),
        );
        pwm.duty_ns = Some(pending.duty_ns);
    }

    /// Duty waiting for the settle timer on pin `index`.
    pub fn pending_duty(&self, index: u16) -> Option<u32> {
        self.pending.get(&index).map(|p| p.duty_ns)
    }

    fn defer(&mut self, scheduler: &mut Scheduler, timing: &PwmTiming, index: u16, duty_ns: u32) {
        match self.pending.get_mut(&index) {
            Some(pending) => {
                // Restart the wait: the period just changed again.
                scheduler.cancel(pending.timer);
                pending.timer = scheduler.schedule_once(timing.settle, Task::PwmSettle(index));
                pending.duty_ns = duty_ns;
            }
            None => {
                let timer = scheduler.schedule_once(timing.settle, Task::PwmSettle(index));
                self.pending.insert(index, PendingDuty { duty_ns, timer });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_pulse_spans_range() {
        let t = PwmTiming::MRAA;
        let r = ServoRange::default();
        assert_eq!(servo_pulse_ns(0, r, &t), 600_000);
        assert_eq!(servo_pulse_ns(90, r, &t), 1_600_000);
        assert_eq!(servo_pulse_ns(180, r, &t), 2_600_000);
        assert_eq!(servo_pulse_ns(400, r, &t), 2_600_000);
    }

    #[test]
    fn servo_pulse_custom_range() {
        let t = PwmTiming::MRAA;
        let r = ServoRange::new(1000, 2000).unwrap();
        assert_eq!(servo_pulse_ns(0, r, &t), 1_000_000);
        assert_eq!(servo_pulse_ns(90, r, &t), 1_500_000);
        assert_eq!(servo_pulse_ns(180, r, &t), 2_000_000);
    }

    #[test]
    fn servo_pulse_clamped_below_period() {
        let t = PwmTiming::GALILEO_GEN2;
        let r = ServoRange::default();
        // 2.6 ms does not fit a 2.8 ms period with a 600 µs guard.
        assert_eq!(servo_pulse_ns(180, r, &t), 2_200_000);
    }

    #[test]
    fn analog_duty_scales_to_period() {
        let t = PwmTiming::MRAA;
        assert_eq!(analog_duty_ns(0, &t), 0);
        assert_eq!(analog_duty_ns(255, &t), 699_900);
        assert_eq!(analog_duty_ns(1000, &t), 699_900);
        assert_eq!(analog_duty_ns(51, &t), 140_000);
    }
}
