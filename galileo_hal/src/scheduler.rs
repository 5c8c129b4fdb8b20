//! Cooperative virtual-time scheduler.
//!
//! Every periodic or deferred activity of the board (sampling ticks, I2C
//! reads, deferred PWM duty writes, stepper ticks) is a timer here. The
//! owner drives time forward with [`Scheduler::pop_due`]; nothing runs
//! concurrently, so a timer never fires during another firing of itself.

use galileo_common::consts::MIN_TIMER_PERIOD_MS;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Work item carried by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// One pass of the sampling loop.
    Sample,
    /// I2C read request by id.
    I2cRead(u32),
    /// Deferred duty write on a pin after a period change.
    PwmSettle(u16),
    /// Step check for a stepper.
    Stepper(u8),
}

/// Handle returned when a timer is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
struct Timer {
    task: Task,
    period: Option<Duration>,
}

/// Ordered timer set over a virtual clock.
#[derive(Debug)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    /// Keyed by (due time, id); ties fire in scheduling order.
    queue: BTreeMap<(Duration, TimerId), Timer>,
    due_by_id: HashMap<TimerId, Duration>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `task` once, `delay` from now. A zero delay fires on the next pass.
    pub fn schedule_once(&mut self, delay: Duration, task: Task) -> TimerId {
        self.insert(self.now + delay, Timer { task, period: None })
    }

    /// Fire `task` every `period`, first after one period.
    ///
    /// Periods shorter than 1 ms are raised to 1 ms.
    pub fn schedule_repeating(&mut self, period: Duration, task: Task) -> TimerId {
        let period = period.max(Duration::from_millis(MIN_TIMER_PERIOD_MS));
        self.insert(
            self.now + period,
            Timer {
                task,
                period: Some(period),
            },
        )
    }

    /// Remove a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id) {
            Some(due) => self.queue.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending timers carrying `task`.
    pub fn count(&self, task: Task) -> usize {
        self.queue.values().filter(|t| t.task == task).count()
    }

    /// Due time of the earliest timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Take the earliest timer due at or before `until` and move the clock
    /// to its due time. Repeating timers are re-armed before they are
    /// returned, so the caller may cancel them while handling the task.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, Task)> {
        let (&(due, id), _) = self.queue.iter().next()?;
        if due > until {
            return None;
        }
        let timer = self.queue.remove(&(due, id))?;
        self.due_by_id.remove(&id);
        self.now = self.now.max(due);

        if let Some(period) = timer.period {
            let next = due + period;
            self.queue.insert((next, id), timer);
            self.due_by_id.insert(id, next);
        }
        Some((id, timer.task))
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }

    fn insert(&mut self, due: Duration, timer: Timer) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((due, id), timer);
        self.due_by_id.insert(id, due);
        id
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(s: &mut Scheduler, until: Duration) -> Vec<Task> {
        let mut fired = Vec::new();
        while let Some((_, task)) = s.pop_due(until) {
            fired.push(task);
        }
        s.advance_to(until);
        fired
    }

    #[test]
    fn one_shot_fires_once() {
        let mut s = Scheduler::new();
        s.schedule_once(ms(5), Task::I2cRead(1));
        assert!(drain(&mut s, ms(4)).is_empty());
        assert_eq!(drain(&mut s, ms(5)), vec![Task::I2cRead(1)]);
        assert!(drain(&mut s, ms(50)).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn zero_delay_fires_on_next_pass() {
        let mut s = Scheduler::new();
        s.schedule_once(Duration::ZERO, Task::PwmSettle(3));
        let now = s.now();
        assert_eq!(drain(&mut s, now), vec![Task::PwmSettle(3)]);
    }

    #[test]
    fn repeating_rearms() {
        let mut s = Scheduler::new();
        s.schedule_repeating(ms(10), Task::Sample);
        assert_eq!(drain(&mut s, ms(35)).len(), 3);
        assert_eq!(s.count(Task::Sample), 1);
        assert_eq!(s.next_due(), Some(ms(40)));
    }

    #[test]
    fn short_periods_are_raised_to_one_ms() {
        let mut s = Scheduler::new();
        s.schedule_repeating(Duration::ZERO, Task::Sample);
        assert_eq!(drain(&mut s, ms(5)).len(), 5);
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut s = Scheduler::new();
        s.schedule_once(ms(1), Task::Stepper(2));
        s.schedule_once(ms(1), Task::Stepper(1));
        assert_eq!(
            drain(&mut s, ms(1)),
            vec![Task::Stepper(2), Task::Stepper(1)]
        );
    }

    #[test]
    fn cancel_repeating_while_handling() {
        let mut s = Scheduler::new();
        let id = s.schedule_repeating(ms(2), Task::Stepper(0));
        let (fired, _) = s.pop_due(ms(2)).unwrap();
        assert_eq!(fired, id);
        assert!(s.is_scheduled(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.pop_due(ms(100)).is_none());
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut s = Scheduler::new();
        s.advance_to(ms(10));
        s.advance_to(ms(3));
        assert_eq!(s.now(), ms(10));
    }
}
