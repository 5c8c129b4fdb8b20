//! Shared helpers for board integration tests.

#![allow(dead_code)]

use galileo_hal::bindings::simulation::{HwCall, SimulationBinding, SimulationProbe};
use galileo_hal::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Board on a simulated `platform` with the init calls cleared.
pub fn board(platform: Platform) -> (Board, SimulationProbe) {
    board_with(platform, BoardConfig::default())
}

pub fn board_with(platform: Platform, config: BoardConfig) -> (Board, SimulationProbe) {
    let sim = SimulationBinding::for_platform(platform);
    let probe = sim.probe();
    let board = Board::open(Box::new(sim), config).expect("board opens");
    probe.clear_calls();
    (board, probe)
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Shared sink for handler values.
pub fn sink<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T) + 'static) {
    let values = Rc::new(RefCell::new(Vec::new()));
    let writer = Rc::clone(&values);
    (values, move |v| writer.borrow_mut().push(v))
}

pub fn duties(probe: &SimulationProbe) -> Vec<(u8, u32)> {
    probe
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            HwCall::PwmDuty(ch, ns) => Some((ch, ns)),
            _ => None,
        })
        .collect()
}

pub fn gpio_writes(probe: &SimulationProbe) -> Vec<(u16, Level)> {
    probe
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            HwCall::GpioWrite(line, level) => Some((line, level)),
            _ => None,
        })
        .collect()
}
