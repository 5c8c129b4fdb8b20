//! Stepper integration tests: coil sequencing, timing and completion.

mod common;

use common::{board, gpio_writes, ms};
use galileo_hal::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn done_flag() -> (Rc<Cell<bool>>, impl FnOnce() + 'static) {
    let done = Rc::new(Cell::new(false));
    let setter = Rc::clone(&done);
    (done, move || setter.set(true))
}

#[test]
fn two_wire_sequence() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.stepper_config(
        0,
        StepperWiring::TwoWire {
            motor1: PinId::from(4u16),
            motor2: PinId::from(7u16),
        },
        200,
    )
    .unwrap();
    assert_eq!(b.pin_state(4).unwrap().mode, Some(PinMode::Output));
    probe.clear_calls();

    let (done, callback) = done_flag();
    b.stepper_step(0, StepDirection::Cw, 3, 60.0, callback).unwrap();

    b.advance(ms(4));
    assert!(gpio_writes(&probe).is_empty());
    b.advance(ms(11));
    assert_eq!(
        gpio_writes(&probe),
        vec![
            (4, Level::High),
            (7, Level::High),
            (4, Level::High),
            (7, Level::Low),
            (4, Level::Low),
            (7, Level::Low),
        ]
    );
    assert!(done.get());

    probe.clear_calls();
    b.advance(ms(50));
    assert!(gpio_writes(&probe).is_empty());
}

#[test]
fn four_wire_drives_every_coil() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.stepper_config(
        1,
        StepperWiring::FourWire {
            motor1: PinId::from(2u16),
            motor2: PinId::from(4u16),
            motor3: PinId::from(7u16),
            motor4: PinId::from(8u16),
        },
        100,
    )
    .unwrap();
    probe.clear_calls();

    b.stepper_step(1, StepDirection::Ccw, 2, 60.0, || {}).unwrap();
    b.advance(ms(20));
    let writes = gpio_writes(&probe);
    assert_eq!(writes.len(), 8);
    let lines: Vec<u16> = writes.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![2, 4, 7, 8, 2, 4, 7, 8]);
}

#[test]
fn driver_pulses_step_after_direction() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.stepper_config(
        2,
        StepperWiring::Driver {
            step: PinId::from(2u16),
            direction: PinId::from(3u16),
        },
        200,
    )
    .unwrap();
    probe.clear_calls();

    b.stepper_step(2, StepDirection::Cw, 1, 60.0, || {}).unwrap();
    b.advance(ms(5));
    assert_eq!(
        gpio_writes(&probe),
        vec![(3, Level::High), (2, Level::High), (2, Level::Low)]
    );

    probe.clear_calls();
    b.stepper_step(2, StepDirection::Ccw, 1, 60.0, || {}).unwrap();
    b.advance(ms(5));
    assert_eq!(gpio_writes(&probe)[0], (3, Level::Low));
}

#[test]
fn zero_steps_completes_on_next_poll() {
    let (mut b, _) = board(Platform::EdisonArduino);
    b.stepper_config(
        0,
        StepperWiring::TwoWire {
            motor1: PinId::from(4u16),
            motor2: PinId::from(7u16),
        },
        200,
    )
    .unwrap();
    let (done, callback) = done_flag();
    b.stepper_step(0, StepDirection::Cw, 0, 60.0, callback).unwrap();
    assert!(!done.get());
    b.poll();
    assert!(done.get());
}

#[test]
fn unconfigured_stepper_is_rejected() {
    let (mut b, _) = board(Platform::EdisonArduino);
    assert_eq!(
        b.stepper_step(5, StepDirection::Cw, 10, 60.0, || {}),
        Err(BoardError::UnknownStepper(5))
    );
}

#[test]
fn stepper_pins_must_exist() {
    let (mut b, _) = board(Platform::EdisonArduino);
    let result = b.stepper_config(
        0,
        StepperWiring::TwoWire {
            motor1: PinId::from(4u16),
            motor2: PinId::from(30u16),
        },
        200,
    );
    assert!(matches!(result, Err(BoardError::InvalidPin { .. })));
}

#[test]
fn completion_event_is_named_by_index() {
    let (mut b, _) = board(Platform::EdisonArduino);
    b.stepper_config(
        3,
        StepperWiring::TwoWire {
            motor1: PinId::from(4u16),
            motor2: PinId::from(7u16),
        },
        200,
    )
    .unwrap();
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    b.on("stepper-done-3", move |_| counter.set(counter.get() + 1));
    b.stepper_step(3, StepDirection::Cw, 2, 60.0, || {}).unwrap();
    b.advance(ms(10));
    assert_eq!(hits.get(), 1);
}

#[test]
fn restarted_move_drops_previous_callback() {
    let (mut b, _) = board(Platform::EdisonArduino);
    b.stepper_config(
        0,
        StepperWiring::TwoWire {
            motor1: PinId::from(4u16),
            motor2: PinId::from(7u16),
        },
        200,
    )
    .unwrap();
    let finished = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&finished);
    let second = Rc::clone(&finished);

    b.stepper_step(0, StepDirection::Cw, 100, 60.0, move || first.borrow_mut().push("first"))
        .unwrap();
    b.advance(ms(10));
    b.stepper_step(0, StepDirection::Ccw, 2, 60.0, move || second.borrow_mut().push("second"))
        .unwrap();
    b.advance(ms(20));

    assert_eq!(*finished.borrow(), vec!["second"]);
}
