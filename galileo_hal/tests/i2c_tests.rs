//! I2C integration tests against the simulated bus.

mod common;

use common::{board, ms};
use galileo_hal::bindings::simulation::HwCall;
use galileo_hal::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn replies() -> (Rc<RefCell<Vec<Vec<u8>>>>, impl FnMut(&[u8]) + 'static) {
    let data = Rc::new(RefCell::new(Vec::new()));
    let writer = Rc::clone(&data);
    (data, move |bytes: &[u8]| writer.borrow_mut().push(bytes.to_vec()))
}

#[test]
fn config_opens_default_bus() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.i2c_config(I2cOptions::default()).unwrap();
    assert_eq!(probe.calls(), vec![HwCall::I2cOpen(6)]);

    // Already open: no second context.
    b.i2c_config(I2cOptions::default()).unwrap();
    assert_eq!(probe.i2c_handle_count(), 1);
}

#[test]
fn register_and_raw_writes() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.i2c_write(0x40, (0x01u8, 0x80u8)).unwrap();
    b.i2c_write(0x40, [1u8, 2, 3]).unwrap();
    b.i2c_write_reg(0x41, 0x10, 0x20).unwrap();

    assert_eq!(
        probe.calls(),
        vec![
            HwCall::I2cOpen(6),
            HwCall::I2cAddress(0, 0x40),
            HwCall::I2cWriteReg(0x40, 0x01, 0x80),
            HwCall::I2cAddress(0, 0x40),
            HwCall::I2cWrite(0x40, vec![1, 2, 3]),
            HwCall::I2cAddress(0, 0x41),
            HwCall::I2cWriteReg(0x41, 0x10, 0x20),
        ]
    );
}

#[test]
fn empty_write_sends_nothing() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.i2c_write(0x40, Vec::new()).unwrap();
    assert_eq!(probe.count(|c| matches!(c, HwCall::I2cWrite(..))), 0);
    assert_eq!(probe.count(|c| matches!(c, HwCall::I2cAddress(..))), 0);
}

#[test]
fn failed_write_is_not_an_error() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_failing(0x50, true);
    assert!(b.i2c_write(0x50, 0x00u8).is_ok());
}

#[test]
fn read_once_after_delay() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, None, vec![7, 8, 9]);
    let (data, handler) = replies();
    b.i2c_read_once(0x48, None, 3, handler).unwrap();

    b.advance(ms(4));
    assert!(data.borrow().is_empty());
    b.advance(ms(1));
    assert_eq!(*data.borrow(), vec![vec![7, 8, 9]]);

    b.advance(ms(20));
    assert_eq!(data.borrow().len(), 1);
}

#[test]
fn short_read_delivers_partial_data() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, None, vec![7, 8]);
    let (data, handler) = replies();
    b.i2c_read_once(0x48, None, 4, handler).unwrap();
    b.advance(ms(5));
    assert_eq!(*data.borrow(), vec![vec![7, 8]]);
}

#[test]
fn failed_read_delivers_empty_payload() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_failing(0x50, true);
    let (data, handler) = replies();
    b.send_i2c_read_request(0x50, None, 2, handler).unwrap();
    b.advance(ms(5));
    assert_eq!(*data.borrow(), vec![Vec::<u8>::new()]);
}

#[test]
fn continuous_register_read_until_stopped() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, Some(0x10), vec![1, 2]);
    let (data, handler) = replies();
    let id = b.i2c_read(0x48, Some(0x10), 2, handler).unwrap();

    b.advance(ms(15));
    assert_eq!(data.borrow().len(), 3);
    assert!(data.borrow().iter().all(|d| d == &[1, 2]));
    assert_eq!(probe.count(|c| *c == HwCall::I2cReadReg(0x48, 0x10, 2)), 3);

    assert!(b.i2c_stop_read(id));
    assert!(!b.i2c_stop_read(id));
    b.advance(ms(20));
    assert_eq!(data.borrow().len(), 3);
}

#[test]
fn reply_event_name_carries_address_and_register() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, Some(0x10), vec![5]);
    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    b.on("I2C-reply72-16", move |_| *counter.borrow_mut() += 1);
    b.i2c_read_once(0x48, Some(0x10), 1, |_| {}).unwrap();
    b.advance(ms(5));
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn configured_delay_applies_to_reads() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, None, vec![1]);
    b.i2c_config(20u32).unwrap();
    let (data, handler) = replies();
    b.i2c_read_once(0x48, None, 1, handler).unwrap();
    b.advance(ms(19));
    assert!(data.borrow().is_empty());
    b.advance(ms(1));
    assert_eq!(data.borrow().len(), 1);
}

#[test]
fn bus_override_and_miniboard_bus() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.send_i2c_config(I2cOptions {
        bus: Some(2),
        ..I2cOptions::default()
    })
    .unwrap();
    assert_eq!(probe.calls(), vec![HwCall::I2cOpen(2)]);

    let (mut mini, probe) = board(Platform::EdisonMiniboard);
    mini.send_i2c_write_request(0x20, 0x01u8).unwrap();
    assert!(probe.calls().contains(&HwCall::I2cOpen(1)));
}

#[test]
fn per_address_handles() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.i2c_config(I2cOptions {
        handles: Some(I2cHandleMode::PerAddress),
        ..I2cOptions::default()
    })
    .unwrap();
    b.i2c_write(0x40, 0x00u8).unwrap();
    b.i2c_write(0x41, 0x00u8).unwrap();
    b.i2c_write(0x40, 0x01u8).unwrap();
    assert_eq!(probe.i2c_handle_count(), 2);
    assert!(probe.calls().contains(&HwCall::I2cAddress(1, 0x41)));
}

#[test]
fn binding_without_i2c_reports_not_implemented() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("class/gpio")).unwrap();

    let mut config = BoardConfig::default();
    config.board.binding = "sysfs".into();
    config.sysfs.root = dir.path().to_path_buf();
    let mut b = Board::from_registry(&BindingRegistry::with_builtin(), config).unwrap();

    assert_eq!(b.binding_name(), "sysfs");
    assert_eq!(
        b.i2c_config(I2cOptions::default()),
        Err(BoardError::NotImplemented("I2C"))
    );
    assert_eq!(
        b.i2c_write(0x40, 0x00u8),
        Err(BoardError::NotImplemented("I2C"))
    );
}

#[test]
fn stopped_read_handler_gets_no_later_replies() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    probe.set_i2c_data(0x48, None, vec![3]);
    let (stopped, h1) = replies();
    let (later, h2) = replies();
    let id = b.i2c_read(0x48, None, 1, h1).unwrap();
    b.advance(ms(5));
    assert_eq!(stopped.borrow().len(), 1);

    assert!(b.i2c_stop_read(id));
    b.i2c_read_once(0x48, None, 1, h2).unwrap();
    b.advance(ms(5));
    assert_eq!(stopped.borrow().len(), 1);
    assert_eq!(*later.borrow(), vec![vec![3]]);
}
