//! Board facade integration tests: pin resolution, mode transitions,
//! PWM/servo output and lifecycle.

mod common;

use common::{board, board_with, duties, gpio_writes, ms};
use galileo_hal::bindings::simulation::{HwCall, SimulationBinding};
use galileo_hal::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

// ─── Pin resolution ─────────────────────────────────────────────────

#[test]
fn absent_and_unsupported_pins_are_rejected() {
    let (mut b, probe) = board(Platform::EdisonArduino);

    assert!(matches!(
        b.pin_mode(20, PinMode::Output),
        Err(BoardError::InvalidPin { .. })
    ));
    assert!(matches!(
        b.pin_mode(10, PinMode::Pwm),
        Err(BoardError::UnsupportedMode { mode: PinMode::Pwm, .. })
    ));
    assert!(matches!(
        b.pin_mode("A0", PinMode::Servo),
        Err(BoardError::UnsupportedMode { .. })
    ));
    assert!(probe.calls().is_empty());

    b.pin_mode(3, PinMode::Pwm).unwrap();
    b.pin_mode("A0", PinMode::Analog).unwrap();
    b.pin_mode(13, PinMode::Stepper).unwrap();
}

#[test]
fn miniboard_gaps_and_aliases() {
    let (mut b, _) = board(Platform::EdisonMiniboard);
    assert!(matches!(
        b.pin_mode(1, PinMode::Output),
        Err(BoardError::InvalidPin { .. })
    ));
    b.pin_mode("J17-1", PinMode::Servo).unwrap();
    assert_eq!(b.pin_state(0).unwrap().mode, Some(PinMode::Servo));
    assert!(matches!(
        b.pin_mode("J20-3", PinMode::Output),
        Err(BoardError::InvalidPin { .. })
    ));
    // No ADC on the Mini breakout.
    assert!(matches!(
        b.pin_mode(0, PinMode::Analog),
        Err(BoardError::UnsupportedMode { .. })
    ));
}

#[test]
fn invalid_pin_message_names_the_board() {
    let (mut b, _) = board(Platform::GalileoGen2);
    let err = b.pin_mode(42, PinMode::Input).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Intel Galileo Gen 2 does not have a connection at pin 42"
    );
}

#[test]
fn normalize_follows_board_naming() {
    let (b, _) = board(Platform::GalileoGen2);
    assert_eq!(b.normalize("A3").unwrap(), 3);
    assert_eq!(b.normalize(13).unwrap(), 13);

    let (mini, _) = board(Platform::EdisonMiniboard);
    assert_eq!(mini.normalize("j18_2").unwrap(), 15);
    assert!(matches!(
        mini.normalize("J99-9"),
        Err(BoardError::InvalidPin { .. })
    ));
}

// ─── Mode transitions ───────────────────────────────────────────────

#[test]
fn pin_mode_twice_is_idempotent() {
    let (mut b, probe) = board(Platform::GalileoGen2);
    b.pin_mode(3, PinMode::Output).unwrap();
    let state = b.pin_state(3).cloned();
    probe.clear_calls();

    b.pin_mode(3, PinMode::Output).unwrap();
    assert!(probe.calls().is_empty());
    assert_eq!(b.pin_state(3).cloned(), state);
}

#[test]
fn gen2_mux_lines_switch_for_pwm() {
    let (mut b, probe) = board(Platform::GalileoGen2);
    b.pin_mode(3, PinMode::Output).unwrap();
    probe.clear_calls();

    b.pin_mode(3, PinMode::Pwm).unwrap();
    assert_eq!(
        probe.calls(),
        vec![
            HwCall::GpioWrite(64, Level::High),
            HwCall::PwmOpen(1),
            HwCall::PwmEnable(1, true),
        ]
    );
}

#[test]
fn digital_write_coerces_to_output() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.pin_mode(13, PinMode::Input).unwrap();
    probe.clear_calls();

    b.digital_write(13, HIGH).unwrap();
    assert_eq!(b.pin_state(13).unwrap().mode, Some(PinMode::Output));
    assert_eq!(
        probe.calls(),
        vec![
            HwCall::GpioDir(13, Direction::Out),
            HwCall::GpioWrite(13, Level::High),
        ]
    );
    assert_eq!(b.pin_state(13).unwrap().value, 1);

    b.digital_write(13, LOW).unwrap();
    assert_eq!(probe.line(13).unwrap().level, Level::Low);
}

#[test]
fn analog_write_coerces_to_pwm() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.analog_write(9, 255).unwrap();
    assert_eq!(b.pin_state(9).unwrap().mode, Some(PinMode::Pwm));
    assert!(probe.calls().contains(&HwCall::PwmPeriod(9, 700_000)));
    b.poll();
    assert_eq!(duties(&probe), vec![(9, 699_900)]);
}

#[test]
fn leaving_pwm_disables_channel() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.analog_write(6, 128).unwrap();
    b.digital_write(6, HIGH).unwrap();
    assert!(probe.calls().contains(&HwCall::PwmEnable(6, false)));
    assert!(!probe.pwm(6).unwrap().enabled);
}

// ─── Servo and PWM timing ───────────────────────────────────────────

#[test]
fn servo_end_to_end_single_enable_period_and_duty() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.pin_mode(3, PinMode::Servo).unwrap();
    b.servo_write(3, 90).unwrap();

    assert_eq!(probe.count(|c| *c == HwCall::PwmEnable(3, true)), 1);
    assert_eq!(probe.count(|c| matches!(c, HwCall::PwmPeriod(3, _))), 1);
    assert!(probe.calls().contains(&HwCall::PwmPeriod(3, 7_968_000)));
    assert!(duties(&probe).is_empty());
    assert_eq!(b.pending_duty(3), Some(1_600_000));

    b.poll();
    assert_eq!(duties(&probe), vec![(3, 1_600_000)]);
    assert_eq!(probe.count(|c| matches!(c, HwCall::PwmEnable(..))), 1);
    assert_eq!(b.pending_duty(3), None);
}

#[test]
fn servo_default_range_scaling() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.servo_write(5, 0).unwrap();
    b.poll();
    b.servo_write(5, 90).unwrap();
    b.servo_write(5, 180).unwrap();
    assert_eq!(
        duties(&probe),
        vec![(5, 600_000), (5, 1_600_000), (5, 2_600_000)]
    );
    assert_eq!(b.pin_state(5).unwrap().value, 180);
}

#[test]
fn servo_custom_range_scaling() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.servo_config(6, 1000, 2000).unwrap();
    b.servo_write(6, 0).unwrap();
    b.poll();
    b.servo_write(6, 90).unwrap();
    b.servo_write(6, 180).unwrap();
    assert_eq!(
        duties(&probe),
        vec![(6, 1_000_000), (6, 1_500_000), (6, 2_000_000)]
    );
}

#[test]
fn servo_config_rejects_inverted_range() {
    let (mut b, _) = board(Platform::EdisonArduino);
    assert_eq!(
        b.servo_config(6, 2000, 1000),
        Err(BoardError::InvalidServoRange {
            min_us: 2000,
            max_us: 1000
        })
    );
}

#[test]
fn gen2_period_settles_before_duty() {
    let (mut b, probe) = board(Platform::GalileoGen2);
    b.servo_write(3, 90).unwrap();
    assert!(probe.calls().contains(&HwCall::PwmPeriod(1, 2_800_000)));

    b.poll();
    assert!(duties(&probe).is_empty());

    // A newer value replaces the pending one.
    b.servo_write(3, 0).unwrap();
    assert_eq!(b.pending_duty(3), Some(600_000));

    b.advance(ms(1));
    assert_eq!(duties(&probe), vec![(1, 600_000)]);
}

#[test]
fn gen2_period_is_shared_across_channels() {
    let (mut b, probe) = board(Platform::GalileoGen2);
    b.servo_write(3, 90).unwrap();
    b.advance(ms(1));
    probe.clear_calls();

    // Same period already on the chip: duty goes out immediately.
    b.servo_write(5, 90).unwrap();
    assert_eq!(probe.count(|c| matches!(c, HwCall::PwmPeriod(..))), 0);
    assert_eq!(duties(&probe), vec![(3, 1_600_000)]);
}

// ─── Lifecycle ──────────────────────────────────────────────────────

#[test]
fn connect_then_ready_are_delivered() {
    let (mut b, _) = board(Platform::GalileoGen1);
    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&names);
    b.on_any(move |e| sink.borrow_mut().push(e.name()));
    b.poll();
    assert_eq!(*names.borrow(), vec!["connect", "ready"]);
}

#[test]
fn init_drives_digital_pins_low() {
    let sim = SimulationBinding::for_platform(Platform::EdisonArduino);
    let probe = sim.probe();
    let b = Board::open(Box::new(sim), BoardConfig::default()).unwrap();
    let writes = gpio_writes(&probe);
    assert_eq!(writes.len(), 14);
    assert!(writes.iter().all(|(_, level)| *level == Level::Low));
    assert_eq!(probe.count(|c| matches!(c, HwCall::AioOpen(_))), 6);
    assert_eq!(b.pin_state(4).unwrap().direction, Some(Direction::Out));
    assert_eq!(b.pin_state(4).unwrap().mode, None);
}

#[test]
fn profile_accessors() {
    let (b, _) = board(Platform::Joule);
    assert_eq!(b.profile().platform, Platform::Joule);
    assert_eq!(b.aref(), None);
    assert!((b.vref() - 1.8).abs() < f32::EPSILON);
    assert_eq!(b.binding_name(), "simulation");

    let (b, _) = board(Platform::GalileoGen2);
    assert_eq!(b.aref(), Some(5.0));
}

#[test]
fn configured_platform_overrides_binding() {
    let mut config = BoardConfig::default();
    config.board.platform = Some(Platform::Joule);
    let (b, _) = board_with(Platform::GalileoGen2, config);
    assert_eq!(b.profile().platform, Platform::Joule);
}

#[test]
fn unknown_platform_falls_back_to_generic() {
    let sim = SimulationBinding::new(77, 20, 0);
    let b = Board::open(Box::new(sim), BoardConfig::default()).unwrap();
    assert_eq!(b.profile().platform, Platform::Generic);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = BoardConfig::default();
    config.servo.min_us = 3000;
    let sim = SimulationBinding::for_platform(Platform::EdisonArduino);
    assert!(matches!(
        Board::open(Box::new(sim), config),
        Err(BoardError::Config(_))
    ));
}

#[test]
fn board_from_registry() {
    let mut config = BoardConfig::default();
    config.simulation.platform_type = 2;
    config.simulation.pin_count = 56;
    let b = Board::from_registry(&BindingRegistry::with_builtin(), config).unwrap();
    assert_eq!(b.profile().platform, Platform::EdisonMiniboard);
    assert_eq!(b.profile().i2c_bus, 1);

    let mut config = BoardConfig::default();
    config.board.binding = "firmata".into();
    assert!(matches!(
        Board::from_registry(&BindingRegistry::with_builtin(), config),
        Err(BoardError::Binding(BindingError::BindingNotFound(_)))
    ));
}

#[test]
fn sysfs_board_name_selects_galileo_generation() {
    for (name, platform) in [
        ("GalileoGen2", Platform::GalileoGen2),
        ("Galileo", Platform::GalileoGen1),
    ] {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("class/gpio")).unwrap();
        std::fs::create_dir_all(dir.path().join("devices/virtual/dmi/id")).unwrap();
        std::fs::write(dir.path().join("devices/virtual/dmi/id/board_name"), name).unwrap();

        let mut config = BoardConfig::default();
        config.board.binding = "sysfs".into();
        config.sysfs.root = dir.path().to_path_buf();
        let b = Board::from_registry(&BindingRegistry::with_builtin(), config).unwrap();
        assert_eq!(b.profile().platform, platform);
    }
}

#[test]
fn uart_pins_reject_every_mode() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    // ANALOG with a number names an ADC channel, so it is not tried here.
    for pin in [0u16, 1] {
        for mode in [
            PinMode::Input,
            PinMode::Output,
            PinMode::Pwm,
            PinMode::Servo,
            PinMode::Stepper,
        ] {
            assert!(matches!(
                b.pin_mode(pin, mode),
                Err(BoardError::UnsupportedMode { .. })
            ));
        }
    }
    assert!(matches!(
        b.digital_write(0, 1),
        Err(BoardError::UnsupportedMode { .. })
    ));
    assert!(probe.calls().is_empty());
}

#[test]
fn unsupported_operations_report_not_implemented() {
    let (mut b, _) = board(Platform::EdisonArduino);
    assert_eq!(b.pulse_in(), Err(BoardError::NotImplemented("pulse_in")));
    assert_eq!(b.pulse_out(), Err(BoardError::NotImplemented("pulse_out")));
    assert!(matches!(
        b.query_pin_state(),
        Err(BoardError::NotImplemented(_))
    ));
    assert!(matches!(
        b.send_one_wire_search(),
        Err(BoardError::NotImplemented(_))
    ));
}

#[test]
fn reset_clears_pin_state_and_listeners() {
    let (mut b, probe) = board(Platform::EdisonArduino);
    b.pin_mode(3, PinMode::Servo).unwrap();
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    b.on_any(move |_| *counter.borrow_mut() += 1);
    b.advance(ms(5));

    b.reset();
    assert_eq!(b.pin_state(3).unwrap().mode, None);
    assert_eq!(b.now(), ms(5));

    probe.clear_calls();
    b.digital_read(7, |_| {}).unwrap();
    b.advance(ms(10));
    assert_eq!(*hits.borrow(), 2);
}

#[test]
fn shutdown_stops_the_loop() {
    let (mut b, _) = board(Platform::EdisonArduino);
    b.digital_read(7, |_| {}).unwrap();
    let flag = b.running_flag();
    b.shutdown().unwrap();
    assert!(!flag.load(std::sync::atomic::Ordering::SeqCst));
    assert!(!b.is_reading());
}
