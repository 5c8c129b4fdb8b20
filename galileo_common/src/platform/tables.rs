//! Static pin capability tables, one per board layout.
//!
//! Arduino-layout tables have 20 entries: digital pins `0..=13` followed
//! by `A0..=A5` at indices `14..=19`; pins 0 and 1 carry the UART and
//! support no mode. Galileo tables carry sysfs GPIO numbers and the mux
//! chains of the on-board expanders; the remaining layouts use native pin
//! numbering, so line and channel equal the index.

use super::descriptor::{MuxLine, PinDescriptor};
use crate::io::Level;
use static_assertions::const_assert;

/// Mux chain literal: `mux![76 => Low, 64 => High]`.
macro_rules! mux {
    ($($line:literal => $level:ident),* $(,)?) => {
        &[$(MuxLine { line: $line, level: Level::$level }),*]
    };
}

pub const ARDUINO_PIN_COUNT: usize = 20;
pub const MINIBOARD_PIN_COUNT: usize = 56;
pub const JOULE_PIN_COUNT: usize = 104;

// ─── Galileo Gen 2 ──────────────────────────────────────────────────

pub const GALILEO_GEN2_PINS: &[Option<PinDescriptor>] = &[
    Some(PinDescriptor::gpio(11).output_enable(32).reserved()),
    Some(PinDescriptor::gpio(12).output_enable(28).muxed(mux![45 => Low]).reserved()),
    Some(PinDescriptor::gpio(13).output_enable(34).muxed(mux![77 => Low])),
    Some(
        PinDescriptor::gpio(14)
            .output_enable(16)
            .muxed(mux![76 => Low, 64 => Low])
            .pwm(1, mux![76 => Low, 64 => High, 16 => Low]),
    ),
    Some(PinDescriptor::gpio(6).output_enable(36)),
    Some(
        PinDescriptor::gpio(0)
            .output_enable(18)
            .muxed(mux![66 => Low])
            .pwm(3, mux![66 => High, 18 => Low]),
    ),
    Some(
        PinDescriptor::gpio(1)
            .output_enable(20)
            .muxed(mux![68 => Low])
            .pwm(5, mux![68 => High, 20 => Low]),
    ),
    Some(PinDescriptor::gpio(38)),
    Some(PinDescriptor::gpio(40)),
    Some(
        PinDescriptor::gpio(4)
            .output_enable(22)
            .muxed(mux![70 => Low])
            .pwm(7, mux![70 => High, 22 => Low]),
    ),
    Some(
        PinDescriptor::gpio(10)
            .output_enable(26)
            .muxed(mux![74 => Low])
            .pwm(11, mux![74 => High, 26 => Low]),
    ),
    Some(
        PinDescriptor::gpio(5)
            .output_enable(24)
            .muxed(mux![72 => Low, 44 => Low])
            .pwm(9, mux![72 => High, 44 => Low, 24 => Low]),
    ),
    Some(PinDescriptor::gpio(15).output_enable(42)),
    Some(PinDescriptor::gpio(7).output_enable(30).muxed(mux![46 => Low])),
    Some(PinDescriptor::gpio(48).analog(0, mux![49 => High])),
    Some(PinDescriptor::gpio(50).analog(1, mux![51 => High])),
    Some(PinDescriptor::gpio(52).analog(2, &[])),
    Some(PinDescriptor::gpio(54).analog(3, mux![55 => High])),
    Some(PinDescriptor::gpio(56).analog(4, mux![60 => High, 78 => High])),
    Some(PinDescriptor::gpio(58).analog(5, mux![60 => High, 79 => High])),
];

// ─── Galileo Gen 1 ──────────────────────────────────────────────────

pub const GALILEO_GEN1_PINS: &[Option<PinDescriptor>] = &[
    Some(PinDescriptor::gpio(50).muxed(mux![40 => High]).reserved()),
    Some(PinDescriptor::gpio(51).muxed(mux![41 => High]).reserved()),
    Some(PinDescriptor::gpio(32).muxed(mux![31 => High, 1 => High])),
    Some(PinDescriptor::gpio(18).muxed(mux![30 => High]).pwm(3, &[])),
    Some(PinDescriptor::gpio(28)),
    Some(PinDescriptor::gpio(17).pwm(5, &[])),
    Some(PinDescriptor::gpio(24).pwm(6, &[])),
    Some(PinDescriptor::gpio(27)),
    Some(PinDescriptor::gpio(26)),
    Some(PinDescriptor::gpio(19).pwm(1, &[])),
    Some(PinDescriptor::gpio(16).muxed(mux![42 => High]).pwm(7, &[])),
    Some(PinDescriptor::gpio(25).muxed(mux![43 => High]).pwm(4, &[])),
    Some(PinDescriptor::gpio(38).muxed(mux![54 => High])),
    Some(PinDescriptor::gpio(39).muxed(mux![55 => High])),
    Some(PinDescriptor::gpio(44).analog(0, mux![37 => Low])),
    Some(PinDescriptor::gpio(45).analog(1, mux![36 => Low])),
    Some(PinDescriptor::gpio(46).analog(2, mux![23 => Low])),
    Some(PinDescriptor::gpio(47).analog(3, mux![22 => Low])),
    Some(PinDescriptor::gpio(48).analog(4, mux![21 => Low, 29 => High])),
    Some(PinDescriptor::gpio(49).analog(5, mux![20 => Low, 29 => High])),
];

// ─── Native numbering (Edison, generic Arduino layout) ──────────────

pub const ARDUINO_PINS: &[Option<PinDescriptor>] = &[
    Some(PinDescriptor::gpio(0).reserved()),
    Some(PinDescriptor::gpio(1).reserved()),
    Some(PinDescriptor::gpio(2)),
    Some(PinDescriptor::gpio(3).pwm(3, &[])),
    Some(PinDescriptor::gpio(4)),
    Some(PinDescriptor::gpio(5).pwm(5, &[])),
    Some(PinDescriptor::gpio(6).pwm(6, &[])),
    Some(PinDescriptor::gpio(7)),
    Some(PinDescriptor::gpio(8)),
    Some(PinDescriptor::gpio(9).pwm(9, &[])),
    Some(PinDescriptor::gpio(10).pwm(10, &[])),
    Some(PinDescriptor::gpio(11).pwm(11, &[])),
    Some(PinDescriptor::gpio(12)),
    Some(PinDescriptor::gpio(13)),
    Some(PinDescriptor::gpio(14).analog(0, &[])),
    Some(PinDescriptor::gpio(15).analog(1, &[])),
    Some(PinDescriptor::gpio(16).analog(2, &[])),
    Some(PinDescriptor::gpio(17).analog(3, &[])),
    Some(PinDescriptor::gpio(18).analog(4, &[])),
    Some(PinDescriptor::gpio(19).analog(5, &[])),
];

/// Edison on the Arduino breakout: the native layer drives only four PWM
/// channels, so pins 10 and 11 are plain GPIO.
pub const EDISON_ARDUINO_PINS: &[Option<PinDescriptor>] = &[
    Some(PinDescriptor::gpio(0).reserved()),
    Some(PinDescriptor::gpio(1).reserved()),
    Some(PinDescriptor::gpio(2)),
    Some(PinDescriptor::gpio(3).pwm(3, &[])),
    Some(PinDescriptor::gpio(4)),
    Some(PinDescriptor::gpio(5).pwm(5, &[])),
    Some(PinDescriptor::gpio(6).pwm(6, &[])),
    Some(PinDescriptor::gpio(7)),
    Some(PinDescriptor::gpio(8)),
    Some(PinDescriptor::gpio(9).pwm(9, &[])),
    Some(PinDescriptor::gpio(10)),
    Some(PinDescriptor::gpio(11)),
    Some(PinDescriptor::gpio(12)),
    Some(PinDescriptor::gpio(13)),
    Some(PinDescriptor::gpio(14).analog(0, &[])),
    Some(PinDescriptor::gpio(15).analog(1, &[])),
    Some(PinDescriptor::gpio(16).analog(2, &[])),
    Some(PinDescriptor::gpio(17).analog(3, &[])),
    Some(PinDescriptor::gpio(18).analog(4, &[])),
    Some(PinDescriptor::gpio(19).analog(5, &[])),
];

// ─── Named-header boards ────────────────────────────────────────────
//
// Layout strings: `d` digital, `p` digital + PWM/servo, `x` absent.

const MINIBOARD_LAYOUT: &[u8; MINIBOARD_PIN_COUNT] =
    b"pxxxdxddddddxdpdxxxdppxddddxxxxdddxdddddddxxxddddddddddd";

const JOULE_LAYOUT: &[u8; JOULE_PIN_COUNT] =
    b"xddxdddddxdddddddddddddxdxpdpxpxpxxdxxxxxxxxxxxxxxxdxdxdxdxdxddddddddddddddddddddxxxxxxxxxxxxxxxxxxxdddd";

const fn from_layout<const N: usize>(layout: &[u8; N]) -> [Option<PinDescriptor>; N] {
    let mut pins = [None; N];
    let mut i = 0;
    while i < N {
        pins[i] = match layout[i] {
            b'd' => Some(PinDescriptor::gpio(i as u16)),
            b'p' => Some(PinDescriptor::gpio(i as u16).pwm(i as u8, &[])),
            _ => None,
        };
        i += 1;
    }
    pins
}

pub static MINIBOARD_PINS: [Option<PinDescriptor>; MINIBOARD_PIN_COUNT] =
    from_layout(MINIBOARD_LAYOUT);

pub static JOULE_PINS: [Option<PinDescriptor>; JOULE_PIN_COUNT] = from_layout(JOULE_LAYOUT);

// ─── Edison Mini breakout header names ──────────────────────────────

/// Header (`J17-1`) and SoC GPIO (`GP182`) names on the Mini breakout.
/// GP names are listed in header order and share their header pin's index.
pub const MINIBOARD_ALIASES: &[(&str, u16)] = &[
    ("J17-1", 0),
    ("J17-5", 4),
    ("J17-7", 6),
    ("J17-8", 7),
    ("J17-9", 8),
    ("J17-10", 9),
    ("J17-11", 10),
    ("J17-12", 11),
    ("J17-14", 13),
    ("J18-1", 14),
    ("J18-2", 15),
    ("J18-6", 19),
    ("J18-7", 20),
    ("J18-8", 21),
    ("J18-10", 23),
    ("J18-11", 24),
    ("J18-12", 25),
    ("J18-13", 26),
    ("J19-4", 31),
    ("J19-5", 32),
    ("J19-6", 33),
    ("J19-8", 35),
    ("J19-9", 36),
    ("J19-10", 37),
    ("J19-11", 38),
    ("J19-12", 39),
    ("J19-13", 40),
    ("J19-14", 41),
    ("J20-3", 44),
    ("J20-4", 45),
    ("J20-5", 46),
    ("J20-6", 47),
    ("J20-7", 48),
    ("J20-8", 49),
    ("J20-9", 50),
    ("J20-10", 51),
    ("J20-11", 52),
    ("J20-12", 53),
    ("J20-13", 54),
    ("J20-14", 55),
    ("GP182", 0),
    ("GP135", 4),
    ("GP27", 6),
    ("GP20", 7),
    ("GP28", 8),
    ("GP111", 9),
    ("GP109", 10),
    ("GP115", 11),
    ("GP128", 13),
    ("GP13", 14),
    ("GP165", 15),
    ("GP19", 19),
    ("GP12", 20),
    ("GP183", 21),
    ("GP110", 23),
    ("GP114", 24),
    ("GP129", 25),
    ("GP130", 26),
    ("GP44", 31),
    ("GP46", 32),
    ("GP48", 33),
    ("GP131", 35),
    ("GP14", 36),
    ("GP40", 37),
    ("GP43", 38),
    ("GP77", 39),
    ("GP82", 40),
    ("GP83", 41),
    ("GP134", 44),
    ("GP45", 45),
    ("GP47", 46),
    ("GP49", 47),
    ("GP15", 48),
    ("GP84", 49),
    ("GP42", 50),
    ("GP41", 51),
    ("GP78", 52),
    ("GP79", 53),
    ("GP80", 54),
    ("GP81", 55),
];

const fn aliases_in_range(aliases: &[(&str, u16)], len: usize) -> bool {
    let mut i = 0;
    while i < aliases.len() {
        if aliases[i].1 as usize >= len {
            return false;
        }
        i += 1;
    }
    true
}

const_assert!(GALILEO_GEN1_PINS.len() == ARDUINO_PIN_COUNT);
const_assert!(GALILEO_GEN2_PINS.len() == ARDUINO_PIN_COUNT);
const_assert!(ARDUINO_PINS.len() == ARDUINO_PIN_COUNT);
const_assert!(EDISON_ARDUINO_PINS.len() == ARDUINO_PIN_COUNT);
const_assert!(aliases_in_range(MINIBOARD_ALIASES, MINIBOARD_PIN_COUNT));
