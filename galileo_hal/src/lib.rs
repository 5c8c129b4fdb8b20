//! # Galileo HAL
//!
//! Board driver for Intel Galileo, Edison and Joule carrier boards.
//!
//! Pin-numbered requests (digital and analog I/O, PWM, servo, I2C,
//! steppers) are resolved against the running board's pin table and
//! turned into line-level calls on a pluggable native binding.
//!
//! # Module Structure
//!
//! - [`board`] - `Board` facade, the host-facing API
//! - [`pins`] - Pin state machine and multiplexer coordinator
//! - [`pwm`] - PWM/servo duty computation and period sequencing
//! - [`sampling`] - Repeating read-and-report loop
//! - [`i2c`] - I2C transaction manager
//! - [`stepper`] - Stepper sequencer
//! - [`scheduler`] - Virtual-time timer set
//! - [`events`] - Board events and subscriptions
//! - [`binding_registry`] - Binding factory registration
//! - [`bindings`] - Simulation and sysfs bindings
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       galileo_hal                                │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  EventBus   │◄───│    Board     │◄──►│  Binding Registry   │  │
//! │  │ (listeners) │    │ (scheduler)  │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │ pins, pwm, sampling, i2c, stepper   │
//! │                            ▼                                     │
//! │                   ┌────────────────┐                             │
//! │                   │   IoBinding    │ (trait object)              │
//! │                   └────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use galileo_hal::prelude::*;
//! use galileo_hal::bindings::simulation::SimulationBinding;
//!
//! let binding = SimulationBinding::for_platform(Platform::EdisonArduino);
//! let mut board = Board::open(Box::new(binding), BoardConfig::default()).unwrap();
//! board.pin_mode(3, PinMode::Servo).unwrap();
//! board.servo_write(3, 90).unwrap();
//! board.poll();
//! assert_eq!(board.pin_state(3).unwrap().pwm.unwrap().duty_ns, Some(1_600_000));
//! ```

pub mod binding_registry;
pub mod bindings;
pub mod board;
pub mod context;
pub mod events;
pub mod i2c;
pub mod pins;
pub mod pwm;
pub mod sampling;
pub mod scheduler;
pub mod stepper;

pub use crate::binding_registry::BindingRegistry;
pub use crate::board::Board;
pub use crate::events::{BoardEvent, ListenerId};
pub use crate::i2c::{I2cOptions, I2cWrite};
pub use crate::stepper::{StepDirection, StepperWiring};

/// Engine types plus everything from `galileo_common::prelude`.
pub mod prelude {
    pub use crate::{
        BindingRegistry, Board, BoardEvent, I2cOptions, I2cWrite, ListenerId, StepDirection,
        StepperWiring,
    };
    pub use galileo_common::prelude::*;
}
