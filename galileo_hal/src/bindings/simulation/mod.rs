//! Simulation binding.
//!
//! Software stand-in for the native layer, used for development without
//! hardware and throughout the test suite.

mod binding;
mod lines;

pub use binding::{HwCall, SimulationBinding, SimulationProbe};
pub use lines::{SimLine, SimPwm};

use galileo_common::binding::{BindingError, IoBinding};
use galileo_common::config::BoardConfig;

/// Factory registered as `"simulation"`.
pub fn create_binding(config: &BoardConfig) -> Result<Box<dyn IoBinding>, BindingError> {
    Ok(Box::new(SimulationBinding::from_config(&config.simulation)))
}
