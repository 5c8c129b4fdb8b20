//! Native binding implementations.
//!
//! - [`simulation`] - In-memory binding for development and tests
//! - [`sysfs`] - Linux sysfs GPIO/PWM/IIO binding
//!
//! # Adding New Bindings
//!
//! 1. Create a new submodule under `bindings/`
//! 2. Implement the `IoBinding` trait from `galileo_common::binding`
//! 3. Register its factory in `BindingRegistry::with_builtin()`

pub mod simulation;
pub mod sysfs;
