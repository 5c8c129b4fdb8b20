//! Pin-level vocabulary shared by the engine, the pin tables and the bindings.

pub mod level;
pub mod mode;
pub mod pin_id;

pub use level::{Direction, Level};
pub use mode::{ModeSet, PinMode};
pub use pin_id::PinId;
