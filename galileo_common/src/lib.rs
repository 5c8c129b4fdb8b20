//! Galileo Common Library
//!
//! Shared types for the Galileo board driver workspace: pin modes and
//! capability sets, per-platform pin tables, the native binding trait,
//! error types and configuration loading.
//!
//! # Module Structure
//!
//! - [`io`] - Pin modes, logic levels, directions and pin identifiers
//! - [`platform`] - Platform identification and pin capability tables
//! - [`binding`] - The `IoBinding` trait implemented by hardware backends
//! - [`error`] - Board-level error type
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Timing and sizing constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use galileo_common::prelude::*;
//!
//! let query = PlatformQuery { platform_type: 1, pin_count: 20, default_i2c_bus: 0 };
//! let profile = PlatformProfile::resolve(&query);
//! assert_eq!(profile.platform, Platform::GalileoGen2);
//! ```

pub mod binding;
pub mod config;
pub mod consts;
pub mod error;
pub mod io;
pub mod platform;
pub mod prelude;
