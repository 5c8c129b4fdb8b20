//! Platform identification and pin capability profiles.
//!
//! The binding reports a platform family id and a pin count once at
//! startup; [`identify`] turns that into a [`Platform`] and
//! [`PlatformProfile::for_platform`] selects the matching table.

pub mod descriptor;
pub mod profile;
pub mod tables;

pub use descriptor::{MuxLine, PinDescriptor};
pub use profile::{AnalogScale, PinNaming, PlatformProfile, PwmTiming};

use crate::binding::IoBinding;
use crate::consts::MINIBOARD_PIN_COUNT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Native platform family ids.
pub const PLATFORM_GALILEO_GEN1: u32 = 0;
pub const PLATFORM_GALILEO_GEN2: u32 = 1;
pub const PLATFORM_EDISON: u32 = 2;
pub const PLATFORM_JOULE: u32 = 13;

/// Supported board variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    GalileoGen1,
    GalileoGen2,
    EdisonArduino,
    EdisonMiniboard,
    Joule,
    /// Arduino layout with native numbering, used for unknown ids.
    Generic,
}

impl Platform {
    pub const fn name(self) -> &'static str {
        match self {
            Self::GalileoGen1 => "Intel Galileo Gen 1",
            Self::GalileoGen2 => "Intel Galileo Gen 2",
            Self::EdisonArduino => "Intel Edison (Arduino breakout)",
            Self::EdisonMiniboard => "Intel Edison (Mini breakout)",
            Self::Joule => "Intel Joule",
            Self::Generic => "Generic Arduino layout",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity answers collected from the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformQuery {
    pub platform_type: u32,
    pub pin_count: u32,
    pub default_i2c_bus: u8,
}

impl PlatformQuery {
    pub fn from_binding(binding: &dyn IoBinding) -> Self {
        Self {
            platform_type: binding.platform_type(),
            pin_count: binding.pin_count(),
            default_i2c_bus: binding.default_i2c_bus(),
        }
    }
}

/// Pick the board variant: family id first, then the Edison pin-count
/// heuristic. Unknown ids fall back to [`Platform::Generic`].
pub fn identify(query: &PlatformQuery) -> Platform {
    match query.platform_type {
        PLATFORM_GALILEO_GEN1 => Platform::GalileoGen1,
        PLATFORM_GALILEO_GEN2 => Platform::GalileoGen2,
        PLATFORM_EDISON if query.pin_count > MINIBOARD_PIN_COUNT_THRESHOLD => {
            Platform::EdisonMiniboard
        }
        PLATFORM_EDISON => Platform::EdisonArduino,
        PLATFORM_JOULE => Platform::Joule,
        other => {
            warn!(
                "Unknown platform type {} ({} pins), using generic Arduino layout",
                other, query.pin_count
            );
            Platform::Generic
        }
    }
}
