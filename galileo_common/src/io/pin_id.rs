//! Logical pin identifiers as supplied by the host.
//!
//! Hosts address pins either by number (`13`) or by name (`"A0"`,
//! `"J17-1"`, `"GP182"`). The identifier keeps the original spelling so
//! that change events can be named after the pin the host asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pin as named by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinId {
    Number(u16),
    Name(String),
}

impl PinId {
    /// Channel number of an `A<n>` style name, if this is one.
    pub fn analog_channel(&self) -> Option<u16> {
        match self {
            Self::Name(name) => {
                let rest = name.strip_prefix(['A', 'a'])?;
                if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                rest.parse().ok()
            }
            Self::Number(_) => None,
        }
    }

    /// Numeric value, if the pin was given as a number.
    pub const fn number(&self) -> Option<u16> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Name(_) => None,
        }
    }
}

impl From<u16> for PinId {
    fn from(n: u16) -> Self {
        Self::Number(n)
    }
}

impl From<u8> for PinId {
    fn from(n: u8) -> Self {
        Self::Number(u16::from(n))
    }
}

/// Untyped integer literals land here. Out-of-range values map to a pin
/// number no table has.
impl From<i32> for PinId {
    fn from(n: i32) -> Self {
        Self::Number(u16::try_from(n).unwrap_or(u16::MAX))
    }
}

impl From<&str> for PinId {
    /// Numeric strings become `Number`, everything else stays a name.
    fn from(s: &str) -> Self {
        match s.trim().parse::<u16>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Name(s.trim().to_string()),
        }
    }
}

impl From<String> for PinId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&PinId> for PinId {
    fn from(id: &PinId) -> Self {
        id.clone()
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_become_numbers() {
        assert_eq!(PinId::from("13"), PinId::Number(13));
        assert_eq!(PinId::from(" 7 "), PinId::Number(7));
        assert_eq!(PinId::from("J17-1"), PinId::Name("J17-1".into()));
    }

    #[test]
    fn integer_literals() {
        assert_eq!(PinId::from(13), PinId::Number(13));
        assert_eq!(PinId::from(-1), PinId::Number(u16::MAX));
    }

    #[test]
    fn analog_names() {
        assert_eq!(PinId::from("A0").analog_channel(), Some(0));
        assert_eq!(PinId::from("a5").analog_channel(), Some(5));
        assert_eq!(PinId::from("A").analog_channel(), None);
        assert_eq!(PinId::from("AB").analog_channel(), None);
        assert_eq!(PinId::from(3u16).analog_channel(), None);
    }

    #[test]
    fn display_keeps_spelling() {
        assert_eq!(PinId::from("GP182").to_string(), "GP182");
        assert_eq!(PinId::from(9u8).to_string(), "9");
    }
}
