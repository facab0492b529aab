//! Emergency service kinds.
//!
//! Each kind owns an independent request partition and an independent guest
//! counter. The three kinds mirror the three admin consoles: hospitals
//! address ambulance bookings, fire brigades address fire reports, police
//! stations address crime reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The emergency service a request is directed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Ambulance bookings, addressed by hospital admins.
    Ambulance,
    /// Fire incident reports, addressed by fire brigade admins.
    Fire,
    /// Crime reports, addressed by police station admins.
    Crime,
}

impl ServiceKind {
    /// All service kinds, in a fixed order.
    pub const ALL: [Self; 3] = [Self::Ambulance, Self::Fire, Self::Crime];

    /// Returns the lowercase wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ambulance => "ambulance",
            Self::Fire => "fire",
            Self::Crime => "crime",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "ambulance" => Ok(Self::Ambulance),
            "fire" => Ok(Self::Fire),
            "crime" => Ok(Self::Crime),
            other => Err(Error::validation(format!(
                "unknown service kind '{other}' (expected ambulance, fire, or crime)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in ServiceKind::ALL {
            let parsed: ServiceKind = kind.as_str().parse().expect("parse");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("police".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&ServiceKind::Fire).expect("serialize");
        assert_eq!(json, "\"fire\"");
    }
}
