//! Strongly-typed identifiers for Siren entities.
//!
//! All identifiers are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! Guest identities are the one exception: they are allocated from a
//! transactional counter and live in `siren-dispatch`, not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a new unique identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new())
            }

            /// Creates an identifier from a raw ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the creation timestamp encoded in the ID.
            #[must_use]
            pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                let ms = self.0.timestamp_ms();
                chrono::DateTime::from_timestamp_millis(ms as i64)
                    .unwrap_or_else(chrono::Utc::now)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Ulid::from_string(s).map(Self).map_err(|e| Error::InvalidId {
                    message: format!(concat!("invalid ", $label, " ID '{}': {}"), s, e),
                })
            }
        }
    };
}

define_id!(
    /// A unique identifier for a request document.
    ///
    /// One request is created per reporting action; the ULID's embedded
    /// timestamp gives a stable tie-break when sorting histories.
    RequestId,
    "request"
);

define_id!(
    /// A unique identifier for a registered account (user or admin).
    AccountId,
    "account"
);
