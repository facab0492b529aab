//! Document key layout for the shared backend.
//!
//! Every partition gets its own key namespace: request documents never share
//! a prefix across service kinds, so the three admin consoles operate on
//! truly independent collections.
//!
//! ```text
//! requests/{kind}/{request_id}.json    one document per reporting action
//! counters/{kind}.json                 guest counter record, created lazily
//! accounts/{account_id}.json           one document per registered account
//! ```

use crate::id::{AccountId, RequestId};
use crate::service::ServiceKind;

/// Returns the key of a single request document.
#[must_use]
pub fn request_key(kind: ServiceKind, id: RequestId) -> String {
    format!("requests/{kind}/{id}.json")
}

/// Returns the listing prefix of a request partition.
#[must_use]
pub fn request_prefix(kind: ServiceKind) -> String {
    format!("requests/{kind}/")
}

/// Returns the key of the guest counter record for a service kind.
#[must_use]
pub fn counter_key(kind: ServiceKind) -> String {
    format!("counters/{kind}.json")
}

/// Returns the key of an account document.
#[must_use]
pub fn account_key(id: AccountId) -> String {
    format!("accounts/{id}.json")
}

/// Returns the listing prefix of the account collection.
#[must_use]
pub const fn account_prefix() -> &'static str {
    "accounts/"
}
