//! Request documents and their status state machine.
//!
//! One request document is created per reporting action. The persisted JSON
//! keeps the portal's historical field names (`uid`, `userName`, `hospital`,
//! `fireStation`, `fireType`, `policeStation`, `crimeType`, `isGuest`) so
//! existing partitions stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use siren_core::error::{Error, Result};
use siren_core::id::{AccountId, RequestId};
use siren_core::service::ServiceKind;

/// Status of a request document.
///
/// Transitions are monotonic and one-directional: `pending -> addressed`
/// (admin flow) or `pending -> cancelled` (requester flow). Both terminal
/// states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Initial state, visible to the admin triage view.
    Pending,
    /// Terminal state for the admin flow.
    Addressed,
    /// Terminal state for the requester flow.
    Cancelled,
}

impl RequestStatus {
    /// Returns the lowercase wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Addressed => "addressed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a request was reported under.
///
/// Either a registered account or a synthesized guest identity of the form
/// `guest_<n>`, where `n` comes from the per-service-type counter.
/// Serialized as one opaque string field (`uid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequesterId {
    /// A registered account.
    Account(AccountId),
    /// A synthesized guest identity (`guest_<n>`).
    Guest(String),
}

impl RequesterId {
    /// Prefix shared by all guest identities.
    pub const GUEST_PREFIX: &'static str = "guest_";

    /// Returns true for guest identities.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "{id}"),
            Self::Guest(id) => f.write_str(id),
        }
    }
}

impl FromStr for RequesterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with(Self::GUEST_PREFIX) {
            return Ok(Self::Guest(s.to_string()));
        }
        s.parse::<AccountId>().map(Self::Account)
    }
}

impl Serialize for RequesterId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequesterId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Service-specific target and category fields.
///
/// The variant is implied by the partition a document lives in; the wire
/// form is the flattened per-kind fields of the original collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestDetail {
    /// Fire incident report: receiving station and incident type.
    #[serde(rename_all = "camelCase")]
    Fire {
        /// Nearest (or manually entered) fire station.
        fire_station: String,
        /// Fire incident type, e.g. "Building Fire".
        fire_type: String,
    },
    /// Crime report: receiving police station and crime type.
    #[serde(rename_all = "camelCase")]
    Crime {
        /// Nearest (or manually entered) police station.
        police_station: String,
        /// Crime type, e.g. "Theft".
        crime_type: String,
    },
    /// Ambulance booking: destination hospital.
    #[serde(rename_all = "camelCase")]
    Ambulance {
        /// Selected hospital.
        hospital: String,
    },
}

impl RequestDetail {
    /// Returns the service kind this detail belongs to.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        match self {
            Self::Ambulance { .. } => ServiceKind::Ambulance,
            Self::Fire { .. } => ServiceKind::Fire,
            Self::Crime { .. } => ServiceKind::Crime,
        }
    }

    /// Returns the target institution name.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Ambulance { hospital } => hospital,
            Self::Fire { fire_station, .. } => fire_station,
            Self::Crime { police_station, .. } => police_station,
        }
    }

    /// Returns the service-specific category, where the kind has one.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Ambulance { .. } => None,
            Self::Fire { fire_type, .. } => Some(fire_type),
            Self::Crime { crime_type, .. } => Some(crime_type),
        }
    }
}

/// A single reported incident or service booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Document id, unique within the partition.
    pub id: RequestId,
    /// Reporting identity (account id or guest id).
    pub uid: RequesterId,
    /// Display name shown to admins.
    pub user_name: String,
    /// Free-text or reverse-geocoded location string.
    pub location: String,
    /// Raw latitude, when the reporter shared coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Raw longitude, when the reporter shared coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Service-specific target and category fields, flattened.
    #[serde(flatten)]
    pub detail: RequestDetail,
    /// Creation timestamp. Absent only on malformed historical records,
    /// which the history view sorts last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// True when the reporter was unauthenticated.
    #[serde(default)]
    pub is_guest: bool,
}

impl Request {
    /// Returns the timestamp used for ordering, treating a missing value as
    /// the epoch so malformed records sort last in a newest-first list.
    #[must_use]
    pub fn sort_timestamp(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Reporter-supplied fields of a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    /// Display name for guests; registered reporters use their account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Free-text or reverse-geocoded location string.
    pub location: String,
    /// Raw latitude, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Raw longitude, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Service-specific target and category fields, flattened.
    #[serde(flatten)]
    pub detail: RequestDetail,
}

impl NewRequest {
    /// Validates the mandatory fields against the target partition.
    ///
    /// Runs before any identity allocation or write, so a rejected payload
    /// leaves no state behind.
    pub fn validate(&self, kind: ServiceKind) -> Result<()> {
        if self.detail.kind() != kind {
            return Err(Error::validation(format!(
                "payload carries {} fields but targets the {kind} partition",
                self.detail.kind()
            )));
        }
        if self.location.trim().is_empty() {
            return Err(Error::validation("location must not be empty"));
        }
        if self.detail.target().trim().is_empty() {
            return Err(Error::validation(target_field_hint(kind)));
        }
        if let Some(category) = self.detail.category() {
            if category.trim().is_empty() {
                return Err(Error::validation(category_field_hint(kind)));
            }
        }
        Ok(())
    }
}

const fn target_field_hint(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Ambulance => "hospital must not be empty",
        ServiceKind::Fire => "fireStation must not be empty",
        ServiceKind::Crime => "policeStation must not be empty",
    }
}

const fn category_field_hint(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Ambulance => "category must not be empty",
        ServiceKind::Fire => "fireType must not be empty",
        ServiceKind::Crime => "crimeType must not be empty",
    }
}

// ============================================================================
// Status transitions
// ============================================================================

/// An operator-initiated status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// Admin marks the request as handled.
    Address,
    /// The original requester withdraws the request.
    Cancel,
}

impl StatusTransition {
    /// The status this transition moves a request into.
    #[must_use]
    pub const fn target(self) -> RequestStatus {
        match self {
            Self::Address => RequestStatus::Addressed,
            Self::Cancel => RequestStatus::Cancelled,
        }
    }

    /// Evaluates the transition guard against the current status.
    ///
    /// Re-applying a transition that already took effect is a no-op, not an
    /// error, so a double click on "Address" cannot corrupt state. Crossing
    /// terminal states (`cancel` after `address` or vice versa) is invalid.
    #[must_use]
    pub fn evaluate(self, current: RequestStatus) -> TransitionOutcome {
        if current == self.target() {
            return TransitionOutcome::NoOp;
        }
        match current {
            RequestStatus::Pending => TransitionOutcome::Apply(self.target()),
            RequestStatus::Addressed | RequestStatus::Cancelled => TransitionOutcome::Invalid,
        }
    }
}

/// Result of evaluating a [`StatusTransition`] guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Write the new status.
    Apply(RequestStatus),
    /// Already in the target state; nothing to write.
    NoOp,
    /// The transition would cross terminal states.
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambulance_request() -> Request {
        Request {
            id: RequestId::generate(),
            uid: RequesterId::Guest("guest_1".into()),
            user_name: "User".into(),
            location: "Mumbai, Maharashtra".into(),
            latitude: Some(19.076),
            longitude: Some(72.8777),
            detail: RequestDetail::Ambulance {
                hospital: "City Hospital".into(),
            },
            created_at: Some(Utc::now()),
            status: RequestStatus::Pending,
            is_guest: true,
        }
    }

    #[test]
    fn address_only_applies_from_pending() {
        assert_eq!(
            StatusTransition::Address.evaluate(RequestStatus::Pending),
            TransitionOutcome::Apply(RequestStatus::Addressed)
        );
        assert_eq!(
            StatusTransition::Address.evaluate(RequestStatus::Addressed),
            TransitionOutcome::NoOp
        );
        assert_eq!(
            StatusTransition::Address.evaluate(RequestStatus::Cancelled),
            TransitionOutcome::Invalid
        );
    }

    #[test]
    fn cancel_only_applies_from_pending() {
        assert_eq!(
            StatusTransition::Cancel.evaluate(RequestStatus::Pending),
            TransitionOutcome::Apply(RequestStatus::Cancelled)
        );
        assert_eq!(
            StatusTransition::Cancel.evaluate(RequestStatus::Cancelled),
            TransitionOutcome::NoOp
        );
        assert_eq!(
            StatusTransition::Cancel.evaluate(RequestStatus::Addressed),
            TransitionOutcome::Invalid
        );
    }

    #[test]
    fn wire_format_keeps_historical_field_names() {
        let request = ambulance_request();
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["uid"], "guest_1");
        assert_eq!(value["userName"], "User");
        assert_eq!(value["hospital"], "City Hospital");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["isGuest"], true);
        assert!(value.get("fireStation").is_none());
    }

    #[test]
    fn fire_detail_round_trips() {
        let detail = RequestDetail::Fire {
            fire_station: "City Fire Brigade".into(),
            fire_type: "Building Fire".into(),
        };
        let json = serde_json::to_string(&detail).expect("serialize");
        assert!(json.contains("fireStation"));
        let back: RequestDetail = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, detail);
    }

    #[test]
    fn missing_timestamp_sorts_as_epoch() {
        let mut request = ambulance_request();
        request.created_at = None;
        assert_eq!(request.sort_timestamp(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn requester_id_round_trips_both_forms() {
        let guest: RequesterId = "guest_42".parse().expect("guest");
        assert!(guest.is_guest());
        assert_eq!(guest.to_string(), "guest_42");

        let account_id = AccountId::generate();
        let account: RequesterId = account_id.to_string().parse().expect("account");
        assert_eq!(account, RequesterId::Account(account_id));
        assert!(!account.is_guest());
    }

    #[test]
    fn validate_rejects_blank_mandatory_fields() {
        let mut payload = NewRequest {
            user_name: None,
            location: "  ".into(),
            latitude: None,
            longitude: None,
            detail: RequestDetail::Crime {
                police_station: "Central Station".into(),
                crime_type: "Theft".into(),
            },
        };
        assert!(payload.validate(ServiceKind::Crime).is_err());

        payload.location = "12.9, 77.6".into();
        payload.detail = RequestDetail::Crime {
            police_station: String::new(),
            crime_type: "Theft".into(),
        };
        assert!(payload.validate(ServiceKind::Crime).is_err());

        payload.detail = RequestDetail::Crime {
            police_station: "Central Station".into(),
            crime_type: " ".into(),
        };
        assert!(payload.validate(ServiceKind::Crime).is_err());
    }

    #[test]
    fn validate_rejects_cross_partition_payload() {
        let payload = NewRequest {
            user_name: None,
            location: "12.9, 77.6".into(),
            latitude: None,
            longitude: None,
            detail: RequestDetail::Ambulance {
                hospital: "City Hospital".into(),
            },
        };
        let err = payload.validate(ServiceKind::Fire).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(payload.validate(ServiceKind::Ambulance).is_ok());
    }
}
