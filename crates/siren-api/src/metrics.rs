//! Metrics counters for the API surface.
//!
//! Thin wrappers so call sites stay one line and label names stay uniform.

use siren_core::service::ServiceKind;

/// Records a created request.
pub fn record_request_created(kind: ServiceKind, guest: bool) {
    metrics::counter!(
        "siren_requests_created_total",
        "service" => kind.as_str(),
        "identity" => if guest { "guest" } else { "account" }
    )
    .increment(1);
}

/// Records a status transition (or its rejection).
pub fn record_status_transition(kind: ServiceKind, transition: &'static str, outcome: &'static str) {
    metrics::counter!(
        "siren_status_transitions_total",
        "service" => kind.as_str(),
        "transition" => transition,
        "outcome" => outcome
    )
    .increment(1);
}

/// Records an assist reply, noting whether the upstream produced it.
pub fn record_assist_reply(fallback: bool) {
    metrics::counter!(
        "siren_assist_replies_total",
        "source" => if fallback { "fallback" } else { "upstream" }
    )
    .increment(1);
}
