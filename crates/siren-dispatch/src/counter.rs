//! Guest identity allocation.
//!
//! Unauthenticated reporters get a synthesized `guest_<n>` identity drawn
//! from a per-service-type counter record on the shared backend. Allocation
//! is an atomic read-modify-write: the counter is created with a
//! `DoesNotExist` precondition on first use, and every increment rewrites it
//! with a `MatchesVersion` precondition. A plain read-then-write would let
//! two concurrent reporters observe the same count and collide.
//!
//! Ids must be unique, not dense: an allocated value that goes unused
//! because a later store write failed is acceptable waste.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use siren_core::error::{Error, Result};
use siren_core::keys;
use siren_core::service::ServiceKind;
use siren_core::storage::{DocumentBackend, WritePrecondition, WriteResult};

use crate::request::RequesterId;

/// Default number of transaction attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Base backoff between contended attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(20);

/// Maximum backoff between contended attempts.
const BACKOFF_MAX: Duration = Duration::from_millis(500);

/// Persisted counter record. Created lazily, never reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CounterRecord {
    count: u64,
}

/// Allocator for guest identities.
#[derive(Clone)]
pub struct GuestCounter {
    backend: Arc<dyn DocumentBackend>,
    max_attempts: u32,
}

impl GuestCounter {
    /// Creates a counter over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt budget (mainly for tests).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Allocates the next guest identity for a service kind.
    ///
    /// Guarantees global uniqueness of the returned id under concurrent
    /// invocation for the same kind. Fails with
    /// [`Error::IdentityAllocation`] once the attempt budget is exhausted;
    /// the caller must not create a request without a resolved identity.
    pub async fn next_guest_id(&self, kind: ServiceKind) -> Result<RequesterId> {
        let key = keys::counter_key(kind);

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(backoff_for(attempt)).await;
            }

            let outcome = match self.backend.get(&key).await {
                Ok(doc) => {
                    let record: CounterRecord = serde_json::from_slice(&doc.data).map_err(|e| {
                        Error::identity_allocation(format!("counter record corrupt: {e}"))
                    })?;
                    let next = CounterRecord {
                        count: record.count + 1,
                    };
                    self.try_write(&key, next, WritePrecondition::MatchesVersion(doc.version))
                        .await
                }
                Err(Error::NotFound { .. }) => {
                    self.try_write(&key, CounterRecord { count: 1 }, WritePrecondition::DoesNotExist)
                        .await
                }
                Err(err) => Err(err),
            };

            match outcome {
                Ok(Some(count)) => {
                    return Ok(RequesterId::Guest(format!(
                        "{}{count}",
                        RequesterId::GUEST_PREFIX
                    )));
                }
                // Contention: another allocator committed first.
                Ok(None) => {
                    tracing::debug!(service = %kind, attempt, "guest counter contention, retrying");
                }
                Err(err @ Error::Storage { .. }) => {
                    tracing::warn!(service = %kind, attempt, error = %err, "guest counter backend failure, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(Error::identity_allocation(format!(
            "counter transaction for {kind} aborted after {} attempts",
            self.max_attempts
        )))
    }

    /// Attempts one conditional write; `Ok(Some(count))` on commit,
    /// `Ok(None)` on precondition failure.
    async fn try_write(
        &self,
        key: &str,
        record: CounterRecord,
        precondition: WritePrecondition,
    ) -> Result<Option<u64>> {
        let data = Bytes::from(serde_json::to_vec(&record)?);
        match self.backend.put(key, data, precondition).await? {
            WriteResult::Success { .. } => Ok(Some(record.count)),
            WriteResult::PreconditionFailed { .. } => Ok(None),
        }
    }
}

fn backoff_for(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1 << attempt.min(16));
    exp.min(BACKOFF_MAX)
}
