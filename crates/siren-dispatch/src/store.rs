//! The request store: per-service-type partitions with change signals.
//!
//! Each partition is an independent key namespace on the injected backend.
//! Every committed mutation bumps the partition's revision signal, which the
//! live views subscribe to; a subscription outliving the store simply ends.
//!
//! Status updates are conditional. The original portal overwrote the status
//! field unconditionally, which lets a late `address` clobber a `cancel`;
//! here every transition re-reads the document, runs the guard, and commits
//! with a `MatchesVersion` precondition, retrying when another writer
//! interleaves.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use siren_core::error::{Error, Result};
use siren_core::id::RequestId;
use siren_core::keys;
use siren_core::service::ServiceKind;
use siren_core::storage::{DocumentBackend, WritePrecondition, WriteResult};

use crate::request::{Request, StatusTransition, TransitionOutcome};

/// Attempts for a contended status update before reporting failure.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

/// Document collection for request partitions.
pub struct RequestStore {
    backend: Arc<dyn DocumentBackend>,
    signals: HashMap<ServiceKind, watch::Sender<u64>>,
}

impl RequestStore {
    /// Creates a store over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        let signals = ServiceKind::ALL
            .into_iter()
            .map(|kind| (kind, watch::channel(0).0))
            .collect();
        Self { backend, signals }
    }

    /// Inserts a new request document.
    ///
    /// The document becomes immediately visible to any active subscription
    /// on its partition.
    pub async fn create(&self, request: &Request) -> Result<()> {
        let kind = request.detail.kind();
        let key = keys::request_key(kind, request.id);
        let data = Bytes::from(serde_json::to_vec(request)?);

        match self
            .backend
            .put(&key, data, WritePrecondition::DoesNotExist)
            .await?
        {
            WriteResult::Success { .. } => {
                self.notify(kind);
                Ok(())
            }
            WriteResult::PreconditionFailed { .. } => Err(Error::storage(format!(
                "request {} already exists in the {kind} partition",
                request.id
            ))),
        }
    }

    /// Fetches a single request from a partition.
    pub async fn get(&self, kind: ServiceKind, id: RequestId) -> Result<Request> {
        let (request, _) = self.get_versioned(kind, id).await?;
        Ok(request)
    }

    /// Returns the full partition contents, unordered.
    ///
    /// Documents deleted between listing and fetching are skipped; documents
    /// that fail to parse are logged and skipped rather than poisoning the
    /// whole snapshot.
    pub async fn list(&self, kind: ServiceKind) -> Result<Vec<Request>> {
        let metas = self.backend.list(&keys::request_prefix(kind)).await?;
        let mut requests = Vec::with_capacity(metas.len());

        for meta in metas {
            match self.backend.get(&meta.key).await {
                Ok(doc) => match serde_json::from_slice::<Request>(&doc.data) {
                    Ok(request) => requests.push(request),
                    Err(err) => {
                        tracing::warn!(key = %meta.key, error = %err, "skipping unparseable request document");
                    }
                },
                Err(Error::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(requests)
    }

    /// Applies a guarded status transition to a request.
    ///
    /// Returns the resulting document. A transition whose target state
    /// already holds is a no-op that returns the document unchanged; a
    /// transition crossing terminal states fails with
    /// [`Error::InvalidTransition`]; an unknown id fails with
    /// [`Error::NotFound`] and creates nothing.
    pub async fn update_status(
        &self,
        kind: ServiceKind,
        id: RequestId,
        transition: StatusTransition,
    ) -> Result<Request> {
        let key = keys::request_key(kind, id);

        for _attempt in 0..MAX_UPDATE_ATTEMPTS {
            let (mut request, version) = self.get_versioned(kind, id).await?;

            match transition.evaluate(request.status) {
                TransitionOutcome::NoOp => return Ok(request),
                TransitionOutcome::Invalid => {
                    return Err(Error::invalid_transition(
                        request.status.as_str(),
                        transition.target().as_str(),
                    ));
                }
                TransitionOutcome::Apply(next) => {
                    request.status = next;
                    let data = Bytes::from(serde_json::to_vec(&request)?);
                    match self
                        .backend
                        .put(&key, data, WritePrecondition::MatchesVersion(version))
                        .await?
                    {
                        WriteResult::Success { .. } => {
                            self.notify(kind);
                            return Ok(request);
                        }
                        // Another writer interleaved; re-read and re-guard.
                        WriteResult::PreconditionFailed { .. } => {}
                    }
                }
            }
        }

        Err(Error::storage(format!(
            "status update for request {id} kept losing to concurrent writers"
        )))
    }

    /// Returns the change signal of a partition.
    ///
    /// The receiver resolves whenever any mutation commits in the partition.
    /// Dropping the receiver is the unsubscribe.
    #[must_use]
    pub fn changes(&self, kind: ServiceKind) -> watch::Receiver<u64> {
        self.signals[&kind].subscribe()
    }

    async fn get_versioned(&self, kind: ServiceKind, id: RequestId) -> Result<(Request, String)> {
        let key = keys::request_key(kind, id);
        let doc = match self.backend.get(&key).await {
            Ok(doc) => doc,
            Err(Error::NotFound { .. }) => return Err(Error::not_found("request", id)),
            Err(err) => return Err(err),
        };
        let request: Request = serde_json::from_slice(&doc.data)?;
        Ok((request, doc.version))
    }

    fn notify(&self, kind: ServiceKind) {
        self.signals[&kind].send_modify(|revision| *revision += 1);
    }
}
