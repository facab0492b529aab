//! Live query views over the request store.
//!
//! Both views are push-based: each emission is the full current result set,
//! an authoritative replacement of whatever the consumer held before, never
//! an incremental diff. Rapid successive mutations may coalesce into one
//! emission; the snapshot delivered is always current at read time.
//!
//! A view keeps the store alive through its own handle and owns its change
//! subscription outright. Dropping the view is the unsubscribe; no callbacks
//! outlive the observing context.

use std::sync::Arc;
use tokio::sync::watch;

use siren_core::error::Result;
use siren_core::service::ServiceKind;

use crate::request::{Request, RequestStatus};
use crate::store::RequestStore;

/// Admin-facing projection of a partition: pending requests only,
/// newest first.
pub struct PendingView {
    store: Arc<RequestStore>,
    kind: ServiceKind,
    changes: watch::Receiver<u64>,
}

impl PendingView {
    /// Subscribes to a partition's pending requests.
    ///
    /// The first call to [`next`](Self::next) resolves immediately with the
    /// current result set.
    #[must_use]
    pub fn subscribe(store: Arc<RequestStore>, kind: ServiceKind) -> Self {
        let mut changes = store.changes(kind);
        changes.mark_changed();
        Self {
            store,
            kind,
            changes,
        }
    }

    /// Waits for the next emission: the full, freshly-read result set.
    pub async fn next(&mut self) -> Result<Vec<Request>> {
        // Cannot close: this view holds the store (and with it the sender).
        let _ = self.changes.changed().await;
        self.snapshot().await
    }

    /// Reads the current result set without waiting for a change.
    pub async fn snapshot(&self) -> Result<Vec<Request>> {
        let mut items = self.store.list(self.kind).await?;
        items.retain(|request| request.status == RequestStatus::Pending);
        sort_newest_first(&mut items);
        Ok(items)
    }
}

/// Chronological projection of a whole partition, newest first.
///
/// Items with no creation timestamp sort after all timestamped items.
pub struct HistoryView {
    store: Arc<RequestStore>,
    kind: ServiceKind,
    changes: watch::Receiver<u64>,
}

impl HistoryView {
    /// Subscribes to a partition's full history.
    #[must_use]
    pub fn subscribe(store: Arc<RequestStore>, kind: ServiceKind) -> Self {
        let mut changes = store.changes(kind);
        changes.mark_changed();
        Self {
            store,
            kind,
            changes,
        }
    }

    /// Waits for the next emission: the full, freshly-read result set.
    pub async fn next(&mut self) -> Result<Vec<Request>> {
        let _ = self.changes.changed().await;
        self.snapshot().await
    }

    /// Reads the current result set without waiting for a change.
    pub async fn snapshot(&self) -> Result<Vec<Request>> {
        let mut items = self.store.list(self.kind).await?;
        sort_newest_first(&mut items);
        Ok(items)
    }
}

/// Sorts newest first by creation timestamp, treating a missing timestamp as
/// the epoch. Request ids break ties so the order is stable across reads.
fn sort_newest_first(items: &mut [Request]) {
    items.sort_by(|a, b| {
        b.sort_timestamp()
            .cmp(&a.sort_timestamp())
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestDetail, RequesterId, StatusTransition};
    use chrono::{Duration, Utc};
    use siren_core::id::RequestId;
    use siren_core::storage::MemoryBackend;

    fn request_at(minutes_ago: i64) -> Request {
        Request {
            id: RequestId::generate(),
            uid: RequesterId::Guest("guest_1".into()),
            user_name: "User".into(),
            location: "Nagpur, Maharashtra".into(),
            latitude: None,
            longitude: None,
            detail: RequestDetail::Crime {
                police_station: "Central Station".into(),
                crime_type: "Theft".into(),
            },
            created_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
            status: RequestStatus::Pending,
            is_guest: true,
        }
    }

    #[tokio::test]
    async fn pending_view_emits_initial_snapshot() {
        let store = Arc::new(RequestStore::new(Arc::new(MemoryBackend::new())));
        let request = request_at(0);
        store.create(&request).await.expect("create");

        let mut view = PendingView::subscribe(Arc::clone(&store), ServiceKind::Crime);
        let emission = view.next().await.expect("read");
        assert_eq!(emission.len(), 1);
        assert_eq!(emission[0].id, request.id);
    }

    #[tokio::test]
    async fn addressed_request_leaves_the_pending_view() {
        let store = Arc::new(RequestStore::new(Arc::new(MemoryBackend::new())));
        let request = request_at(0);
        store.create(&request).await.expect("create");

        let mut view = PendingView::subscribe(Arc::clone(&store), ServiceKind::Crime);
        assert_eq!(view.next().await.expect("read").len(), 1);

        store
            .update_status(ServiceKind::Crime, request.id, StatusTransition::Address)
            .await
            .expect("address");

        let emission = view.next().await.expect("read");
        assert!(emission.is_empty());

        // The history view still sees it, now addressed.
        let history = HistoryView::subscribe(Arc::clone(&store), ServiceKind::Crime)
            .snapshot()
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RequestStatus::Addressed);
    }

    #[tokio::test]
    async fn history_sorts_newest_first_with_malformed_last() {
        let store = Arc::new(RequestStore::new(Arc::new(MemoryBackend::new())));
        let oldest = request_at(30);
        let newest = request_at(1);
        let mut undated = request_at(0);
        undated.created_at = None;

        for request in [&oldest, &undated, &newest] {
            store.create(request).await.expect("create");
        }

        let history = HistoryView::subscribe(Arc::clone(&store), ServiceKind::Crime)
            .snapshot()
            .await
            .expect("history");
        let ids: Vec<_> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest.id, oldest.id, undated.id]);
    }

    #[tokio::test]
    async fn views_are_partition_scoped() {
        let store = Arc::new(RequestStore::new(Arc::new(MemoryBackend::new())));
        let crime = request_at(0);
        store.create(&crime).await.expect("create");

        let fire_pending = PendingView::subscribe(Arc::clone(&store), ServiceKind::Fire)
            .snapshot()
            .await
            .expect("snapshot");
        assert!(fire_pending.is_empty());
    }

    #[tokio::test]
    async fn cancelled_requests_stay_in_history_only() {
        let store = Arc::new(RequestStore::new(Arc::new(MemoryBackend::new())));
        let request = request_at(0);
        store.create(&request).await.expect("create");
        store
            .update_status(ServiceKind::Crime, request.id, StatusTransition::Cancel)
            .await
            .expect("cancel");

        let pending = PendingView::subscribe(Arc::clone(&store), ServiceKind::Crime)
            .snapshot()
            .await
            .expect("pending");
        assert!(pending.is_empty());

        let history = HistoryView::subscribe(store, ServiceKind::Crime)
            .snapshot()
            .await
            .expect("history");
        assert_eq!(history[0].status, RequestStatus::Cancelled);
    }
}
