//! The request lifecycle controller.
//!
//! The dispatcher is the only writer of request status. It resolves the
//! reporter's identity (falling back to guest allocation), validates the
//! payload before any write, and enforces the authorization invariants the
//! store layer cannot see: only an institution-matching admin addresses a
//! request, only the original requester cancels one.

use chrono::Utc;
use std::sync::Arc;

use siren_core::error::{Error, Result};
use siren_core::id::RequestId;
use siren_core::service::ServiceKind;

use crate::account::{Account, AccountDirectory};
use crate::counter::GuestCounter;
use crate::identity::IdentityResolver;
use crate::request::{NewRequest, Request, RequesterId, StatusTransition};
use crate::store::RequestStore;
use crate::views::{HistoryView, PendingView};

/// Display name used when neither the account nor the payload names the
/// reporter.
const DEFAULT_USER_NAME: &str = "User";

/// Coordinates identity resolution, validation, and status transitions.
pub struct Dispatcher {
    store: Arc<RequestStore>,
    counter: GuestCounter,
    identity: IdentityResolver,
    accounts: Arc<AccountDirectory>,
}

impl Dispatcher {
    /// Wires the controller from its injected collaborators.
    #[must_use]
    pub fn new(
        store: Arc<RequestStore>,
        counter: GuestCounter,
        identity: IdentityResolver,
        accounts: Arc<AccountDirectory>,
    ) -> Self {
        Self {
            store,
            counter,
            identity,
            accounts,
        }
    }

    /// Returns the underlying store handle.
    #[must_use]
    pub fn store(&self) -> Arc<RequestStore> {
        Arc::clone(&self.store)
    }

    /// Creates a request, resolving the reporter's identity first.
    ///
    /// Exactly one document is created per call, always `pending`. Identity
    /// allocation failure and store-write failure both surface as retryable
    /// errors with no partial state: a guest id allocated for a write that
    /// then fails is simply never used.
    pub async fn create_request(
        &self,
        kind: ServiceKind,
        session_token: Option<&str>,
        payload: NewRequest,
    ) -> Result<Request> {
        payload.validate(kind)?;

        let (uid, user_name) = match self.identity.resolve(session_token).await {
            Some(account_id) => {
                let name = match self.accounts.get(account_id).await {
                    Ok(account) => account.name,
                    // The session outlived the account record; keep the
                    // reporter's own name rather than failing the report.
                    Err(Error::NotFound { .. }) => payload
                        .user_name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
                    Err(err) => return Err(err),
                };
                (RequesterId::Account(account_id), name)
            }
            None => {
                let guest = self.counter.next_guest_id(kind).await?;
                let name = payload
                    .user_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
                (guest, name)
            }
        };

        let request = Request {
            id: RequestId::generate(),
            is_guest: uid.is_guest(),
            uid,
            user_name,
            location: payload.location,
            latitude: payload.latitude,
            longitude: payload.longitude,
            detail: payload.detail,
            created_at: Some(Utc::now()),
            status: crate::request::RequestStatus::Pending,
        };

        self.store.create(&request).await?;
        tracing::info!(
            service = %kind,
            request = %request.id,
            guest = request.is_guest,
            "request created"
        );
        Ok(request)
    }

    /// Marks a pending request as addressed.
    ///
    /// Only an admin whose institution type matches the partition may call
    /// this; a repeat call is a guarded no-op.
    pub async fn address(
        &self,
        kind: ServiceKind,
        id: RequestId,
        admin: &Account,
    ) -> Result<Request> {
        if !admin.is_admin() {
            return Err(Error::forbidden("only admin accounts address requests"));
        }
        if !admin.may_address(kind) {
            return Err(Error::forbidden(format!(
                "institution type does not operate on the {kind} partition"
            )));
        }

        let updated = self
            .store
            .update_status(kind, id, StatusTransition::Address)
            .await?;
        tracing::info!(service = %kind, request = %id, admin = %admin.id, "request addressed");
        Ok(updated)
    }

    /// Cancels a pending request on behalf of its original reporter.
    pub async fn cancel(
        &self,
        kind: ServiceKind,
        id: RequestId,
        requester: &RequesterId,
    ) -> Result<Request> {
        let current = self.store.get(kind, id).await?;
        if &current.uid != requester {
            return Err(Error::forbidden(
                "only the original requester may cancel a request",
            ));
        }

        let updated = self
            .store
            .update_status(kind, id, StatusTransition::Cancel)
            .await?;
        tracing::info!(service = %kind, request = %id, "request cancelled");
        Ok(updated)
    }

    /// Subscribes to the pending (triage) view of a partition.
    #[must_use]
    pub fn pending_view(&self, kind: ServiceKind) -> PendingView {
        PendingView::subscribe(Arc::clone(&self.store), kind)
    }

    /// Subscribes to the full history view of a partition.
    #[must_use]
    pub fn history_view(&self, kind: ServiceKind) -> HistoryView {
        HistoryView::subscribe(Arc::clone(&self.store), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{InstituteKind, NewAccount, ProfileUpdate, Role};
    use crate::identity::MemorySessions;
    use crate::request::{RequestDetail, RequestStatus};
    use siren_core::storage::MemoryBackend;

    struct Fixture {
        dispatcher: Dispatcher,
        sessions: Arc<MemorySessions>,
        accounts: Arc<AccountDirectory>,
    }

    fn fixture() -> Fixture {
        let backend: Arc<MemoryBackend> = Arc::new(MemoryBackend::new());
        let backend: Arc<dyn siren_core::storage::DocumentBackend> = backend;
        let store = Arc::new(RequestStore::new(Arc::clone(&backend)));
        let counter = GuestCounter::new(Arc::clone(&backend));
        let sessions = Arc::new(MemorySessions::new());
        let identity = IdentityResolver::new(
            Arc::clone(&sessions) as Arc<dyn crate::identity::SessionProvider>
        );
        let accounts = Arc::new(AccountDirectory::new(backend));
        Fixture {
            dispatcher: Dispatcher::new(store, counter, identity, Arc::clone(&accounts)),
            sessions,
            accounts,
        }
    }

    fn ambulance_payload() -> NewRequest {
        NewRequest {
            user_name: None,
            location: "12.9, 77.6".into(),
            latitude: Some(12.9),
            longitude: Some(77.6),
            detail: RequestDetail::Ambulance {
                hospital: "City Hospital".into(),
            },
        }
    }

    async fn hospital_admin(fixture: &Fixture) -> Account {
        let account = fixture
            .accounts
            .create(NewAccount {
                name: "Asha Rao".into(),
                email: "asha@cityhospital.example".into(),
                phone: None,
                role: Role::Admin,
                agreed_to_offers: false,
            })
            .await
            .expect("create admin");
        fixture
            .accounts
            .update_profile(
                account.id,
                ProfileUpdate {
                    institution: Some("City Hospital".into()),
                    institute_type: Some(InstituteKind::Hospital),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .expect("bind institution")
    }

    #[tokio::test]
    async fn guest_reports_get_sequential_identities() {
        let fixture = fixture();

        let first = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("first");
        let second = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("second");

        assert_eq!(first.uid.to_string(), "guest_1");
        assert_eq!(second.uid.to_string(), "guest_2");
        assert!(first.is_guest && second.is_guest);
        assert_eq!(first.status, RequestStatus::Pending);
        assert_eq!(second.status, RequestStatus::Pending);
        assert_eq!(first.user_name, "User");
    }

    #[tokio::test]
    async fn signed_in_reports_carry_the_account_identity() {
        let fixture = fixture();
        let account = fixture
            .accounts
            .create(NewAccount {
                name: "Ravi".into(),
                email: "ravi@example.com".into(),
                phone: None,
                role: Role::User,
                agreed_to_offers: true,
            })
            .await
            .expect("create");
        let token = fixture.sessions.sign_in(account.id);

        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, Some(&token), ambulance_payload())
            .await
            .expect("create request");

        assert_eq!(request.uid, RequesterId::Account(account.id));
        assert!(!request.is_guest);
        assert_eq!(request.user_name, "Ravi");
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn invalid_payload_allocates_nothing() {
        let fixture = fixture();
        let mut payload = ambulance_payload();
        payload.location = String::new();

        let err = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, payload)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        // The rejected report consumed no guest id.
        let next = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("create");
        assert_eq!(next.uid.to_string(), "guest_1");
    }

    #[tokio::test]
    async fn matching_admin_addresses_a_pending_request() {
        let fixture = fixture();
        let admin = hospital_admin(&fixture).await;
        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("create");

        let updated = fixture
            .dispatcher
            .address(ServiceKind::Ambulance, request.id, &admin)
            .await
            .expect("address");
        assert_eq!(updated.status, RequestStatus::Addressed);

        // Second address leaves the status untouched.
        let again = fixture
            .dispatcher
            .address(ServiceKind::Ambulance, request.id, &admin)
            .await
            .expect("address again");
        assert_eq!(again.status, RequestStatus::Addressed);
    }

    #[tokio::test]
    async fn mismatched_institution_is_forbidden() {
        let fixture = fixture();
        let admin = hospital_admin(&fixture).await;
        let payload = NewRequest {
            user_name: None,
            location: "18.5, 73.8".into(),
            latitude: None,
            longitude: None,
            detail: RequestDetail::Fire {
                fire_station: "City Fire Brigade".into(),
                fire_type: "Building Fire".into(),
            },
        };
        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Fire, None, payload)
            .await
            .expect("create");

        let err = fixture
            .dispatcher
            .address(ServiceKind::Fire, request.id, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[tokio::test]
    async fn non_owner_cancel_is_rejected() {
        let fixture = fixture();
        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("create");

        let stranger = RequesterId::Guest("guest_999".into());
        let err = fixture
            .dispatcher
            .cancel(ServiceKind::Ambulance, request.id, &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        let owner = request.uid.clone();
        let cancelled = fixture
            .dispatcher
            .cancel(ServiceKind::Ambulance, request.id, &owner)
            .await
            .expect("cancel");
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn address_after_cancel_is_invalid() {
        let fixture = fixture();
        let admin = hospital_admin(&fixture).await;
        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("create");
        fixture
            .dispatcher
            .cancel(ServiceKind::Ambulance, request.id, &request.uid)
            .await
            .expect("cancel");

        let err = fixture
            .dispatcher
            .address(ServiceKind::Ambulance, request.id, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn addressed_request_moves_between_views() {
        let fixture = fixture();
        let admin = hospital_admin(&fixture).await;
        let mut pending = fixture.dispatcher.pending_view(ServiceKind::Ambulance);

        let request = fixture
            .dispatcher
            .create_request(ServiceKind::Ambulance, None, ambulance_payload())
            .await
            .expect("create");
        assert_eq!(pending.next().await.expect("emission").len(), 1);

        fixture
            .dispatcher
            .address(ServiceKind::Ambulance, request.id, &admin)
            .await
            .expect("address");
        assert!(pending.next().await.expect("emission").is_empty());

        let history = fixture
            .dispatcher
            .history_view(ServiceKind::Ambulance)
            .snapshot()
            .await
            .expect("history");
        assert_eq!(history[0].status, RequestStatus::Addressed);
    }
}
