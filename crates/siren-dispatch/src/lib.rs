//! # siren-dispatch
//!
//! The request lifecycle core of the Siren emergency-services portal:
//!
//! - **Request model**: documents, requester identities, the status state
//!   machine with guarded transitions
//! - **Request store**: per-service-type partitions with change signals
//! - **Guest counter**: atomic `guest_<n>` allocation for unauthenticated
//!   reporters
//! - **Identity**: session resolution and the in-process session table
//! - **Accounts**: the user/admin directory with institution bindings
//! - **Dispatcher**: the lifecycle controller enforcing authorization
//! - **Views**: push-based pending and history projections
//!
//! All state lives behind the injected [`DocumentBackend`]; nothing here
//! owns a connection or a singleton.
//!
//! [`DocumentBackend`]: siren_core::storage::DocumentBackend

pub mod account;
pub mod counter;
pub mod identity;
pub mod lifecycle;
pub mod request;
pub mod store;
pub mod views;

pub use account::{Account, AccountDirectory, InstituteKind, NewAccount, ProfileUpdate, Role};
pub use counter::GuestCounter;
pub use identity::{IdentityResolver, MemorySessions, SessionProvider};
pub use lifecycle::Dispatcher;
pub use request::{
    NewRequest, Request, RequestDetail, RequestStatus, RequesterId, StatusTransition,
};
pub use store::RequestStore;
pub use views::{HistoryView, PendingView};
