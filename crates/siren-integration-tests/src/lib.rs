//! Shared fixtures for the Siren integration tests.

use std::sync::Arc;

use siren_api::config::Config;
use siren_api::server::AppState;
use siren_core::storage::{DocumentBackend, MemoryBackend};
use siren_dispatch::{
    AccountDirectory, Dispatcher, GuestCounter, IdentityResolver, MemorySessions, RequestStore,
    SessionProvider,
};

/// A fully wired dispatch core over one shared memory backend.
pub struct DispatchFixture {
    /// The lifecycle controller under test.
    pub dispatcher: Dispatcher,
    /// Session table for signing test accounts in.
    pub sessions: Arc<MemorySessions>,
    /// Account directory sharing the same backend.
    pub accounts: Arc<AccountDirectory>,
    /// The shared backend itself.
    pub backend: Arc<dyn DocumentBackend>,
}

impl DispatchFixture {
    /// Builds the fixture the way the server entrypoint wires production:
    /// one injected backend, no ambient state.
    #[must_use]
    pub fn new() -> Self {
        let backend: Arc<dyn DocumentBackend> = Arc::new(MemoryBackend::new());
        let store = Arc::new(RequestStore::new(Arc::clone(&backend)));
        let counter = GuestCounter::new(Arc::clone(&backend));
        let sessions = Arc::new(MemorySessions::new());
        let identity = IdentityResolver::new(Arc::clone(&sessions) as Arc<dyn SessionProvider>);
        let accounts = Arc::new(AccountDirectory::new(Arc::clone(&backend)));
        let dispatcher = Dispatcher::new(store, counter, identity, Arc::clone(&accounts));

        Self {
            dispatcher,
            sessions,
            accounts,
            backend,
        }
    }
}

impl Default for DispatchFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state over a memory backend, with upstreams pointed at
/// closed ports so degradation paths run instead of network calls.
#[must_use]
pub fn offline_app_state() -> Arc<AppState> {
    let mut config = Config::default();
    config.geo_base_url = "http://127.0.0.1:1".to_string();
    config.assist.api_url = "http://127.0.0.1:1/chat/completions".to_string();
    Arc::new(AppState::with_memory_backend(config).expect("app state over memory backend"))
}
