//! API server implementation.
//!
//! Wires the injected backend into the dispatch components, composes the
//! router, and serves it. This layer holds no domain policy: everything it
//! does is delegation into `siren-dispatch`, `siren-geo`, and
//! `siren-assist`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use siren_assist::{AssistService, CompletionClient, CompletionConfig, KnowledgeBase};
use siren_core::error::{Error, Result};
use siren_core::keys;
use siren_core::storage::{DocumentBackend, MemoryBackend};
use siren_dispatch::{
    AccountDirectory, Dispatcher, GuestCounter, IdentityResolver, MemorySessions, RequestStore,
    SessionProvider,
};
use siren_geo::Geocoder;

use crate::config::Config;
use crate::routes;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    backend: Arc<dyn DocumentBackend>,
    store: Arc<RequestStore>,
    dispatcher: Arc<Dispatcher>,
    accounts: Arc<AccountDirectory>,
    sessions: Arc<MemorySessions>,
    identity: IdentityResolver,
    geocoder: Arc<Geocoder>,
    assist: Arc<AssistService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("backend", &"<DocumentBackend>")
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates application state over the given backend.
    ///
    /// # Errors
    ///
    /// Returns an error when a configured knowledge base file is unreadable
    /// or an upstream client cannot be constructed.
    pub fn new(config: Config, backend: Arc<dyn DocumentBackend>) -> Result<Self> {
        let store = Arc::new(RequestStore::new(Arc::clone(&backend)));
        let counter = GuestCounter::new(Arc::clone(&backend));
        let sessions = Arc::new(MemorySessions::new());
        let identity =
            IdentityResolver::new(Arc::clone(&sessions) as Arc<dyn SessionProvider>);
        let accounts = Arc::new(AccountDirectory::new(Arc::clone(&backend)));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            counter,
            identity.clone(),
            Arc::clone(&accounts),
        ));

        let geocoder = Arc::new(Geocoder::new(
            config.geo_base_url.clone(),
            siren_geo::DEFAULT_TIMEOUT,
        )?);

        let knowledge = match &config.knowledge_path {
            Some(path) => KnowledgeBase::from_path(path).map_err(|e| {
                Error::validation(format!("knowledge base at {}: {e}", path.display()))
            })?,
            None => KnowledgeBase::builtin()
                .map_err(|e| Error::internal(format!("embedded knowledge base: {e}")))?,
        };
        let completion = CompletionClient::new(CompletionConfig {
            api_url: config.assist.api_url.clone(),
            api_key: config.assist.api_key.clone(),
            model: config.assist.model.clone(),
            max_tokens: config.assist.max_tokens,
            timeout: siren_assist::client::DEFAULT_TIMEOUT,
        })
        .map_err(|e| Error::internal(format!("completion client: {e}")))?;
        let assist = Arc::new(AssistService::new(knowledge, completion));

        Ok(Self {
            config,
            backend,
            store,
            dispatcher,
            accounts,
            sessions,
            identity,
            geocoder,
            assist,
        })
    }

    /// Creates application state with in-memory storage (for testing and
    /// debug deployments).
    pub fn with_memory_backend(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(MemoryBackend::new()))
    }

    /// The lifecycle controller.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The account directory.
    #[must_use]
    pub fn accounts(&self) -> &AccountDirectory {
        &self.accounts
    }

    /// The in-process session table.
    #[must_use]
    pub fn sessions(&self) -> &MemorySessions {
        &self.sessions
    }

    /// The identity resolver.
    #[must_use]
    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// The geocoding client.
    #[must_use]
    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// The assist service.
    #[must_use]
    pub fn assist(&self) -> &AssistService {
        &self.assist
    }

    /// The request store.
    #[must_use]
    pub fn store(&self) -> Arc<RequestStore> {
        Arc::clone(&self.store)
    }

    async fn backend_ready(&self) -> bool {
        self.backend
            .head(&keys::counter_key(siren_core::ServiceKind::Ambulance))
            .await
            .is_ok()
    }
}

// ============================================================================
// Server
// ============================================================================

/// The HTTP server.
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Creates a server over the given backend.
    pub fn new(config: Config, backend: Arc<dyn DocumentBackend>) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config, backend)?),
        })
    }

    /// Creates a server with in-memory storage.
    pub fn with_memory_backend(config: Config) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::with_memory_backend(config)?),
        })
    }

    /// Returns the composed router (also used by tests).
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Binds and serves until shutdown.
    pub async fn serve(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.port));
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::internal(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "siren-api listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::internal(format!("server error: {e}")))
    }
}

/// Composes the full router for the given state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = if state.config.debug {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .nest("/api/v1", routes::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
    }
}

/// Health check: the process is up.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check: the backend answers.
async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let ready = state.backend_ready().await;
    Json(ReadyResponse {
        ready,
        message: (!ready).then(|| "document backend unreachable".to_string()),
    })
}
