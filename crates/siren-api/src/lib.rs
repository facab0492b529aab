//! # siren-api
//!
//! HTTP composition layer for the Siren emergency-services portal.
//!
//! This crate provides the API surface, handling:
//!
//! - **Authentication**: bearer-token session resolution
//! - **Routing**: accounts, request lifecycle, assist, geocoding proxies
//! - **Service wiring**: composition of the dispatch, geo, and assist crates
//! - **Observability**: tracing, metrics, health checks, `OpenAPI` docs
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! All lifecycle logic lives in `siren-dispatch`.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                                   - Health check
//! GET  /ready                                    - Readiness check
//! POST /api/v1/accounts                          - Sign up
//! GET  /api/v1/accounts/me                       - Profile
//! PUT  /api/v1/accounts/me                       - Profile update
//! POST /api/v1/sessions                          - Sign in
//! DELETE /api/v1/sessions/current                - Sign out
//! POST /api/v1/services/{kind}/requests          - Report / book
//! GET  /api/v1/services/{kind}/requests/{id}     - Fetch one request
//! GET  /api/v1/services/{kind}/requests/pending  - Admin triage snapshot
//! GET  /api/v1/services/{kind}/requests/history  - Admin history snapshot
//! POST /api/v1/services/{kind}/requests/{id}/address - Address (admin)
//! POST /api/v1/services/{kind}/requests/{id}/cancel  - Cancel (reporter)
//! POST /api/v1/assist                            - Emergency Q&A
//! GET  /api/v1/geo/reverse                       - Reverse geocode
//! GET  /api/v1/geo/institutions                  - Institution search
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, Server};
