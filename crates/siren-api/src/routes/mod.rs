//! HTTP route handlers.

pub mod accounts;
pub mod assist;
pub mod geo;
pub mod requests;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/v1` routes.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(accounts::routes())
        .merge(requests::routes())
        .merge(assist::routes())
        .merge(geo::routes())
}
