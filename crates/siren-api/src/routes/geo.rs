//! Geocoding proxy routes.
//!
//! Thin pass-throughs to the geocoder so consoles never talk to the
//! upstream directly. Both endpoints degrade instead of failing: an
//! unreachable upstream yields the raw coordinate string or the fixed
//! institution option.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use siren_core::service::ServiceKind;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Coordinates to reverse geocode.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReverseParams {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Institution search parameters.
#[derive(Debug, Deserialize, IntoParams)]
pub struct InstitutionsParams {
    /// Service kind (`ambulance`, `fire`, `crime`).
    pub kind: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// A reverse-geocoded place.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceResponse {
    /// Human-readable place string, or the raw coordinates.
    pub place: String,
}

/// Institution options for a report form.
#[derive(Debug, Serialize, ToSchema)]
pub struct InstitutionsResponse {
    /// Candidate institutions, fixed fallback last.
    pub options: Vec<String>,
}

/// Creates geocoding routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geo/reverse", get(reverse))
        .route("/geo/institutions", get(institutions))
}

/// Reverse geocode coordinates.
///
/// GET /api/v1/geo/reverse
#[utoipa::path(
    get,
    path = "/api/v1/geo/reverse",
    tag = "geo",
    params(ReverseParams),
    responses((status = 200, description = "Place string", body = PlaceResponse))
)]
pub(crate) async fn reverse(
    Query(params): Query<ReverseParams>,
    State(state): State<Arc<AppState>>,
) -> Json<PlaceResponse> {
    let place = state.geocoder().reverse(params.lat, params.lon).await;
    Json(PlaceResponse { place })
}

/// Find nearby institutions for a service kind.
///
/// GET /api/v1/geo/institutions
#[utoipa::path(
    get,
    path = "/api/v1/geo/institutions",
    tag = "geo",
    params(InstitutionsParams),
    responses(
        (status = 200, description = "Institution options", body = InstitutionsResponse),
        (status = 400, description = "Unknown service kind", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn institutions(
    Query(params): Query<InstitutionsParams>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<InstitutionsResponse>> {
    let kind: ServiceKind = params.kind.parse().map_err(|err: siren_core::Error| {
        ApiError::from(err).with_request_id(ctx.request_id.clone())
    })?;

    let options = state
        .geocoder()
        .nearby_institutions(kind, params.lat, params.lon)
        .await;
    Ok(Json(InstitutionsResponse { options }))
}
