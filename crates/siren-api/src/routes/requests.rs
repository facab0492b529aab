//! Request lifecycle routes.
//!
//! ## Routes
//!
//! - `POST /services/{kind}/requests` - Report an incident / book a service
//! - `GET  /services/{kind}/requests/pending` - Admin triage snapshot
//! - `GET  /services/{kind}/requests/history` - Admin history snapshot
//! - `GET  /services/{kind}/requests/{id}` - Fetch one request
//! - `POST /services/{kind}/requests/{id}/address` - Admin marks it handled
//! - `POST /services/{kind}/requests/{id}/cancel` - Reporter withdraws it
//!
//! Creation accepts guests: without a bearer token the dispatcher allocates
//! a `guest_<n>` identity from the partition's counter.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use siren_core::id::RequestId;
use siren_core::service::ServiceKind;
use siren_dispatch::{NewRequest, Request, RequestDetail, RequesterId};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::server::AppState;

/// Body of a request creation call.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    /// Display name for guest reporters.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Free-text or reverse-geocoded location string.
    pub location: String,
    /// Raw latitude, if shared.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Raw longitude, if shared.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Per-kind fields: `hospital`, or `fireStation`+`fireType`, or
    /// `policeStation`+`crimeType`.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub detail: RequestDetail,
}

/// Body of a cancellation call.
///
/// Guests authenticate by presenting the `uid` their report was created
/// under; signed-in reporters are identified by their session.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestBody {
    /// Reporting identity, required without a session.
    #[serde(default)]
    pub uid: Option<String>,
}

/// One request document.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    /// Request id.
    pub id: String,
    /// Reporting identity (account id or `guest_<n>`).
    pub uid: String,
    /// Reporter display name.
    pub user_name: String,
    /// Location string.
    pub location: String,
    /// Raw latitude, if shared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Raw longitude, if shared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Per-kind fields, flattened.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub detail: RequestDetail,
    /// Creation timestamp (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Current status.
    pub status: String,
    /// True for guest reports.
    pub is_guest: bool,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        Self {
            id: request.id.to_string(),
            uid: request.uid.to_string(),
            user_name: request.user_name,
            location: request.location,
            latitude: request.latitude,
            longitude: request.longitude,
            detail: request.detail,
            created_at: request.created_at.map(|at| at.to_rfc3339()),
            status: request.status.to_string(),
            is_guest: request.is_guest,
        }
    }
}

/// A view emission: the full current result set.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestListResponse {
    /// Matching requests, newest first.
    pub requests: Vec<RequestResponse>,
}

impl RequestListResponse {
    fn from_requests(requests: Vec<Request>) -> Self {
        Self {
            requests: requests.into_iter().map(RequestResponse::from).collect(),
        }
    }
}

/// Creates request lifecycle routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/services/:kind/requests", post(create_request))
        .route("/services/:kind/requests/pending", get(pending_requests))
        .route("/services/:kind/requests/history", get(history_requests))
        .route("/services/:kind/requests/:id", get(get_request))
        .route("/services/:kind/requests/:id/address", post(address_request))
        .route("/services/:kind/requests/:id/cancel", post(cancel_request))
}

/// Report an incident or book a service.
///
/// POST /api/v1/services/{kind}/requests
#[utoipa::path(
    post,
    path = "/api/v1/services/{kind}/requests",
    tag = "requests",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 400, description = "Missing mandatory field", body = crate::error::ApiErrorBody),
        (status = 503, description = "Identity allocation or store write failed", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn create_request(
    Path(kind): Path<String>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind, &ctx)?;

    let payload = NewRequest {
        user_name: body.user_name,
        location: body.location,
        latitude: body.latitude,
        longitude: body.longitude,
        detail: body.detail,
    };

    let request = state
        .dispatcher()
        .create_request(kind, ctx.token.as_deref(), payload)
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;

    metrics::record_request_created(kind, request.is_guest);
    Ok((StatusCode::CREATED, Json(RequestResponse::from(request))))
}

/// Fetch one request.
///
/// GET /api/v1/services/{kind}/requests/{id}
#[utoipa::path(
    get,
    path = "/api/v1/services/{kind}/requests/{id}",
    tag = "requests",
    responses(
        (status = 200, description = "The request", body = RequestResponse),
        (status = 404, description = "Unknown id in this partition", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn get_request(
    Path((kind, id)): Path<(String, String)>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RequestResponse>> {
    let kind = parse_kind(&kind, &ctx)?;
    let id = parse_request_id(&id, &ctx)?;

    let request = state
        .dispatcher()
        .store()
        .get(kind, id)
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(RequestResponse::from(request)))
}

/// Admin triage snapshot: pending requests, newest first.
///
/// GET /api/v1/services/{kind}/requests/pending
#[utoipa::path(
    get,
    path = "/api/v1/services/{kind}/requests/pending",
    tag = "requests",
    responses(
        (status = 200, description = "Pending requests", body = RequestListResponse),
        (status = 401, description = "No session", body = crate::error::ApiErrorBody),
        (status = 403, description = "Institution mismatch", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn pending_requests(
    Path(kind): Path<String>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RequestListResponse>> {
    let kind = parse_kind(&kind, &ctx)?;
    ctx.require_admin(kind)?;

    let requests = state
        .dispatcher()
        .pending_view(kind)
        .snapshot()
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(RequestListResponse::from_requests(requests)))
}

/// Admin history snapshot: the whole partition, newest first.
///
/// GET /api/v1/services/{kind}/requests/history
#[utoipa::path(
    get,
    path = "/api/v1/services/{kind}/requests/history",
    tag = "requests",
    responses(
        (status = 200, description = "Request history", body = RequestListResponse),
        (status = 401, description = "No session", body = crate::error::ApiErrorBody),
        (status = 403, description = "Institution mismatch", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn history_requests(
    Path(kind): Path<String>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RequestListResponse>> {
    let kind = parse_kind(&kind, &ctx)?;
    ctx.require_admin(kind)?;

    let requests = state
        .dispatcher()
        .history_view(kind)
        .snapshot()
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(RequestListResponse::from_requests(requests)))
}

/// Admin marks a pending request as addressed.
///
/// POST /api/v1/services/{kind}/requests/{id}/address
#[utoipa::path(
    post,
    path = "/api/v1/services/{kind}/requests/{id}/address",
    tag = "requests",
    responses(
        (status = 200, description = "Request addressed (idempotent)", body = RequestResponse),
        (status = 403, description = "Not an institution-matching admin", body = crate::error::ApiErrorBody),
        (status = 404, description = "Unknown id in this partition", body = crate::error::ApiErrorBody),
        (status = 409, description = "Request was already cancelled", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn address_request(
    Path((kind, id)): Path<(String, String)>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RequestResponse>> {
    let kind = parse_kind(&kind, &ctx)?;
    let id = parse_request_id(&id, &ctx)?;
    let admin = ctx.require_account()?;

    match state.dispatcher().address(kind, id, admin).await {
        Ok(request) => {
            metrics::record_status_transition(kind, "address", "applied");
            Ok(Json(RequestResponse::from(request)))
        }
        Err(err) => {
            metrics::record_status_transition(kind, "address", "rejected");
            Err(ApiError::from(err).with_request_id(ctx.request_id.clone()))
        }
    }
}

/// Reporter withdraws a pending request.
///
/// POST /api/v1/services/{kind}/requests/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/services/{kind}/requests/{id}/cancel",
    tag = "requests",
    request_body = CancelRequestBody,
    responses(
        (status = 200, description = "Request cancelled (idempotent)", body = RequestResponse),
        (status = 401, description = "No session and no reporting uid", body = crate::error::ApiErrorBody),
        (status = 403, description = "Not the original requester", body = crate::error::ApiErrorBody),
        (status = 409, description = "Request was already addressed", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn cancel_request(
    Path((kind, id)): Path<(String, String)>,
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    body: Option<Json<CancelRequestBody>>,
) -> ApiResult<Json<RequestResponse>> {
    let kind = parse_kind(&kind, &ctx)?;
    let id = parse_request_id(&id, &ctx)?;

    let requester = if let Some(account) = &ctx.account {
        RequesterId::Account(account.id)
    } else if let Some(uid) = body.and_then(|Json(body)| body.uid) {
        uid.parse::<RequesterId>()
            .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?
    } else {
        return Err(ApiError::unauthorized(
            "cancellation requires a session or the reporting uid",
        )
        .with_request_id(ctx.request_id.clone()));
    };

    match state.dispatcher().cancel(kind, id, &requester).await {
        Ok(request) => {
            metrics::record_status_transition(kind, "cancel", "applied");
            Ok(Json(RequestResponse::from(request)))
        }
        Err(err) => {
            metrics::record_status_transition(kind, "cancel", "rejected");
            Err(ApiError::from(err).with_request_id(ctx.request_id.clone()))
        }
    }
}

fn parse_kind(raw: &str, ctx: &RequestContext) -> Result<ServiceKind, ApiError> {
    raw.parse()
        .map_err(|err: siren_core::Error| ApiError::from(err).with_request_id(ctx.request_id.clone()))
}

fn parse_request_id(raw: &str, ctx: &RequestContext) -> Result<RequestId, ApiError> {
    raw.parse()
        .map_err(|err: siren_core::Error| ApiError::from(err).with_request_id(ctx.request_id.clone()))
}
