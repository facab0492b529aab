//! Account and session routes.
//!
//! ## Routes
//!
//! - `POST   /accounts` - Sign up (issues a session token)
//! - `GET    /accounts/me` - Current profile
//! - `PUT    /accounts/me` - Profile update
//! - `POST   /sessions` - Sign in by email, role-checked
//! - `DELETE /sessions/current` - Sign out
//!
//! Credential verification is delegated to the identity provider and out of
//! scope here; sessions are opaque tokens from the in-process table.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use siren_dispatch::{Account, InstituteKind, NewAccount, ProfileUpdate, Role};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Sign-up form fields.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
    /// Display name.
    pub name: String,
    /// Contact email, unique across the directory.
    pub email: String,
    /// Contact phone, if provided.
    #[serde(default)]
    pub phone: Option<String>,
    /// Chosen role (`user` or `admin`), immutable afterwards.
    #[schema(value_type = String)]
    pub role: Role,
    /// Marketing opt-in.
    #[serde(default)]
    pub agreed_to_offers: bool,
}

/// Profile fields an account holder may edit.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateBody {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Institution name (admins only).
    #[serde(default)]
    pub institution: Option<String>,
    /// Institution type (admins only).
    #[serde(default)]
    #[schema(value_type = String)]
    pub institute_type: Option<InstituteKind>,
}

/// Sign-in form fields.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInBody {
    /// Account email.
    pub email: String,
    /// The console being signed into; must match the account's role.
    #[schema(value_type = String)]
    pub role: Role,
}

/// An account, as returned to its holder.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Account role.
    #[schema(value_type = String)]
    pub role: Role,
    /// Marketing opt-in.
    pub agreed_to_offers: bool,
    /// Institution name, admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    /// Institution type, admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = String)]
    pub institute_type: Option<InstituteKind>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name,
            email: account.email,
            phone: account.phone,
            role: account.role,
            agreed_to_offers: account.agreed_to_offers,
            institution: account.institution,
            institute_type: account.institute_type,
        }
    }
}

/// A session, issued at sign-up or sign-in.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Opaque bearer token.
    pub token: String,
    /// The signed-in account.
    pub account: AccountResponse,
}

/// Creates account and session routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", post(sign_up))
        .route("/accounts/me", get(me).put(update_me))
        .route("/sessions", post(sign_in))
        .route("/sessions/current", delete(sign_out))
}

/// Sign up and start a session.
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = SignUpBody,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Missing field or duplicate email", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn sign_up(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpBody>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .accounts()
        .create(NewAccount {
            name: body.name,
            email: body.email,
            phone: body.phone,
            role: body.role,
            agreed_to_offers: body.agreed_to_offers,
        })
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;

    let token = state.sessions().sign_in(account.id);
    tracing::info!(account = %account.id, role = ?account.role, "account created");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            account: AccountResponse::from(account),
        }),
    ))
}

/// Current profile.
///
/// GET /api/v1/accounts/me
#[utoipa::path(
    get,
    path = "/api/v1/accounts/me",
    tag = "accounts",
    responses(
        (status = 200, description = "The signed-in account", body = AccountResponse),
        (status = 401, description = "No session", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn me(ctx: RequestContext) -> ApiResult<Json<AccountResponse>> {
    let account = ctx.require_account()?;
    Ok(Json(AccountResponse::from(account.clone())))
}

/// Profile update.
///
/// PUT /api/v1/accounts/me
#[utoipa::path(
    put,
    path = "/api/v1/accounts/me",
    tag = "accounts",
    request_body = ProfileUpdateBody,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 401, description = "No session", body = crate::error::ApiErrorBody),
        (status = 403, description = "Institution fields on a user account", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn update_me(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProfileUpdateBody>,
) -> ApiResult<Json<AccountResponse>> {
    let account = ctx.require_account()?;

    let updated = state
        .accounts()
        .update_profile(
            account.id,
            ProfileUpdate {
                name: body.name,
                phone: body.phone,
                institution: body.institution,
                institute_type: body.institute_type,
            },
        )
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?;

    Ok(Json(AccountResponse::from(updated)))
}

/// Sign in by email; the role must match the console being entered.
///
/// POST /api/v1/sessions
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "accounts",
    request_body = SignInBody,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Unknown email", body = crate::error::ApiErrorBody),
        (status = 403, description = "Role mismatch for this console", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn sign_in(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInBody>,
) -> ApiResult<Json<SessionResponse>> {
    let account = state
        .accounts()
        .find_by_email(&body.email)
        .await
        .map_err(|err| ApiError::from(err).with_request_id(ctx.request_id.clone()))?
        .ok_or_else(|| {
            ApiError::unauthorized("no account for that email")
                .with_request_id(ctx.request_id.clone())
        })?;

    if account.role != body.role {
        return Err(ApiError::forbidden(
            "account role does not match this sign-in",
        )
        .with_request_id(ctx.request_id.clone()));
    }

    let token = state.sessions().sign_in(account.id);
    Ok(Json(SessionResponse {
        token,
        account: AccountResponse::from(account),
    }))
}

/// Sign out.
///
/// DELETE /api/v1/sessions/current
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/current",
    tag = "accounts",
    responses((status = 204, description = "Session revoked")),
    security(("bearerAuth" = []))
)]
pub(crate) async fn sign_out(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if let Some(token) = &ctx.token {
        state.sessions().sign_out(token);
    }
    StatusCode::NO_CONTENT
}
