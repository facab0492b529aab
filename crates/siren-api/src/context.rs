//! Request context extraction.
//!
//! Every handler receives a [`RequestContext`]: the resolved account (when a
//! valid bearer token accompanied the request), the raw token, and a request
//! ID for correlation. An absent or stale token is not an error here, since
//! several endpoints accept guests; enforcement happens per-route via
//! [`RequestContext::require_account`] and friends.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::sync::Arc;
use ulid::Ulid;

use siren_core::error::Error as CoreError;
use siren_core::service::ServiceKind;
use siren_dispatch::Account;

use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from headers and the session table.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The signed-in account, if the bearer token resolved.
    pub account: Option<Account>,
    /// The raw bearer token, if one was sent.
    pub token: Option<String>,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

impl RequestContext {
    /// Returns the signed-in account or a 401.
    pub fn require_account(&self) -> Result<&Account, ApiError> {
        self.account.as_ref().ok_or_else(|| {
            ApiError::unauthorized("a signed-in session is required")
                .with_request_id(self.request_id.clone())
        })
    }

    /// Returns the signed-in account if it may address the given partition.
    pub fn require_admin(&self, kind: ServiceKind) -> Result<&Account, ApiError> {
        let account = self.require_account()?;
        if !account.may_address(kind) {
            return Err(ApiError::forbidden(format!(
                "this account does not operate on the {kind} partition"
            ))
            .with_request_id(self.request_id.clone()));
        }
        Ok(account)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            request_id_from_headers(headers).unwrap_or_else(|| Ulid::new().to_string());
        let token = bearer_token(headers);

        let account = match &token {
            Some(token) => resolve_account(state, token, &request_id).await?,
            None => None,
        };

        let ctx = Self {
            account,
            token,
            request_id,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

async fn resolve_account(
    state: &AppState,
    token: &str,
    request_id: &str,
) -> Result<Option<Account>, ApiError> {
    let Some(account_id) = state.identity().resolve(Some(token)).await else {
        return Ok(None);
    };
    match state.accounts().get(account_id).await {
        Ok(account) => Ok(Some(account)),
        // Session outlived the account record; treat as signed out.
        Err(CoreError::NotFound { .. }) => Ok(None),
        Err(err) => Err(ApiError::from(err).with_request_id(request_id.to_string())),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn request_id_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-7"));
        assert_eq!(request_id_from_headers(&headers), Some("req-7".to_string()));
        assert_eq!(request_id_from_headers(&HeaderMap::new()), None);
    }
}
