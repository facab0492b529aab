//! Emergency assist (chatbot) route.
//!
//! Independent of the request lifecycle: the handler validates the message,
//! delegates to the assist service, and always answers 200 with a reply.
//! Upstream failures surface as the service's fallback string, not an error.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use siren_assist::ChatMessage;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::server::AppState;

/// One prior conversation turn.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConversationTurn {
    /// `system`, `user`, or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Assist request body.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistBody {
    /// The emergency question.
    pub message: String,
    /// Prior turns, when the console maintains context.
    #[serde(default)]
    pub conversation: Option<Vec<ConversationTurn>>,
}

/// Assist reply.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssistResponse {
    /// The chatbot's reply.
    pub response: String,
}

/// Creates the assist route.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/assist", post(assist))
}

/// Answer an emergency question.
///
/// POST /api/v1/assist
#[utoipa::path(
    post,
    path = "/api/v1/assist",
    tag = "assist",
    request_body = AssistBody,
    responses(
        (status = 200, description = "A reply (possibly the fallback)", body = AssistResponse),
        (status = 400, description = "Empty message", body = crate::error::ApiErrorBody),
    )
)]
pub(crate) async fn assist(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssistBody>,
) -> ApiResult<Json<AssistResponse>> {
    if body.message.trim().is_empty() {
        return Err(
            ApiError::bad_request("message is required").with_request_id(ctx.request_id.clone())
        );
    }

    let conversation: Option<Vec<ChatMessage>> = body.conversation.map(|turns| {
        turns
            .into_iter()
            .map(|turn| ChatMessage {
                role: turn.role,
                content: turn.content,
            })
            .collect()
    });

    let response = state
        .assist()
        .answer(&body.message, conversation.as_deref())
        .await;
    metrics::record_assist_reply(response == siren_assist::FALLBACK_REPLY);

    Ok(Json(AssistResponse { response }))
}
