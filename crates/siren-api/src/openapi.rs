//! `OpenAPI` specification generation for `siren-api`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the Siren REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Siren API",
        description = "Emergency-services request portal REST API"
    ),
    paths(
        crate::routes::accounts::sign_up,
        crate::routes::accounts::me,
        crate::routes::accounts::update_me,
        crate::routes::accounts::sign_in,
        crate::routes::accounts::sign_out,
        crate::routes::requests::create_request,
        crate::routes::requests::get_request,
        crate::routes::requests::pending_requests,
        crate::routes::requests::history_requests,
        crate::routes::requests::address_request,
        crate::routes::requests::cancel_request,
        crate::routes::assist::assist,
        crate::routes::geo::reverse,
        crate::routes::geo::institutions,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::accounts::SignUpBody,
            crate::routes::accounts::ProfileUpdateBody,
            crate::routes::accounts::SignInBody,
            crate::routes::accounts::AccountResponse,
            crate::routes::accounts::SessionResponse,
            crate::routes::requests::CreateRequestBody,
            crate::routes::requests::CancelRequestBody,
            crate::routes::requests::RequestResponse,
            crate::routes::requests::RequestListResponse,
            crate::routes::assist::ConversationTurn,
            crate::routes::assist::AssistBody,
            crate::routes::assist::AssistResponse,
            crate::routes::geo::PlaceResponse,
            crate::routes::geo::InstitutionsResponse,
        )
    ),
    tags(
        (name = "accounts", description = "Accounts and sessions"),
        (name = "requests", description = "Request lifecycle"),
        (name = "assist", description = "Emergency Q&A chatbot"),
        (name = "geo", description = "Geocoding proxies"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
    }
}

/// Returns the generated `OpenAPI` spec as JSON.
pub fn spec_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ApiDoc::openapi())
}
