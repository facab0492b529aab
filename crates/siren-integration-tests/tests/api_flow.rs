//! End-to-end tests through the HTTP router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::util::ServiceExt;

use siren_api::server::router;
use siren_integration_tests::offline_app_state;

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("parse")
}

/// Signs up a hospital admin and returns its session token.
async fn hospital_admin_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/accounts",
            None,
            serde_json::json!({
                "name": "Asha Rao",
                "email": "asha@cityhospital.example",
                "role": "admin"
            }),
        ))
        .await
        .expect("sign up");
    assert_eq!(response.status(), StatusCode::CREATED);
    let session = json_body(response).await;
    let token = session["token"].as_str().expect("token").to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/accounts/me")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({
                        "institution": "City Hospital",
                        "instituteType": "Hospital"
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("profile update");
    assert_eq!(response.status(), StatusCode::OK);

    token
}

#[tokio::test]
async fn guest_report_triage_and_address_flow() {
    let app = router(offline_app_state());
    let admin_token = hospital_admin_token(&app).await;

    // A guest books an ambulance.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/services/ambulance/requests",
            None,
            serde_json::json!({
                "location": "12.9, 77.6",
                "hospital": "City Hospital"
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["uid"], "guest_1");
    let id = created["id"].as_str().expect("id").to_string();

    // The hospital admin sees it in the pending snapshot.
    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/services/ambulance/requests/pending",
            Some(&admin_token),
        ))
        .await
        .expect("pending");
    assert_eq!(response.status(), StatusCode::OK);
    let pending = json_body(response).await;
    assert_eq!(pending["requests"].as_array().expect("array").len(), 1);

    // Addressing it empties the pending view and keeps it in history.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/services/ambulance/requests/{id}/address"),
            Some(&admin_token),
            serde_json::json!({}),
        ))
        .await
        .expect("address");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "addressed");

    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/services/ambulance/requests/pending",
            Some(&admin_token),
        ))
        .await
        .expect("pending");
    let pending = json_body(response).await;
    assert!(pending["requests"].as_array().expect("array").is_empty());

    let response = app
        .clone()
        .oneshot(get(
            "/api/v1/services/ambulance/requests/history",
            Some(&admin_token),
        ))
        .await
        .expect("history");
    let history = json_body(response).await;
    assert_eq!(history["requests"][0]["status"], "addressed");

    // A second address attempt stays 200 and leaves the status alone.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/services/ambulance/requests/{id}/address"),
            Some(&admin_token),
            serde_json::json!({}),
        ))
        .await
        .expect("address again");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "addressed");
}

#[tokio::test]
async fn hospital_admin_cannot_triage_the_fire_partition() {
    let app = router(offline_app_state());
    let admin_token = hospital_admin_token(&app).await;

    let response = app
        .oneshot(get(
            "/api/v1/services/fire/requests/pending",
            Some(&admin_token),
        ))
        .await
        .expect("pending");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_in_reporter_can_cancel_without_a_uid() {
    let app = router(offline_app_state());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/accounts",
            None,
            serde_json::json!({
                "name": "Ravi",
                "email": "ravi@example.com",
                "role": "user"
            }),
        ))
        .await
        .expect("sign up");
    let token = json_body(response).await["token"]
        .as_str()
        .expect("token")
        .to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/services/ambulance/requests",
            Some(&token),
            serde_json::json!({
                "location": "12.9, 77.6",
                "hospital": "City Hospital"
            }),
        ))
        .await
        .expect("create");
    let created = json_body(response).await;
    assert_eq!(created["isGuest"], false);
    assert_eq!(created["userName"], "Ravi");
    let id = created["id"].as_str().expect("id");

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/services/ambulance/requests/{id}/cancel"),
            Some(&token),
            serde_json::json!({}),
        ))
        .await
        .expect("cancel");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "cancelled");
}

#[tokio::test]
async fn address_of_an_unknown_id_is_not_found() {
    let app = router(offline_app_state());
    let admin_token = hospital_admin_token(&app).await;

    let response = app
        .oneshot(post_json(
            "/api/v1/services/ambulance/requests/01ARZ3NDEKTSV4RRFFQ69G5FAV/address",
            Some(&admin_token),
            serde_json::json!({}),
        ))
        .await
        .expect("address");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
