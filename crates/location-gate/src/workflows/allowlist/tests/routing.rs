use super::common::*;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::allowlist::enforcement::BLOCK_MESSAGE;
use crate::workflows::allowlist::domain::SubmissionContext;
use crate::workflows::allowlist::router::{
    error_response, submission_context, REQUESTED_WITH_HEADER, REQUEST_CONTEXT_HEADER,
};
use crate::workflows::allowlist::settings::RuleConfig;
use crate::workflows::allowlist::location_gate_router;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

#[tokio::test]
async fn validate_route_reports_field_errors() {
    let (service, _, _) = build_service(zip_config(&["02134", "02139"]));
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/submissions/validate",
            json!({ "form_id": 3, "field_values": { "12": "02140" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["errors"]["field12"], json!("ZIP not served."));
}

#[tokio::test]
async fn validate_route_accepts_list_values() {
    let (service, _, _) = build_service(zip_config(&["02134"]));
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/submissions/validate",
            json!({ "form_id": 3, "field_values": { "12": ["02134", "ignored"] } }),
        ))
        .await
        .expect("router responds");

    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "valid": true, "errors": {} }));
}

#[tokio::test]
async fn create_route_returns_unprocessable_with_inline_errors() {
    let (service, _, entries) = build_service(zip_config(&["02134"]));
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/entries",
            json!({ "form_id": 3, "field_values": { "12": "99999" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["errors"]["field12"], json!("ZIP not served."));
    assert_eq!(entries.len(), 0);
}

#[tokio::test]
async fn create_route_persists_clean_entries() {
    let (service, _, entries) = build_service(both_config());
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/entries",
            json!({ "form_id": 3, "field_values": { "12": "02139", "14": "New Hampshire" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["form_id"], json!(3));
    assert_eq!(body["field_values"]["14"], json!("New Hampshire"));
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn update_route_blocks_and_reports_unknown_entries() {
    let (service, _, _) = build_service(zip_config(&["02134"]));
    let record = service
        .create_entry(
            contact(&[(ZIP_FIELD, "02134")]),
            SubmissionContext::public(),
        )
        .expect("entry created");
    let router = router_with_service(service);

    let rejected = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/entries/{}", record.entry_id.0),
            json!({ "field_values": { "12": "99999" } }),
        ))
        .await
        .expect("router responds");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let accepted = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/entries/{}", record.entry_id.0),
            json!({ "field_values": { "12": "02134", "10": "Ada" } }),
        ))
        .await
        .expect("router responds");
    assert_eq!(accepted.status(), StatusCode::OK);

    let missing = router
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/entries/entry-missing",
            json!({ "field_values": {} }),
        ))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gate_block_maps_to_forbidden_with_generic_message() {
    let (service, _, _) = build_service(zip_config(&["02134"]));
    let blocked = service
        .create_entry(
            contact(&[(ZIP_FIELD, "99999")]),
            SubmissionContext::public(),
        )
        .expect_err("gate blocks");

    let response = error_response(blocked);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "error": BLOCK_MESSAGE }));
}

#[tokio::test]
async fn settings_routes_round_trip() {
    let (service, _, _) = build_service(RuleConfig::default());
    let router = router_with_service(service);

    let saved = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/settings",
            json!({
                "_version": 2,
                "selected_form_ids": [3],
                "enable_state_validation": true,
                "allowed_states": "Massachusetts, nh, Atlantis",
                "state_error_msg": ""
            }),
        ))
        .await
        .expect("router responds");
    assert_eq!(saved.status(), StatusCode::OK);
    let body = read_json_body(saved).await;
    assert_eq!(body["state"]["allowed"], json!(["MA", "NH"]));
    assert_eq!(
        body["state"]["error_message"],
        json!("Sorry, we only serve selected states.")
    );

    let fetched = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/settings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(read_json_body(fetched).await, body);
}

#[tokio::test]
async fn forms_route_lists_schema_forms() {
    let (service, _, _) = build_service(RuleConfig::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/forms")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!([{ "id": 3, "name": "Contact" }, { "id": 8, "name": "Survey" }])
    );
}

#[test]
fn submission_context_reads_host_headers() {
    let mut headers = HeaderMap::new();
    assert!(!submission_context(&headers).is_admin_render());

    headers.insert(REQUEST_CONTEXT_HEADER, HeaderValue::from_static("Admin"));
    assert!(submission_context(&headers).is_admin_render());

    headers.insert(REQUESTED_WITH_HEADER, HeaderValue::from_static("XMLHttpRequest"));
    let context = submission_context(&headers);
    assert!(context.admin && context.ajax);
    assert!(!context.is_admin_render());
}

#[tokio::test]
async fn create_route_reads_settings_once_per_request() {
    // A save lands between the soft check and the gate: the request keeps its snapshot.
    let (service, settings, entries) =
        build_shifting_service(RuleConfig::default(), zip_config(&["99999"]));
    let router = location_gate_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/entries",
            json!({ "form_id": 3, "field_values": { "12": "02140" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(settings.reads(), 1);
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn settings_route_accepts_legacy_saved_documents() {
    let (service, _, _) = build_service(RuleConfig::default());
    let router = router_with_service(service);

    let saved = router
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/settings",
            json!({
                "_version": "1.0.0",
                "apply_all_forms": 0,
                "selected_form_ids": ["3"],
                "enable_zip_validation": 0,
                "allowed_zips": "02139\n02134",
                "enable_state_validation": 1,
                "allowed_states": "NH, MA",
                "zip_field_map": { "3": 12 }
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(saved.status(), StatusCode::OK);
    let body = read_json_body(saved).await;
    assert_eq!(body["selected_form_ids"], json!([3]));
    assert_eq!(body["zip"]["enabled"], json!(true));
    assert_eq!(body["zip"]["allowed"], json!(["02139", "02134"]));
    assert_eq!(body["state"]["allowed"], json!(["NH", "MA"]));
}
