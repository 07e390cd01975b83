//! Tenant isolation tests over the full HTTP pipeline
//!
//! A STAFF caller whose memberships are {H1, H2} (primary H1) must see
//! exactly those institutions' records, must not learn that H3 records
//! exist, and may only write within H1.

mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{access_token, body_json, build_default_app, seed_records, send};

#[tokio::test]
async fn test_list_filters_to_membership_tenants() {
    let app = build_default_app();
    seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    let response = send(&app.router, Method::GET, "/api/v1/records", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let codes: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["tenant_code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["H1", "H2"]);
}

#[tokio::test]
async fn test_admin_sees_all_tenants() {
    let app = build_default_app();
    seed_records(&app.records).await;
    let token = access_token(&app.router, "admin", "admin-pass").await;

    let response = send(&app.router, Method::GET, "/api/v1/records", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_get_within_membership_returns_plaintext_fields() {
    let app = build_default_app();
    let (in_h1, _, _) = seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    let response = send(
        &app.router,
        Method::GET,
        &format!("/api/v1/records/{in_h1}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // PII is encrypted at rest but always plaintext on the wire
    let body = body_json(response).await;
    assert_eq!(body["patient_name"], "Patient H1");
    assert_eq!(body["registration_no"], "R-H1");
}

#[tokio::test]
async fn test_get_outside_membership_is_not_found() {
    let app = build_default_app();
    let (_, _, in_h3) = seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    let response = send(
        &app.router,
        Method::GET,
        &format!("/api/v1/records/{in_h3}"),
        Some(&token),
        None,
    )
    .await;

    // Not 403: the record's existence must not leak
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_readable_but_foreign_record_is_forbidden() {
    let app = build_default_app();
    let (_, in_h2, _) = seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    // H2 is visible to staff01 but owned by another institution
    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/v1/records/{in_h2}"),
        Some(&token),
        Some(json!({ "patient_name": "Changed" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_invisible_record_is_not_found() {
    let app = build_default_app();
    let (_, _, in_h3) = seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/v1/records/{in_h3}"),
        Some(&token),
        Some(json!({ "patient_name": "Probe" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_own_tenant_succeeds() {
    let app = build_default_app();
    let (in_h1, _, _) = seed_records(&app.records).await;
    let token = access_token(&app.router, "staff01", "staff01-pass").await;

    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/v1/records/{in_h1}"),
        Some(&token),
        Some(json!({ "patient_name": "Renamed", "note": "allergy noted" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["patient_name"], "Renamed");
    assert_eq!(body["note"], "allergy noted");
}

#[tokio::test]
async fn test_admin_may_update_any_tenant() {
    let app = build_default_app();
    let (_, _, in_h3) = seed_records(&app.records).await;
    let token = access_token(&app.router, "admin", "admin-pass").await;

    let response = send(
        &app.router,
        Method::PUT,
        &format!("/api/v1/records/{in_h3}"),
        Some(&token),
        Some(json!({ "patient_name": "AdminEdit" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["patient_name"], "AdminEdit");
}

#[tokio::test]
async fn test_create_stamps_caller_institution() {
    let app = build_default_app();
    let token = access_token(&app.router, "doctor01", "doctor01-pass").await;

    let response = send(
        &app.router,
        Method::POST,
        "/api/v1/records",
        Some(&token),
        Some(json!({ "patient_name": "Yamada Hanako", "registration_no": "R-2026-0042" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["tenant_code"], "H1");
    assert_eq!(body["patient_name"], "Yamada Hanako");
}

#[tokio::test]
async fn test_tenant_context_does_not_leak_across_requests() {
    let app = build_default_app();
    seed_records(&app.records).await;
    let admin = access_token(&app.router, "admin", "admin-pass").await;
    let staff = access_token(&app.router, "staff01", "staff01-pass").await;

    // An admin request must not widen the next caller's visibility
    let response = send(&app.router, Method::GET, "/api/v1/records", Some(&admin), None).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

    let response = send(&app.router, Method::GET, "/api/v1/records", Some(&staff), None).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}
