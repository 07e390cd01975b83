//! Common test utilities
//!
//! Builds the production router over seeded in-memory stores so tests
//! exercise the full pipeline: rate governor, authentication, role gates,
//! handlers, and field encryption at the storage boundary.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use clinigate::config::{
    Config, CryptoConfig, JwtConfig, LockoutConfig, RateLimitConfig, TelemetryConfig,
};
use clinigate::crypto::{DecryptFallback, EncryptionKey, FieldCipher};
use clinigate::domain::{PatientRecord, Role, TenantMembership, UserAccount};
use clinigate::repository::{
    InMemoryMembershipRepository, InMemoryRecordRepository, InMemoryUserRepository,
    RecordRepository,
};
use clinigate::server::{build_router, AppState};
use clinigate::service::auth::hash_password;

pub fn test_config() -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        jwt: JwtConfig {
            secret: "test-secret-key-for-http-testing".to_string(),
            issuer: "clinigate-test".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604800,
        },
        crypto: CryptoConfig {
            key_base64: "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=".to_string(),
            decrypt_fallback: DecryptFallback::Reject,
        },
        rate_limit: RateLimitConfig::default(),
        lockout: LockoutConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

fn account(id: i64, login_id: &str, password: &str, role: Role, tenant: Option<&str>) -> UserAccount {
    UserAccount {
        id,
        login_id: login_id.to_string(),
        password_hash: hash_password(password).unwrap(),
        display_name: login_id.to_string(),
        role,
        tenant_code: tenant.map(String::from),
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn membership(user_id: i64, tenant_code: &str, is_primary: bool) -> TenantMembership {
    TenantMembership {
        user_id,
        tenant_code: tenant_code.to_string(),
        is_primary,
    }
}

pub struct TestApp {
    pub router: Router,
    pub records: Arc<InMemoryRecordRepository>,
}

/// Build the production router over seeded stores.
///
/// Seeded accounts (password is `<login_id>-pass` throughout):
/// - `admin`: ADMIN, no institution
/// - `doctor01`: DOCTOR at H1
/// - `staff01`: STAFF, primary H1, also member of H2
/// - `patient01`: PATIENT at H1
pub fn build_app(config: Config) -> TestApp {
    let users = InMemoryUserRepository::with_users(vec![
        account(1, "admin", "admin-pass", Role::Admin, None),
        account(2, "doctor01", "doctor01-pass", Role::Doctor, Some("H1")),
        account(3, "staff01", "staff01-pass", Role::Staff, Some("H1")),
        account(4, "patient01", "patient01-pass", Role::Patient, Some("H1")),
    ]);
    let memberships = InMemoryMembershipRepository::with_memberships(vec![
        membership(2, "H1", true),
        membership(3, "H1", true),
        membership(3, "H2", false),
        membership(4, "H1", true),
    ]);

    let key = EncryptionKey::from_base64(&config.crypto.key_base64).unwrap();
    let cipher = FieldCipher::new(key, config.crypto.decrypt_fallback);
    let records = Arc::new(InMemoryRecordRepository::new(cipher));

    let state = AppState::new(
        config,
        Arc::new(users),
        Arc::new(memberships),
        records.clone(),
    )
    .unwrap();

    TestApp {
        router: build_router(state, None),
        records,
    }
}

pub fn build_default_app() -> TestApp {
    build_app(test_config())
}

/// Insert one record per institution H1, H2, H3; returns their ids
pub async fn seed_records(records: &Arc<InMemoryRecordRepository>) -> (i64, i64, i64) {
    let mut ids = Vec::new();
    for code in ["H1", "H2", "H3"] {
        let now = Utc::now();
        let created = records
            .insert(PatientRecord {
                id: 0,
                tenant_code: Some(code.to_string()),
                patient_name: format!("Patient {code}"),
                registration_no: format!("R-{code}"),
                note: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        ids.push(created.id);
    }
    (ids[0], ids[1], ids[2])
}

/// Send one request through the router
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the token response body
pub async fn login(router: &Router, login_id: &str, password: &str) -> Value {
    let response = send(
        router,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "login_id": login_id, "password": password })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Log in and return just the access token
pub async fn access_token(router: &Router, login_id: &str, password: &str) -> String {
    login(router, login_id, password).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
