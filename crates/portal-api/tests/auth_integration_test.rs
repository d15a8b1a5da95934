//! Integration tests for the session authentication endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use portal_api::{models::*, ApiServer, ApiServerConfig, CookieConfig};
use portal_auth::{
    async_trait, AuthConfig, AuthError, Authenticator, CredentialRecord, CredentialStore,
    StoreError,
};
use portal_db::{accounts, SeaOrmCredentialStore};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = portal_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    portal_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    db
}

fn authenticator_for(store: Arc<dyn CredentialStore>) -> Arc<Authenticator> {
    let config = AuthConfig::new(TEST_SECRET)
        .unwrap()
        .with_store_timeout(std::time::Duration::from_millis(500));
    Arc::new(Authenticator::new(&config, store))
}

fn create_test_app(db: DatabaseConnection, cookie: CookieConfig) -> Router {
    let authenticator = authenticator_for(Arc::new(SeaOrmCredentialStore::new(db.clone())));
    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: true,
        cors_origins: None,
        cookie,
    };

    ApiServer::new(config, authenticator, db).build_router()
}

/// Database with mark@example.com / Password123! registered
async fn setup() -> (Router, DatabaseConnection, String) {
    let db = create_test_db().await;
    let patient = accounts::register(&db, "mark@example.com", "Password123!")
        .await
        .unwrap();
    let app = create_test_app(db.clone(), CookieConfig::default());

    (app, db, patient.id.to_string())
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn with_cookie(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Cookie", format!("portal_session={}", token));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn read_raw(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header missing")
        .to_str()
        .unwrap()
        .to_string()
}

fn token_from_cookie(cookie: &str) -> String {
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("portal_session="))
        .unwrap()
        .to_string()
}

async fn login(app: &Router, email: &str, password: &str) -> Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_scenario() {
    let (app, db, patient_id) = setup().await;
    let before = Utc::now();

    let response = login(&app, "mark@example.com", "Password123!").await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("portal_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(!cookie.contains("Secure"));

    let body: LoginResponse = read_json(response).await;
    assert_eq!(body.message, "Login successful");
    assert_eq!(body.user.id, patient_id);
    assert_eq!(body.user.email, "mark@example.com");
    let drift = (body.expires_at - (before + Duration::seconds(86_400))).num_seconds();
    assert!(drift.abs() <= 2, "expiry drifted by {}s", drift);

    // The cookie value verifies back to the same identity
    let token = token_from_cookie(&cookie);
    let authenticator = authenticator_for(Arc::new(SeaOrmCredentialStore::new(db)));
    let identity = authenticator.verify(&token).unwrap();
    assert_eq!(identity.id, patient_id);
    assert_eq!(identity.email, "mark@example.com");

    assert_eq!(
        authenticator.verify("garbage-token").unwrap_err(),
        AuthError::InvalidToken
    );
}

#[tokio::test]
async fn test_login_wrong_password_indistinguishable_from_unknown_email() {
    let (app, _db, _) = setup().await;

    let wrong_password = login(&app, "mark@example.com", "wrong").await;
    let unknown_email = login(&app, "nobody@example.com", "Password123!").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong_password.headers().get(header::SET_COOKIE).is_none());

    let wrong_password = read_raw(wrong_password).await;
    let unknown_email = read_raw(unknown_email).await;
    assert_eq!(wrong_password, unknown_email);

    let error: ErrorResponse = serde_json::from_slice(&wrong_password).unwrap();
    assert_eq!(error.error, "Invalid credentials");
}

#[tokio::test]
async fn test_login_missing_fields() {
    let (app, _db, _) = setup().await;

    for body in [
        json!({ "email": "mark@example.com" }),
        json!({ "password": "Password123!" }),
        json!({ "email": "", "password": "" }),
        json!({}),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "Email and password are required");
    }
}

#[tokio::test]
async fn test_login_malformed_json() {
    let (app, _db, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct SlowStore;

#[async_trait]
impl CredentialStore for SlowStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(None)
    }
}

#[tokio::test]
async fn test_login_backend_unavailable() {
    let db = create_test_db().await;
    let server = ApiServer::new(
        ApiServerConfig::default(),
        authenticator_for(Arc::new(SlowStore)),
        db,
    );

    let response = login(&server.build_router(), "mark@example.com", "Password123!").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "Authentication service unavailable");
    assert_eq!(error.code.as_deref(), Some("AUTH_BACKEND_UNAVAILABLE"));
}

#[tokio::test]
async fn test_secure_cookie_in_production() {
    let db = create_test_db().await;
    accounts::register(&db, "mark@example.com", "Password123!")
        .await
        .unwrap();
    let app = create_test_app(
        db,
        CookieConfig {
            secure: true,
            ..CookieConfig::default()
        },
    );

    let response = login(&app, "mark@example.com", "Password123!").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).contains("; Secure"));
}

#[tokio::test]
async fn test_logout_without_cookie() {
    let (app, _db, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/logout")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("portal_session=;"));
    assert!(cookie.contains("Max-Age=0"));

    let body: MessageResponse = read_json(response).await;
    assert_eq!(body.message, "Logged out successfully");
}

#[tokio::test]
async fn test_logout_does_not_revoke_copied_token() {
    let (app, _db, _) = setup().await;

    let response = login(&app, "mark@example.com", "Password123!").await;
    let token = token_from_cookie(&set_cookie(&response));

    let response = app
        .clone()
        .oneshot(with_cookie("POST", "/api/auth/logout", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).contains("Max-Age=0"));

    // No server-side revocation: the extracted token keeps working
    let response = app
        .oneshot(with_cookie("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_session() {
    let (app, _db, _) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(with_cookie("GET", "/api/auth/me", "garbage-token", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn test_me_returns_fresh_record() {
    let (app, _db, patient_id) = setup().await;

    let response = login(&app, "mark@example.com", "Password123!").await;
    let token = token_from_cookie(&set_cookie(&response));

    let response = app
        .oneshot(with_cookie("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let me: CurrentUser = read_json(response).await;
    assert_eq!(me.id, patient_id);
    assert_eq!(me.email, "mark@example.com");
}

#[tokio::test]
async fn test_me_rejects_token_for_unknown_subject() {
    let (app, _db, _) = setup().await;

    // Validly signed, but the subject was never stored
    let signer = portal_auth::TokenSigner::new(TEST_SECRET.as_bytes(), Duration::hours(24));
    let token = signer
        .issue(
            &portal_auth::Identity {
                id: uuid::Uuid::new_v4().to_string(),
                email: "ghost@example.com".to_string(),
            },
            Utc::now(),
        )
        .unwrap();

    let response = app
        .oneshot(with_cookie("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("UNKNOWN_SUBJECT"));
}

#[tokio::test]
async fn test_mutations_reject_token_for_unknown_subject() {
    let (app, _db, _) = setup().await;

    let signer = portal_auth::TokenSigner::new(TEST_SECRET.as_bytes(), Duration::hours(24));
    let token = signer
        .issue(
            &portal_auth::Identity {
                id: uuid::Uuid::new_v4().to_string(),
                email: "ghost@example.com".to_string(),
            },
            Utc::now(),
        )
        .unwrap();

    for (uri, body) in [
        ("/api/auth/password", json!({ "new_password": "NewPassword456!" })),
        ("/api/auth/email", json!({ "email": "ghost.new@example.com" })),
    ] {
        let response = app
            .clone()
            .oneshot(with_cookie("PUT", uri, &token, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);

        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.code.as_deref(), Some("UNKNOWN_SUBJECT"));
    }
}

#[tokio::test]
async fn test_expired_session_rejected() {
    let (app, _db, patient_id) = setup().await;

    let signer = portal_auth::TokenSigner::new(TEST_SECRET.as_bytes(), Duration::hours(24));
    let token = signer
        .issue(
            &portal_auth::Identity {
                id: patient_id,
                email: "mark@example.com".to_string(),
            },
            Utc::now() - Duration::hours(24) - Duration::seconds(5),
        )
        .unwrap();

    let response = app
        .oneshot(with_cookie("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.code.as_deref(), Some("TOKEN_EXPIRED"));
}

#[tokio::test]
async fn test_portal_page_redirects_when_unauthenticated() {
    let (app, _db, _) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/portal/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

    let response = login(&app, "mark@example.com", "Password123!").await;
    let token = token_from_cookie(&set_cookie(&response));

    let response = app
        .oneshot(with_cookie("GET", "/portal/session", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let session: UserSummary = read_json(response).await;
    assert_eq!(session.email, "mark@example.com");
}

#[tokio::test]
async fn test_register_then_login() {
    let db = create_test_db().await;
    let app = create_test_app(db, CookieConfig::default());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/patients",
            json!({ "email": "lisa@example.com", "password": "Secret456!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UserSummary = read_json(response).await;

    let response = login(&app, "lisa@example.com", "Secret456!").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: LoginResponse = read_json(response).await;
    assert_eq!(body.user, created);
}

#[tokio::test]
async fn test_register_padded_email_then_login_with_same_input() {
    let db = create_test_db().await;
    let app = create_test_app(db, CookieConfig::default());
    let body = json!({ "email": " mark@example.com ", "password": "Password123!" });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/patients", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UserSummary = read_json(response).await;
    assert_eq!(created.email, "mark@example.com");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in: LoginResponse = read_json(response).await;
    assert_eq!(logged_in.user, created);

    // Whitespace-only email counts as missing, like on signup
    let response = login(&app, "   ", "Password123!").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (app, _db, _) = setup().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/patients",
            json!({ "email": "mark@example.com", "password": "Another123!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "Email already exists");
}

#[tokio::test]
async fn test_change_password_flow() {
    let (app, _db, _) = setup().await;

    let response = login(&app, "mark@example.com", "Password123!").await;
    let token = token_from_cookie(&set_cookie(&response));

    // Blank password is rejected and does not touch the stored hash
    let response = app
        .clone()
        .oneshot(with_cookie(
            "PUT",
            "/api/auth/password",
            &token,
            Some(json!({ "new_password": "" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        login(&app, "mark@example.com", "Password123!").await.status(),
        StatusCode::OK
    );

    let response = app
        .clone()
        .oneshot(with_cookie(
            "PUT",
            "/api/auth/password",
            &token,
            Some(json!({ "new_password": "NewPassword456!" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        login(&app, "mark@example.com", "Password123!").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "mark@example.com", "NewPassword456!").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_change_email_flow() {
    let (app, _db, patient_id) = setup().await;

    let response = login(&app, "mark@example.com", "Password123!").await;
    let token = token_from_cookie(&set_cookie(&response));

    let response = app
        .clone()
        .oneshot(with_cookie(
            "PUT",
            "/api/auth/email",
            &token,
            Some(json!({ "email": "mark.new@example.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: UserSummary = read_json(response).await;
    assert_eq!(updated.id, patient_id);
    assert_eq!(updated.email, "mark.new@example.com");

    // Password is unchanged, only the login email moved
    assert_eq!(
        login(&app, "mark.new@example.com", "Password123!").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        login(&app, "mark@example.com", "Password123!").await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_protected_routes_reject_anonymous_mutation() {
    let (app, _db, _) = setup().await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/auth/password",
            json!({ "new_password": "Hijacked123!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wildcard_cors_origin_does_not_break_router() {
    let db = create_test_db().await;
    let config = ApiServerConfig {
        cors_origins: Some(vec!["*".to_string(), "http://localhost:5173".to_string()]),
        ..ApiServerConfig::default()
    };
    assert!(config.validate().is_err());

    let server = ApiServer::new(
        config,
        authenticator_for(Arc::new(SeaOrmCredentialStore::new(db.clone()))),
        db,
    );
    let response = server
        .build_router()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("Origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_health_check() {
    let (app, _db, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = read_json(response).await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.database, "connected");
}
