//! Router tests: requests go through the full middleware stack via
//! `tower::ServiceExt::oneshot`, with `wiremock` standing in for the backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use bazaar_core::CurrencyCode;
use secrecy::SecretString;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_admin::config::{AdminConfig, BackendConfig};
use bazaar_admin::state::AppState;

fn test_app(backend_url: &str) -> Router {
    let config = AdminConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3001,
        base_url: "http://localhost:3001".to_string(),
        session_secret: SecretString::from(
            "test-secret-with-plenty-of-entropy-0123456789".to_string(),
        ),
        backend: BackendConfig::new(backend_url),
        currency: CurrencyCode::VND,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    };
    bazaar_admin::app(AppState::new(config).unwrap())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mount_login(server: &MockServer, role: &str) {
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .and(body_json(json!({"email": "ops@bazaar.vn", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "admin": {"id": 5, "name": "Ops", "email": "ops@bazaar.vn", "role": role}
        })))
        .mount(server)
        .await;
}

/// Sign in against the mock and return the session cookie.
async fn sign_in(app: &Router, server: &MockServer, role: &str) -> String {
    mount_login(server, role).await;
    let response = app
        .clone()
        .oneshot(form("/login", "email=ops%40bazaar.vn&password=hunter22&next=%2F"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response)
}

fn order_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "orderNumber": format!("BZ{id:04}"),
        "status": status,
        "total": 420000,
        "customerName": "Trần Thị Mai",
        "paymentMethod": "cod"
    })
}

#[tokio::test]
async fn health_is_ok() {
    let server = MockServer::start().await;
    let response = test_app(&server.uri())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn readiness_fails_when_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = test_app(&server.uri())
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn signed_out_admin_is_sent_to_login() {
    let server = MockServer::start().await;
    let response = test_app(&server.uri())
        .oneshot(
            Request::get("/orders?status=pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Forders%3Fstatus%3Dpending");
}

#[tokio::test]
async fn signed_out_htmx_request_gets_hx_redirect() {
    let server = MockServer::start().await;
    let response = test_app(&server.uri())
        .oneshot(
            Request::post("/orders/4/status")
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("status=shipping"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["HX-Redirect"], "/login");
}

#[tokio::test]
async fn login_page_renders_with_security_headers() {
    let server = MockServer::start().await;
    let response = test_app(&server.uri())
        .oneshot(
            Request::get("/login?next=/coupons")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert!(headers.contains_key("x-request-id"));

    let html = body_text(response).await;
    assert!(html.contains(r#"name="next" value="/coupons""#));
    assert!(!html.contains("Activity logs"));
}

#[tokio::test]
async fn wrong_password_rerenders_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let response = test_app(&server.uri())
        .oneshot(form("/login", "email=ops%40bazaar.vn&password=nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Incorrect email or password."));
    assert!(html.contains(r#"value="ops@bazaar.vn""#));
}

#[tokio::test]
async fn signed_in_admin_sees_orders() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    Mock::given(method("GET"))
        .and(path("/api/admin/orders"))
        .and(header_is("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [order_json(41, "pending"), order_json(42, "delivered")],
            "page": 1,
            "totalPages": 1,
            "total": 2
        })))
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::get("/orders")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Welcome back, Ops."));
    assert!(html.contains("BZ0041"));
    assert!(html.contains(r#"hx-post="/orders/41/status""#));
    // Delivered is final, so no picker.
    assert!(!html.contains(r#"hx-post="/orders/42/status""#));
}

#[tokio::test]
async fn expired_token_ends_the_session() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    Mock::given(method("GET"))
        .and(path("/api/admin/customers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/customers")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fcustomers");

    let response = app
        .oneshot(
            Request::get("/")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn htmx_status_change_returns_row() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    Mock::given(method("PUT"))
        .and(path("/api/admin/orders/41/status"))
        .and(body_json(json!({"status": "shipping"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(41, "shipping")))
        .expect(1)
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::post("/orders/41/status")
                .header(header::COOKIE, cookie)
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("status=shipping"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.starts_with(r#"<tr id="order-41">"#));
    assert!(html.contains(r#"<option value="shipping" selected>"#));
}

#[tokio::test]
async fn unknown_status_is_rejected_inline() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    let response = app
        .oneshot(
            Request::post("/orders/41/status")
                .header(header::COOKIE, cookie)
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("status=teleported"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("inline-error"));
}

#[tokio::test]
async fn viewer_cannot_delete_coupons() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "viewer").await;

    let mut request = form("/coupons/9/delete", "");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_cannot_change_the_wheel() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    let mut request = form("/lucky-spin", "enabled=on&spins_per_day=1");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_coupon_keeps_input() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "admin").await;

    Mock::given(method("GET"))
        .and(path("/api/admin/coupons"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut request = form("/coupons", "code=TET25&discount_type=percent&value=150");
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("A percentage cannot exceed 100."));
    assert!(html.contains(r#"value="TET25""#));
}

#[tokio::test]
async fn night_market_without_event_shows_defaults() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let cookie = sign_in(&app, &server, "super_admin").await;

    Mock::given(method("GET"))
        .and(path("/api/night-market/admin/event"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/night-market/admin/offers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = app
        .oneshot(
            Request::get("/night-market")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Not scheduled"));
    assert!(html.contains(r#"name="card_count" value="9""#));
    assert!(html.contains("Add offer"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let server = MockServer::start().await;
    let response = test_app(&server.uri())
        .oneshot(Request::get("/no-such-page").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}
