//! Integration tests for `BackendClient`.
//!
//! Each test stands up a `wiremock` server in place of the commerce
//! backend, so no real network traffic is made.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bazaar_core::ProductId;
use bazaar_core::catalog::ProductSort;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_storefront::backend::{ApiError, BackendClient, ProductQuery};
use bazaar_storefront::config::BackendConfig;

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(&BackendConfig::new(&server.uri())).unwrap()
}

fn product_json(id: i64, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "slug": slug,
        "price": 150000,
        "variants": [{"id": id * 10, "stock": 3}]
    })
}

#[tokio::test]
async fn products_reads_wrapped_page_and_sends_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("page", "2"))
        .and(query_param("sort", ProductSort::PriceAsc.as_str()))
        .and(query_param("category", "bags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [product_json(1, "tote"), product_json(2, "sling")],
            "page": 2,
            "totalPages": 3,
            "total": 50
        })))
        .mount(&server)
        .await;

    let query = ProductQuery {
        page: 2,
        category: Some("bags".to_string()),
        sort: ProductSort::PriceAsc,
        ..ProductQuery::default()
    };
    let page = client(&server).products(&query).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items[1].slug, "sling");
}

#[tokio::test]
async fn product_detail_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/tote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(1, "tote")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let first = backend.product_by_slug("tote").await.unwrap();
    let second = backend.product_by_slug("tote").await.unwrap();

    assert_eq!(first.id, second.id);
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
        .mount(&server)
        .await;

    let result = client(&server).product_by_slug("nope").await;
    assert!(matches!(result, Err(ApiError::NotFound(_))), "got {result:?}");
}

#[tokio::test]
async fn products_by_ids_keeps_requested_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("ids", "3,1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [product_json(1, "a"), product_json(3, "c")]
        })))
        .mount(&server)
        .await;

    let products = client(&server)
        .products_by_ids(&[ProductId::new(3), ProductId::new(1)])
        .await
        .unwrap();

    let slugs: Vec<&str> = products.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["c", "a"]);
}

#[tokio::test]
async fn customer_calls_send_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/me"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9,
            "fullName": "Pham Thi D",
            "email": "d@example.vn"
        })))
        .mount(&server)
        .await;

    let customer = client(&server).me("tok-123").await.unwrap();
    assert_eq!(customer.full_name, "Pham Thi D");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).my_orders("stale").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)), "got {result:?}");
}

#[tokio::test]
async fn rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/flash-sales/active"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = client(&server).active_flash_sales().await;
    assert!(matches!(result, Err(ApiError::RateLimited(7))), "got {result:?}");
}

#[tokio::test]
async fn api_error_carries_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/lucky-spin/spin"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "No spins left today"})),
        )
        .mount(&server)
        .await;

    match client(&server).spin("tok").await {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "No spins left today");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_coupon_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/coupons/validate"))
        .and(body_json(json!({"code": "OLD10", "subtotal": "200000"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Coupon has expired"})),
        )
        .mount(&server)
        .await;

    let check = client(&server)
        .validate_coupon("OLD10", Decimal::from(200_000))
        .await
        .unwrap();

    assert!(!check.valid);
    assert_eq!(check.message.as_deref(), Some("Coupon has expired"));
}

#[tokio::test]
async fn night_market_absent_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/night-market/current"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client(&server).night_market(None).await.unwrap().is_none());
}

#[tokio::test]
async fn ping_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server).ping().await;
    assert!(
        matches!(result, Err(ApiError::Api { status: 503, .. })),
        "got {result:?}"
    );
}
