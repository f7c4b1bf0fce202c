//! Integration tests for the admin `BackendClient`.
//!
//! A `wiremock` server stands in for the commerce backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bazaar_core::activity::ActivityLogQuery;
use bazaar_core::coupon::CouponForm;
use bazaar_core::promotions::NightMarketOfferInput;
use bazaar_core::{AdminRole, CouponId, NightMarketOfferId, OrderId, OrderStatus};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_admin::backend::{ApiError, BackendClient, ListQuery};
use bazaar_admin::config::BackendConfig;

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(&BackendConfig::new(&server.uri())).unwrap()
}

fn order_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "orderNumber": format!("BZ{id:04}"),
        "status": status,
        "total": 420000,
        "customerName": "Trần Thị Mai",
        "items": [{"productName": "Lantern", "quantity": 2, "unitPrice": 210000}]
    })
}

#[tokio::test]
async fn admin_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .and(body_json(json!({"email": "ops@bazaar.vn", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "accessToken": "tok-1",
                "user": {
                    "id": 5,
                    "fullName": "Ops",
                    "email": "ops@bazaar.vn",
                    "role": "super_admin"
                }
            }
        })))
        .mount(&server)
        .await;

    let auth = client(&server)
        .admin_login("ops@bazaar.vn", "hunter22")
        .await
        .unwrap();

    assert_eq!(auth.token, "tok-1");
    assert_eq!(auth.admin.name, "Ops");
    assert_eq!(auth.admin.role, AdminRole::SuperAdmin);
}

#[tokio::test]
async fn admin_login_rejection_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad"})))
        .mount(&server)
        .await;

    let err = client(&server).admin_login("a@b.vn", "x").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn orders_send_filters_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/orders"))
        .and(header("authorization", "Bearer tok"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .and(query_param("status", "shipping"))
        .and(query_param("search", "Mai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [order_json(41, "shipping")],
            "page": 2,
            "totalPages": 4,
            "total": 70
        })))
        .mount(&server)
        .await;

    let query = ListQuery {
        search: Some(" Mai ".to_string()),
        status: Some("shipping".to_string()),
        page: Some(2),
    };
    let page = client(&server).admin_orders("tok", &query).await.unwrap();

    assert_eq!(page.total, 70);
    assert_eq!(page.total_pages, 4);
    assert_eq!(page.items[0].status, OrderStatus::Shipping);
    assert_eq!(page.items[0].display_number(), "BZ0041");
}

#[tokio::test]
async fn update_status_puts_wire_value() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/orders/41/status"))
        .and(body_json(json!({"status": "delivered"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(41, "delivered")))
        .expect(1)
        .mount(&server)
        .await;

    let order = client(&server)
        .update_order_status("tok", OrderId::new(41), OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn refused_transition_keeps_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/orders/41/status"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"message": "Delivered orders cannot be changed"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .update_order_status("tok", OrderId::new(41), OrderStatus::Pending)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Delivered orders cannot be changed");
}

#[tokio::test]
async fn create_coupon_sends_normalized_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/coupons"))
        .and(body_json(json!({
            "code": "TET25",
            "discount_type": "percent",
            "value": "25",
            "max_uses": 100
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9,
            "code": "TET25",
            "discountType": "percent",
            "value": 25,
            "maxUses": 100
        })))
        .mount(&server)
        .await;

    let form = CouponForm {
        code: " tet25 ".to_string(),
        discount_type: "percent".to_string(),
        value: "25".to_string(),
        max_uses: "100".to_string(),
        ..CouponForm::default()
    };
    let coupon = client(&server)
        .create_coupon("tok", &form.validate().unwrap())
        .await
        .unwrap();
    assert_eq!(coupon.id, CouponId::new(9));
    assert!(coupon.active);
}

#[tokio::test]
async fn delete_coupon_ignores_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/coupons/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_coupon("tok", CouponId::new(9))
        .await
        .unwrap();
}

#[tokio::test]
async fn viewer_write_is_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/coupons/9"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_coupon("tok", CouponId::new(9))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
    assert!(!err.is_upstream_failure());
}

#[tokio::test]
async fn activity_logs_send_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/activity-logs"))
        .and(query_param("action", "delete"))
        .and(query_param("entity_type", "coupon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": 3,
                "action": "delete",
                "entityType": "coupon",
                "entityId": "9",
                "adminName": "Ops",
                "createdAt": "2025-02-01T10:15:00Z"
            }],
            "total": 1
        })))
        .mount(&server)
        .await;

    let query = ActivityLogQuery {
        action: Some("delete".to_string()),
        entity_type: Some("coupon".to_string()),
        ..ActivityLogQuery::default()
    };
    let page = client(&server).activity_logs("tok", &query).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].admin_name.as_deref(), Some("Ops"));
}

#[tokio::test]
async fn missing_night_market_event_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/night-market/admin/event"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let settings = client(&server).night_market_settings("tok").await.unwrap();
    assert!(settings.is_none());
}

#[tokio::test]
async fn night_market_offers_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/night-market/admin/offers"))
        .and(body_json(json!({
            "title": "Lantern deal",
            "discount_percent": 30,
            "product_id": null,
            "quantity": 20
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 6,
            "title": "Lantern deal",
            "discountPercent": 30,
            "quantity": 20
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/night-market/admin/offers/6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server);
    let input = NightMarketOfferInput {
        title: "Lantern deal".to_string(),
        discount_percent: 30,
        product_id: None,
        quantity: 20,
    };
    let offer = backend.create_night_market_offer("tok", &input).await.unwrap();
    assert_eq!(offer.id, NightMarketOfferId::new(6));
    assert_eq!(offer.remaining(), 20);

    backend
        .delete_night_market_offer("tok", offer.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn backend_down_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/dashboard"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).dashboard("tok").await.unwrap_err();
    assert!(err.is_upstream_failure());
    assert!(!err.user_message().contains("gateway"));
}
