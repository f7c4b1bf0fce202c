//! Orders, products, customers and coupons.

use bazaar_core::catalog::{Paginated, Product};
use bazaar_core::checkout::Order;
use bazaar_core::coupon::{Coupon, NewCoupon};
use bazaar_core::customer::Customer;
use bazaar_core::{CouponId, OrderId, OrderStatus};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiError, BackendClient};

/// Rows per admin list page.
pub const PAGE_SIZE: u32 = 20;

/// Search, status filter and page for the admin list screens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl ListQuery {
    /// Trimmed search text, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Status filter, only when it names a real status.
    #[must_use]
    pub fn status(&self) -> Option<OrderStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page().to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(search) = self.search() {
            params.push(("search", search.to_string()));
        }
        if let Some(status) = self.status() {
            params.push(("status", status.as_str().to_string()));
        }
        params
    }
}

#[derive(Serialize)]
struct StatusUpdate {
    status: OrderStatus,
}

impl BackendClient {
    /// A page of orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_orders(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<Paginated<Order>, ApiError> {
        self.get(token, "/api/admin/orders", &query.params()).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend refuses the transition.
    #[instrument(skip(self, token))]
    pub async fn update_order_status(
        &self,
        token: &str,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.send_json(
            Method::PUT,
            Some(token),
            &format!("/api/admin/orders/{id}/status"),
            &StatusUpdate { status },
        )
        .await
    }

    /// A page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_products(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<Paginated<Product>, ApiError> {
        self.get(token, "/api/admin/products", &query.params()).await
    }

    /// A page of customers.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn admin_customers(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<Paginated<Customer>, ApiError> {
        self.get(token, "/api/admin/customers", &query.params()).await
    }

    /// Every coupon, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn coupons(&self, token: &str) -> Result<Vec<Coupon>, ApiError> {
        self.get(token, "/api/admin/coupons", &[]).await
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects it (duplicate code).
    #[instrument(skip(self, token, coupon), fields(code = %coupon.code))]
    pub async fn create_coupon(&self, token: &str, coupon: &NewCoupon) -> Result<Coupon, ApiError> {
        self.send_json(Method::POST, Some(token), "/api/admin/coupons", coupon)
            .await
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it is already gone.
    #[instrument(skip(self, token))]
    pub async fn delete_coupon(&self, token: &str, id: CouponId) -> Result<(), ApiError> {
        self.delete(token, &format!("/api/admin/coupons/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_params() {
        let query = ListQuery {
            search: Some("  ".to_string()),
            status: Some("shipping".to_string()),
            page: Some(0),
        };
        let params = query.params();
        assert!(params.contains(&("page", "1".to_string())));
        assert!(params.contains(&("status", "shipping".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "search"));
    }

    #[test]
    fn test_list_query_ignores_unknown_status() {
        let query = ListQuery {
            status: Some("lost".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query.status(), None);
    }
}
