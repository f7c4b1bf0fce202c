//! Admin login and the dashboard summary.

use bazaar_core::AdminRole;
use bazaar_core::checkout::Order;
use rust_decimal::Decimal;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiError, BackendClient};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// The admin account behind a token.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminProfile {
    pub id: i64,
    #[serde(alias = "fullName", alias = "full_name")]
    pub name: String,
    pub email: String,
    pub role: AdminRole,
}

/// Response of `POST /api/admin/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminAuthResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
    #[serde(alias = "user")]
    pub admin: AdminProfile,
}

/// Store totals for the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardStats {
    #[serde(default, alias = "totalOrders")]
    pub total_orders: u64,
    #[serde(default, alias = "totalRevenue")]
    pub total_revenue: Decimal,
    #[serde(default, alias = "totalCustomers")]
    pub total_customers: u64,
    #[serde(default, alias = "totalProducts")]
    pub total_products: u64,
    #[serde(default, alias = "pendingOrders")]
    pub pending_orders: u64,
    #[serde(default, alias = "recentOrders")]
    pub recent_orders: Vec<Order>,
}

impl BackendClient {
    /// Exchange admin credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` or `ApiError::Api` for bad
    /// credentials, or an error if the API request fails.
    #[instrument(skip(self, password))]
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminAuthResponse, ApiError> {
        let body = LoginRequest { email, password };
        self.send_json(Method::POST, None, "/api/admin/login", &body)
            .await
    }

    /// Store totals and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self, token))]
    pub async fn dashboard(&self, token: &str) -> Result<DashboardStats, ApiError> {
        self.get(token, "/api/admin/dashboard", &[]).await
    }
}
