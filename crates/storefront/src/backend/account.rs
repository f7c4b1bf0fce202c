//! Customer auth, profile and order endpoints.

use bazaar_core::checkout::{Order, OrderRequest};
use bazaar_core::customer::{AuthResponse, Credentials, Customer, ProfileUpdate, Registration};
use tracing::instrument;

use super::{ApiError, BackendClient};

impl BackendClient {
    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` or `ApiError::Api` for bad
    /// credentials, or an error if the API request fails.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post("/api/auth/login", credentials, None).await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects the registration
    /// (for example, the email is taken).
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.post("/api/auth/register", registration, None).await
    }

    /// Get the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<Customer, ApiError> {
        self.get("/api/customers/me", &[], Some(token)).await
    }

    /// Update the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self, token, update))]
    pub async fn update_me(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Customer, ApiError> {
        self.put("/api/customers/me", update, Some(token)).await
    }

    /// Order history of the signed-in customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        self.get("/api/orders/my", &[], Some(token)).await
    }

    /// Place an order. Guests may check out without a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects the order (stock
    /// changed, coupon expired).
    #[instrument(skip(self, token, order), fields(items = order.items.len()))]
    pub async fn place_order(
        &self,
        token: Option<&str>,
        order: &OrderRequest,
    ) -> Result<Order, ApiError> {
        self.post("/api/orders", order, token).await
    }
}
