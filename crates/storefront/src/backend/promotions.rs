//! Coupons, flash sales, lucky spin, night market and wishlist sharing.

use bazaar_core::catalog::Product;
use bazaar_core::coupon::CouponCheck;
use bazaar_core::lucky_spin::{SpinResult, WheelState};
use bazaar_core::promotions::{FlashSale, NightMarketEvent, NightMarketOffer};
use bazaar_core::{ProductId, ShareToken};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiError, BackendClient, segment};

#[derive(Serialize)]
struct CouponCheckRequest<'a> {
    code: &'a str,
    subtotal: Decimal,
}

#[derive(Serialize)]
struct RevealRequest {
    position: u32,
}

#[derive(Serialize)]
struct ShareRequest<'a> {
    product_ids: &'a [ProductId],
}

/// Response of `POST /api/wishlist/share`.
#[derive(Debug, Clone, Deserialize)]
pub struct WishlistShare {
    #[serde(alias = "shareToken")]
    pub token: String,
}

/// A wishlist someone shared.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedWishlist {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default, alias = "ownerName")]
    pub owner_name: Option<String>,
}

impl BackendClient {
    /// Ask the backend whether a coupon applies to a subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. An unusable coupon is not
    /// an error; it comes back with `valid: false`.
    #[instrument(skip(self))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponCheck, ApiError> {
        let body = CouponCheckRequest { code, subtotal };
        match self.post("/api/coupons/validate", &body, None).await {
            Err(ApiError::Api { status, message }) if status < 500 => Ok(CouponCheck {
                valid: false,
                discount: Decimal::ZERO,
                message: Some(message),
            }),
            Err(ApiError::NotFound(_)) => Ok(CouponCheck {
                valid: false,
                discount: Decimal::ZERO,
                message: Some("This coupon does not exist.".to_string()),
            }),
            other => other,
        }
    }

    /// Flash sales that are running or about to start.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn active_flash_sales(&self) -> Result<Vec<FlashSale>, ApiError> {
        self.get("/api/flash-sales/active", &[], None).await
    }

    /// Wheel segments, plus the customer's remaining spins when signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn lucky_spin(&self, token: Option<&str>) -> Result<WheelState, ApiError> {
        self.get("/api/lucky-spin/config", &[], token).await
    }

    /// Spin the wheel. The backend picks the segment.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the customer has no spins left.
    #[instrument(skip(self, token))]
    pub async fn spin(&self, token: &str) -> Result<SpinResult, ApiError> {
        self.post("/api/lucky-spin/spin", &serde_json::json!({}), Some(token))
            .await
    }

    /// The current night market, or `None` when there is no event.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn night_market(
        &self,
        token: Option<&str>,
    ) -> Result<Option<NightMarketEvent>, ApiError> {
        match self.get("/api/night-market/current", &[], token).await {
            Ok(event) => Ok(Some(event)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reveal the card at `position`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the reveal limit is reached or the
    /// event is closed.
    #[instrument(skip(self, token))]
    pub async fn reveal(&self, token: &str, position: u32) -> Result<NightMarketOffer, ApiError> {
        self.post("/api/night-market/reveal", &RevealRequest { position }, Some(token))
            .await
    }

    /// Publish a wishlist and get its share token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn share_wishlist(
        &self,
        product_ids: &[ProductId],
    ) -> Result<WishlistShare, ApiError> {
        self.post("/api/wishlist/share", &ShareRequest { product_ids }, None)
            .await
    }

    /// Load a shared wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown token.
    #[instrument(skip(self), fields(token = %token))]
    pub async fn shared_wishlist(&self, token: &ShareToken) -> Result<SharedWishlist, ApiError> {
        self.get(
            &format!("/api/wishlist/share/{}", segment(token.as_str())),
            &[],
            None,
        )
        .await
    }
}
