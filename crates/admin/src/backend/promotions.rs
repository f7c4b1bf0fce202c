//! Lucky spin and night market configuration.

use bazaar_core::lucky_spin::LuckySpinConfig;
use bazaar_core::promotions::{NightMarketOfferInput, NightMarketSettings};
use bazaar_core::{NightMarketOfferId, ProductId};
use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use super::{ApiError, BackendClient};

/// A night-market offer as listed for admins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NightMarketOfferSummary {
    pub id: NightMarketOfferId,
    pub title: String,
    #[serde(alias = "discountPercent")]
    pub discount_percent: u8,
    #[serde(default, alias = "productId")]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub quantity: u32,
    /// Customers who have revealed this offer.
    #[serde(default, alias = "claimedCount")]
    pub claimed: u32,
}

impl NightMarketOfferSummary {
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.claimed)
    }
}

impl BackendClient {
    /// Current wheel configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn lucky_spin_config(&self, token: &str) -> Result<LuckySpinConfig, ApiError> {
        self.get(token, "/api/lucky-spin/admin/config", &[]).await
    }

    /// Replace the wheel configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects the configuration.
    #[instrument(skip(self, token, config), fields(segments = config.segments.len()))]
    pub async fn save_lucky_spin_config(
        &self,
        token: &str,
        config: &LuckySpinConfig,
    ) -> Result<LuckySpinConfig, ApiError> {
        self.send_json(
            Method::PUT,
            Some(token),
            "/api/lucky-spin/admin/config",
            config,
        )
        .await
    }

    /// The configured night-market event, or `None` when none is set up.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn night_market_settings(
        &self,
        token: &str,
    ) -> Result<Option<NightMarketSettings>, ApiError> {
        match self.get(token, "/api/night-market/admin/event", &[]).await {
            Ok(settings) => Ok(Some(settings)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace the night-market event.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects the settings.
    #[instrument(skip(self, token, settings), fields(title = %settings.title))]
    pub async fn save_night_market_settings(
        &self,
        token: &str,
        settings: &NightMarketSettings,
    ) -> Result<NightMarketSettings, ApiError> {
        self.send_json(
            Method::PUT,
            Some(token),
            "/api/night-market/admin/event",
            settings,
        )
        .await
    }

    /// Offers in the night-market pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn night_market_offers(
        &self,
        token: &str,
    ) -> Result<Vec<NightMarketOfferSummary>, ApiError> {
        self.get(token, "/api/night-market/admin/offers", &[]).await
    }

    /// Add an offer to the pool.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the backend rejects the offer.
    #[instrument(skip(self, token, offer), fields(title = %offer.title))]
    pub async fn create_night_market_offer(
        &self,
        token: &str,
        offer: &NightMarketOfferInput,
    ) -> Result<NightMarketOfferSummary, ApiError> {
        self.send_json(
            Method::POST,
            Some(token),
            "/api/night-market/admin/offers",
            offer,
        )
        .await
    }

    /// Remove an offer from the pool.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if it is already gone.
    #[instrument(skip(self, token))]
    pub async fn delete_night_market_offer(
        &self,
        token: &str,
        id: NightMarketOfferId,
    ) -> Result<(), ApiError> {
        self.delete(token, &format!("/api/night-market/admin/offers/{id}"))
            .await
    }
}
