//! Flash sale page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use bazaar_core::CurrencyCode;
use bazaar_core::promotions::{FlashSale, FlashSaleItem, Phase, format_countdown};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::filters;
use crate::state::AppState;
use crate::views::Layout;

/// A flash sale item with display strings.
#[derive(Debug, Clone)]
pub struct FlashItemView {
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub sale_price: String,
    pub regular_price: String,
    pub discount_percent: Option<u8>,
    /// `None` when the item has no quantity limit.
    pub sold_percent: Option<u8>,
    pub sold_out: bool,
}

impl FlashItemView {
    fn new(item: &FlashSaleItem, currency: CurrencyCode) -> Self {
        Self {
            slug: item.product.slug.clone(),
            name: item.product.name.clone(),
            image: item.product.primary_image().map(String::from),
            sale_price: currency.format(item.sale_price),
            regular_price: currency.format(item.product.price),
            discount_percent: item.discount_percent(),
            sold_percent: item.sold_percent(),
            sold_out: item.is_sold_out(),
        }
    }
}

/// A flash sale as rendered at request time.
///
/// The countdown is rendered server-side and kept ticking by `bazaar.js`
/// from `deadline`.
#[derive(Debug, Clone)]
pub struct FlashSaleView {
    pub name: String,
    pub phase: &'static str,
    pub is_active: bool,
    pub is_upcoming: bool,
    /// RFC 3339 instant the countdown runs to: the start for upcoming
    /// sales, the end otherwise.
    pub deadline: String,
    pub countdown: String,
    pub items: Vec<FlashItemView>,
}

impl FlashSaleView {
    /// Shape a sale relative to `now`.
    #[must_use]
    pub fn new(sale: &FlashSale, currency: CurrencyCode, now: DateTime<Utc>) -> Self {
        let phase = sale.window.phase(now);
        let deadline = match phase {
            Phase::Upcoming => sale.window.starts_at,
            Phase::Active | Phase::Ended => sale.window.ends_at,
        };
        Self {
            name: sale.name.clone(),
            phase: phase.as_str(),
            is_active: phase == Phase::Active,
            is_upcoming: phase == Phase::Upcoming,
            deadline: deadline.to_rfc3339(),
            countdown: format_countdown(sale.window.remaining(now)),
            items: sale
                .items
                .iter()
                .map(|item| FlashItemView::new(item, currency))
                .collect(),
        }
    }
}

/// Flash sales page template.
#[derive(Template, WebTemplate)]
#[template(path = "flash_sales.html")]
pub struct FlashSalesTemplate {
    pub layout: Layout,
    pub sales: Vec<FlashSaleView>,
}

/// Display running and upcoming flash sales.
#[instrument(skip(state, layout))]
pub async fn index(State(state): State<AppState>, mut layout: Layout) -> impl IntoResponse {
    let now = Utc::now();
    let currency = state.config().currency;

    let sales = match state.backend().active_flash_sales().await {
        Ok(sales) => sales,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load flash sales");
            layout.toasts.push(bazaar_core::cart::Toast::error(e.user_message()));
            Vec::new()
        }
    };

    let mut sales: Vec<FlashSaleView> = sales
        .iter()
        .map(|sale| FlashSaleView::new(sale, currency, now))
        .filter(|view| view.phase != Phase::Ended.as_str())
        .collect();
    // Running sales first
    sales.sort_by_key(|view| !view.is_active);

    FlashSalesTemplate { layout, sales }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale() -> FlashSale {
        serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Midnight Deals",
            "starts_at": "2025-06-01T00:00:00Z",
            "ends_at": "2025-06-01T06:00:00Z",
            "items": [{
                "product": {"id": 1, "name": "Lamp", "slug": "lamp", "price": 200000},
                "sale_price": 150000,
                "quantity_limit": 10,
                "sold": 4
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_active_sale_counts_down_to_end() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 4, 30, 0).unwrap();
        let view = FlashSaleView::new(&sale(), CurrencyCode::VND, now);
        assert!(view.is_active);
        assert_eq!(view.countdown, "01:30:00");
        assert!(view.deadline.starts_with("2025-06-01T06:00:00"));
        assert_eq!(view.items[0].discount_percent, Some(25));
        assert_eq!(view.items[0].sold_percent, Some(40));
        assert_eq!(view.items[0].sale_price, "150.000₫");
    }

    #[test]
    fn test_upcoming_sale_counts_down_to_start() {
        let now = Utc.with_ymd_and_hms(2025, 5, 31, 23, 0, 0).unwrap();
        let view = FlashSaleView::new(&sale(), CurrencyCode::VND, now);
        assert!(view.is_upcoming);
        assert!(!view.is_active);
        assert_eq!(view.countdown, "01:00:00");
    }
}
