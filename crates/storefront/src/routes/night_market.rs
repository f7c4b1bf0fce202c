//! Night market: face-down cards hiding personal offers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bazaar_core::CurrencyCode;
use bazaar_core::cart::Toast;
use bazaar_core::promotions::{
    CardState, NightMarketCard, NightMarketEvent, NightMarketOffer, Phase, format_countdown,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, is_htmx, session_expired};
use crate::backend::ApiError;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;
use crate::views::Layout;

/// Reveal form data.
#[derive(Debug, Deserialize)]
pub struct RevealForm {
    pub position: u32,
}

/// One card as rendered.
#[derive(Debug, Clone)]
pub struct CardView {
    pub position: u32,
    /// `hidden`, `revealed` or `expired`.
    pub state: &'static str,
    pub title: String,
    pub discount_percent: u8,
    pub coupon_code: Option<String>,
    pub expires: Option<String>,
    pub product_slug: Option<String>,
    pub product_name: Option<String>,
    pub product_price: Option<String>,
    pub can_reveal: bool,
}

impl CardView {
    fn hidden(position: u32, can_reveal: bool) -> Self {
        Self {
            position,
            state: "hidden",
            title: String::new(),
            discount_percent: 0,
            coupon_code: None,
            expires: None,
            product_slug: None,
            product_name: None,
            product_price: None,
            can_reveal,
        }
    }

    fn with_offer(
        position: u32,
        offer: &NightMarketOffer,
        expired: bool,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            position,
            state: if expired { "expired" } else { "revealed" },
            title: offer.title.clone(),
            discount_percent: offer.discount_percent,
            coupon_code: offer.coupon_code.clone(),
            expires: offer
                .expires_at
                .map(|at| at.format("%d/%m %H:%M UTC").to_string()),
            product_slug: offer.product.as_ref().map(|p| p.slug.clone()),
            product_name: offer.product.as_ref().map(|p| p.name.clone()),
            product_price: offer
                .product
                .as_ref()
                .map(|p| currency.format(p.effective_price())),
            can_reveal: false,
        }
    }

    fn new(
        card: &NightMarketCard,
        can_reveal: bool,
        now: DateTime<Utc>,
        currency: CurrencyCode,
    ) -> Self {
        match card.state(now) {
            CardState::Hidden => Self::hidden(card.position, can_reveal),
            CardState::Revealed(offer) => Self::with_offer(card.position, offer, false, currency),
            CardState::Expired(offer) => Self::with_offer(card.position, offer, true, currency),
        }
    }
}

/// Event data for the page.
#[derive(Debug, Clone)]
pub struct EventView {
    pub title: String,
    pub phase: &'static str,
    pub is_active: bool,
    pub deadline: String,
    pub countdown: String,
    pub reveals_left: u32,
    pub max_reveals: u32,
    pub cards: Vec<CardView>,
}

impl EventView {
    fn new(
        event: &NightMarketEvent,
        signed_in: bool,
        now: DateTime<Utc>,
        currency: CurrencyCode,
    ) -> Self {
        let phase = event.window.phase(now);
        let is_active = phase == Phase::Active;
        let can_reveal = signed_in && is_active && event.reveals_left() > 0;
        let deadline = if phase == Phase::Upcoming {
            event.window.starts_at
        } else {
            event.window.ends_at
        };
        Self {
            title: event.title.clone(),
            phase: phase.as_str(),
            is_active,
            deadline: deadline.to_rfc3339(),
            countdown: format_countdown(event.window.remaining(now)),
            reveals_left: event.reveals_left(),
            max_reveals: event.max_reveals,
            cards: event
                .cards
                .iter()
                .map(|card| CardView::new(card, can_reveal, now, currency))
                .collect(),
        }
    }
}

/// Night market page template.
#[derive(Template, WebTemplate)]
#[template(path = "night_market.html")]
pub struct NightMarketTemplate {
    pub layout: Layout,
    pub event: Option<EventView>,
    pub signed_in: bool,
}

/// Revealed card fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/night_market_card.html")]
pub struct CardTemplate {
    pub card: CardView,
    /// Updated out of band.
    pub reveals_left: u32,
}

/// Display the current event.
#[instrument(skip(state, layout, customer))]
pub async fn show(
    State(state): State<AppState>,
    mut layout: Layout,
    OptionalAuth(customer): OptionalAuth,
) -> impl IntoResponse {
    let token = customer.as_ref().map(|c| c.token.as_str());
    let event = state.backend().night_market(token).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load night market");
        layout.toasts.push(Toast::error(e.user_message()));
        None
    });

    let signed_in = customer.is_some();
    NightMarketTemplate {
        layout,
        event: event
            .as_ref()
            .map(|e| EventView::new(e, signed_in, Utc::now(), state.config().currency)),
        signed_in,
    }
}

/// Reveal one card.
#[instrument(skip(state, session, customer, headers))]
pub async fn reveal(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    headers: HeaderMap,
    Form(form): Form<RevealForm>,
) -> Response {
    let htmx = is_htmx(&headers);
    let backend = state.backend();
    let now = Utc::now();

    let event = match backend.night_market(Some(&customer.token)).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            return inline_error(StatusCode::NOT_FOUND, "There is no night market right now.");
        }
        Err(ApiError::Unauthorized) => {
            return session_expired(&session, "/night-market", htmx).await;
        }
        Err(e) => return inline_error(StatusCode::BAD_GATEWAY, e.user_message()),
    };

    if let Err(e) = event.can_reveal(form.position, now) {
        return inline_error(StatusCode::CONFLICT, sentence(&e.to_string()));
    }

    let offer = match backend.reveal(&customer.token, form.position).await {
        Ok(offer) => offer,
        Err(ApiError::Unauthorized) => {
            return session_expired(&session, "/night-market", htmx).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Reveal rejected");
            return inline_error(StatusCode::CONFLICT, e.user_message());
        }
    };

    let position = form.position.to_string();
    add_breadcrumb("night_market", "Card revealed", Some(&[("position", position.as_str())]));

    CardTemplate {
        card: CardView::with_offer(
            form.position,
            &offer,
            offer.is_expired(now),
            state.config().currency,
        ),
        reveals_left: event.reveals_left().saturating_sub(1),
    }
    .into_response()
}

fn sentence(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> NightMarketEvent {
        serde_json::from_value(serde_json::json!({
            "title": "Night Market",
            "starts_at": "2025-07-01T20:00:00Z",
            "ends_at": "2025-07-02T02:00:00Z",
            "max_reveals": 2,
            "cards": [
                {"position": 0},
                {"position": 1, "offer": {
                    "id": 9, "title": "Mystery mug", "discount_percent": 30,
                    "coupon_code": "NM-30", "expires_at": "2025-07-01T23:00:00Z"
                }},
                {"position": 2}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_event_view_during_event() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 22, 0, 0).unwrap();
        let view = EventView::new(&event(), true, now, CurrencyCode::VND);
        assert!(view.is_active);
        assert_eq!(view.reveals_left, 1);
        assert_eq!(view.cards[0].state, "hidden");
        assert!(view.cards[0].can_reveal);
        assert_eq!(view.cards[1].state, "revealed");
        assert_eq!(view.cards[1].coupon_code.as_deref(), Some("NM-30"));
        assert_eq!(view.countdown, "04:00:00");
    }

    #[test]
    fn test_guests_cannot_reveal() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 22, 0, 0).unwrap();
        let view = EventView::new(&event(), false, now, CurrencyCode::VND);
        assert!(!view.cards[0].can_reveal);
    }

    #[test]
    fn test_offer_expires() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 23, 30, 0).unwrap();
        let view = EventView::new(&event(), true, now, CurrencyCode::VND);
        assert_eq!(view.cards[1].state, "expired");
    }

    #[test]
    fn test_sentence() {
        assert_eq!(sentence("the night market is closed"), "The night market is closed.");
    }
}
