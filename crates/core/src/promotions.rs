//! Time-boxed promotions: flash sales and the night market.
//!
//! Both run inside a [`SaleWindow`]. The backend enforces the window and the
//! per-customer limits; these helpers decide what the page shows (countdown,
//! progress bar, which cards can still be flipped).

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{FlashSaleId, NightMarketOfferId, ProductId, discount_percent};

/// Start and end of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Where `now` falls relative to a [`SaleWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upcoming,
    Active,
    Ended,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl SaleWindow {
    /// Phase at `now`. The start is inclusive, the end exclusive.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if now < self.starts_at {
            Phase::Upcoming
        } else if now < self.ends_at {
            Phase::Active
        } else {
            Phase::Ended
        }
    }

    /// Time until the next boundary: the start while upcoming, the end while
    /// active, zero once ended.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.phase(now) {
            Phase::Upcoming => self.starts_at - now,
            Phase::Active => self.ends_at - now,
            Phase::Ended => Duration::zero(),
        }
    }
}

/// Format a countdown as `HH:MM:SS`, prefixed with `Nd ` past a day.
/// Negative durations show as zero.
#[must_use]
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Share of a limited quantity already sold, clamped to 0..=100.
///
/// `None` when the item has no quantity limit.
#[must_use]
pub fn sold_percent(sold: u32, limit: Option<u32>) -> Option<u8> {
    let limit = limit?;
    if limit == 0 {
        return Some(100);
    }
    let percent = (u64::from(sold) * 100 / u64::from(limit)).min(100);
    u8::try_from(percent).ok()
}

/// One discounted product inside a flash sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashSaleItem {
    pub product: Product,
    pub sale_price: Decimal,
    #[serde(default)]
    pub quantity_limit: Option<u32>,
    #[serde(default)]
    pub sold: u32,
}

impl FlashSaleItem {
    /// Percent off the product's regular price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        discount_percent(self.sale_price, Some(self.product.price))
    }

    #[must_use]
    pub fn sold_percent(&self) -> Option<u8> {
        sold_percent(self.sold, self.quantity_limit)
    }

    /// Whether the sale allocation is used up.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.quantity_limit.is_some_and(|limit| self.sold >= limit)
    }
}

/// A flash sale campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashSale {
    pub id: FlashSaleId,
    pub name: String,
    #[serde(flatten)]
    pub window: SaleWindow,
    #[serde(default)]
    pub items: Vec<FlashSaleItem>,
}

/// A personal offer hidden behind a night-market card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightMarketOffer {
    pub id: NightMarketOfferId,
    pub title: String,
    pub discount_percent: u8,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NightMarketOffer {
    /// Whether the revealed offer can no longer be redeemed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A face-down card slot in the night market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightMarketCard {
    pub position: u32,
    /// Present once this customer has flipped the card.
    #[serde(default)]
    pub offer: Option<NightMarketOffer>,
}

/// What a card shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CardState<'a> {
    Hidden,
    Revealed(&'a NightMarketOffer),
    Expired(&'a NightMarketOffer),
}

impl NightMarketCard {
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CardState<'_> {
        match &self.offer {
            None => CardState::Hidden,
            Some(offer) if offer.is_expired(now) => CardState::Expired(offer),
            Some(offer) => CardState::Revealed(offer),
        }
    }
}

/// The current night-market event as seen by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightMarketEvent {
    pub title: String,
    #[serde(flatten)]
    pub window: SaleWindow,
    #[serde(default = "default_max_reveals")]
    pub max_reveals: u32,
    #[serde(default)]
    pub cards: Vec<NightMarketCard>,
}

const fn default_max_reveals() -> u32 {
    1
}

/// Why a card cannot be flipped right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RevealError {
    #[error("the night market has not opened yet")]
    NotOpen,
    #[error("the night market is closed")]
    Closed,
    #[error("you have used all {max} reveals for this event")]
    LimitReached { max: u32 },
    #[error("that card is already revealed")]
    AlreadyRevealed,
    #[error("no such card")]
    UnknownCard,
}

impl NightMarketEvent {
    /// Cards this customer has already flipped.
    #[must_use]
    pub fn reveals_used(&self) -> u32 {
        let used = self.cards.iter().filter(|c| c.offer.is_some()).count();
        u32::try_from(used).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn reveals_left(&self) -> u32 {
        self.max_reveals.saturating_sub(self.reveals_used())
    }

    /// Check whether the card at `position` may be flipped at `now`.
    ///
    /// # Errors
    ///
    /// Returns why the reveal is not allowed: event not running, reveal
    /// limit reached, card already face up, or unknown position.
    pub fn can_reveal(&self, position: u32, now: DateTime<Utc>) -> Result<(), RevealError> {
        match self.window.phase(now) {
            Phase::Upcoming => return Err(RevealError::NotOpen),
            Phase::Ended => return Err(RevealError::Closed),
            Phase::Active => {}
        }
        let card = self
            .cards
            .iter()
            .find(|c| c.position == position)
            .ok_or(RevealError::UnknownCard)?;
        if card.offer.is_some() {
            return Err(RevealError::AlreadyRevealed);
        }
        if self.reveals_left() == 0 {
            return Err(RevealError::LimitReached {
                max: self.max_reveals,
            });
        }
        Ok(())
    }
}

/// Night-market event settings edited in the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightMarketSettings {
    pub title: String,
    #[serde(flatten)]
    pub window: SaleWindow,
    pub max_reveals: u32,
    pub card_count: u32,
}

/// A new night-market offer entered in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightMarketOfferInput {
    pub title: String,
    pub discount_percent: u8,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// How many customers can receive this offer.
    pub quantity: u32,
}

/// Problems with admin promotion input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionInputError {
    #[error("title is required")]
    MissingTitle,
    #[error("discount must be between 1 and 90 percent")]
    DiscountOutOfRange,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("end time must be after start time")]
    EmptyWindow,
    #[error("cards and reveals must be at least 1, with no more reveals than cards")]
    InvalidCardCounts,
}

impl NightMarketOfferInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), PromotionInputError> {
        if self.title.trim().is_empty() {
            return Err(PromotionInputError::MissingTitle);
        }
        if !(1..=90).contains(&self.discount_percent) {
            return Err(PromotionInputError::DiscountOutOfRange);
        }
        if self.quantity == 0 {
            return Err(PromotionInputError::ZeroQuantity);
        }
        Ok(())
    }
}

impl NightMarketSettings {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), PromotionInputError> {
        if self.title.trim().is_empty() {
            return Err(PromotionInputError::MissingTitle);
        }
        if self.window.ends_at <= self.window.starts_at {
            return Err(PromotionInputError::EmptyWindow);
        }
        if self.card_count == 0 || self.max_reveals == 0 || self.max_reveals > self.card_count {
            return Err(PromotionInputError::InvalidCardCounts);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn window() -> SaleWindow {
        SaleWindow {
            starts_at: at(20),
            ends_at: at(23),
        }
    }

    fn offer(id: i64, expires_at: Option<DateTime<Utc>>) -> NightMarketOffer {
        NightMarketOffer {
            id: NightMarketOfferId::new(id),
            title: "Mystery deal".into(),
            discount_percent: 30,
            product: None,
            coupon_code: Some("NIGHT30".into()),
            expires_at,
        }
    }

    fn event(cards: Vec<NightMarketCard>, max_reveals: u32) -> NightMarketEvent {
        NightMarketEvent {
            title: "Night Market".into(),
            window: window(),
            max_reveals,
            cards,
        }
    }

    #[test]
    fn test_phase_boundaries() {
        let w = window();
        assert_eq!(w.phase(at(19)), Phase::Upcoming);
        assert_eq!(w.phase(at(20)), Phase::Active);
        assert_eq!(w.phase(at(22)), Phase::Active);
        assert_eq!(w.phase(at(23)), Phase::Ended);
    }

    #[test]
    fn test_remaining() {
        let w = window();
        assert_eq!(w.remaining(at(18)), Duration::hours(2));
        assert_eq!(w.remaining(at(21)), Duration::hours(2));
        assert_eq!(w.remaining(at(23)), Duration::zero());
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::seconds(3_725)), "01:02:05");
        assert_eq!(format_countdown(Duration::seconds(90_061)), "1d 01:01:01");
        assert_eq!(format_countdown(Duration::seconds(-5)), "00:00:00");
    }

    #[test]
    fn test_sold_percent() {
        assert_eq!(sold_percent(25, Some(100)), Some(25));
        assert_eq!(sold_percent(150, Some(100)), Some(100));
        assert_eq!(sold_percent(1, Some(3)), Some(33));
        assert_eq!(sold_percent(0, Some(0)), Some(100));
        assert_eq!(sold_percent(10, None), None);
    }

    #[test]
    fn test_card_states() {
        let hidden = NightMarketCard {
            position: 0,
            offer: None,
        };
        let live = NightMarketCard {
            position: 1,
            offer: Some(offer(1, Some(at(23)))),
        };
        assert_eq!(hidden.state(at(21)), CardState::Hidden);
        assert!(matches!(live.state(at(21)), CardState::Revealed(_)));
        assert!(matches!(live.state(at(23)), CardState::Expired(_)));
    }

    #[test]
    fn test_can_reveal() {
        let cards = vec![
            NightMarketCard {
                position: 0,
                offer: Some(offer(1, None)),
            },
            NightMarketCard {
                position: 1,
                offer: None,
            },
            NightMarketCard {
                position: 2,
                offer: None,
            },
        ];
        let two_reveals = event(cards.clone(), 2);
        assert_eq!(two_reveals.reveals_left(), 1);
        assert_eq!(two_reveals.can_reveal(1, at(21)), Ok(()));
        assert_eq!(
            two_reveals.can_reveal(0, at(21)),
            Err(RevealError::AlreadyRevealed)
        );
        assert_eq!(two_reveals.can_reveal(9, at(21)), Err(RevealError::UnknownCard));
        assert_eq!(two_reveals.can_reveal(1, at(19)), Err(RevealError::NotOpen));
        assert_eq!(two_reveals.can_reveal(1, at(23)), Err(RevealError::Closed));

        let one_reveal = event(cards, 1);
        assert_eq!(
            one_reveal.can_reveal(1, at(21)),
            Err(RevealError::LimitReached { max: 1 })
        );
    }

    #[test]
    fn test_event_deserializes_flattened_window() {
        let event: NightMarketEvent = serde_json::from_value(serde_json::json!({
            "title": "Friday Night",
            "starts_at": "2025-06-01T20:00:00Z",
            "ends_at": "2025-06-01T23:00:00Z",
            "max_reveals": 2,
            "cards": [{"position": 0}, {"position": 1}]
        }))
        .unwrap();
        assert_eq!(event.window, window());
        assert_eq!(event.reveals_used(), 0);
    }

    #[test]
    fn test_offer_input_validation() {
        let mut input = NightMarketOfferInput {
            title: "Half off socks".into(),
            discount_percent: 50,
            product_id: None,
            quantity: 10,
        };
        assert_eq!(input.validate(), Ok(()));
        input.discount_percent = 95;
        assert_eq!(input.validate(), Err(PromotionInputError::DiscountOutOfRange));
        input.discount_percent = 50;
        input.quantity = 0;
        assert_eq!(input.validate(), Err(PromotionInputError::ZeroQuantity));
        input.title = " ".into();
        assert_eq!(input.validate(), Err(PromotionInputError::MissingTitle));
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = NightMarketSettings {
            title: "Night".into(),
            window: window(),
            max_reveals: 2,
            card_count: 6,
        };
        assert_eq!(settings.validate(), Ok(()));
        settings.max_reveals = 7;
        assert_eq!(settings.validate(), Err(PromotionInputError::InvalidCardCounts));
        settings.max_reveals = 2;
        settings.window.ends_at = settings.window.starts_at;
        assert_eq!(settings.validate(), Err(PromotionInputError::EmptyWindow));
    }
}
