//! Night market event settings and offers.
//!
//! Times are entered and shown in UTC.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::cart::Toast;
use bazaar_core::promotions::{NightMarketOfferInput, NightMarketSettings, Phase, SaleWindow};
use bazaar_core::{NightMarketOfferId, ProductId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{page_data, sentence, session_expired, write_failed};
use crate::backend::{ApiError, NightMarketOfferSummary};
use crate::filters;
use crate::middleware::{RequireAdminAuth, RequireSuperAdmin};
use crate::models::CurrentAdmin;
use crate::models::session::push_toast;
use crate::state::AppState;
use crate::views::{Layout, datetime_input};

const NIGHT_MARKET_PATH: &str = "/night-market";
const DATETIME_INPUT: &str = "%Y-%m-%dT%H:%M";

/// Event settings form, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: String,
    #[serde(default)]
    pub max_reveals: String,
    #[serde(default)]
    pub card_count: String,
}

fn parse_time(raw: &str, field: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(raw.trim(), DATETIME_INPUT)
        .map(|t| t.and_utc())
        .map_err(|_| format!("{field} must be a date and time."))
}

fn parse_count(raw: &str, field: &str) -> Result<u32, String> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| format!("{field} must be a whole number."))
}

impl SettingsForm {
    fn from_settings(settings: &NightMarketSettings) -> Self {
        Self {
            title: settings.title.clone(),
            starts_at: datetime_input(settings.window.starts_at),
            ends_at: datetime_input(settings.window.ends_at),
            max_reveals: settings.max_reveals.to_string(),
            card_count: settings.card_count.to_string(),
        }
    }

    /// Parse and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for the first problem found.
    pub fn to_settings(&self) -> Result<NightMarketSettings, String> {
        let settings = NightMarketSettings {
            title: self.title.trim().to_string(),
            window: SaleWindow {
                starts_at: parse_time(&self.starts_at, "Start")?,
                ends_at: parse_time(&self.ends_at, "End")?,
            },
            max_reveals: parse_count(&self.max_reveals, "Reveals per customer")?,
            card_count: parse_count(&self.card_count, "Card count")?,
        };
        settings.validate().map_err(sentence)?;
        Ok(settings)
    }
}

/// New offer form, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub discount_percent: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: String,
}

impl OfferForm {
    /// Parse and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for the first problem found.
    pub fn to_input(&self) -> Result<NightMarketOfferInput, String> {
        let discount_percent = self
            .discount_percent
            .trim()
            .parse::<u8>()
            .map_err(|_| "Discount must be a whole number of percent.".to_string())?;
        let product_id = match self.product_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i64>()
                    .map(ProductId::new)
                    .map_err(|_| "Product id must be a number.".to_string())?,
            ),
        };
        let input = NightMarketOfferInput {
            title: self.title.trim().to_string(),
            discount_percent,
            product_id,
            quantity: parse_count(&self.quantity, "Quantity")?,
        };
        input.validate().map_err(sentence)?;
        Ok(input)
    }
}

/// One offer in the table.
#[derive(Debug, Clone)]
pub struct OfferRow {
    pub id: i64,
    pub title: String,
    pub discount: String,
    pub product: String,
    pub quantity: u32,
    pub claimed: u32,
    pub remaining: u32,
}

impl From<&NightMarketOfferSummary> for OfferRow {
    fn from(offer: &NightMarketOfferSummary) -> Self {
        Self {
            id: offer.id.as_i64(),
            title: offer.title.clone(),
            discount: format!("{}%", offer.discount_percent),
            product: offer
                .product_id
                .map(|id| format!("#{id}"))
                .unwrap_or_else(|| "Any product".to_string()),
            quantity: offer.quantity,
            claimed: offer.claimed,
            remaining: offer.remaining(),
        }
    }
}

/// Event status line.
fn phase_label(settings: Option<&NightMarketSettings>, now: DateTime<Utc>) -> &'static str {
    match settings.map(|s| s.window.phase(now)) {
        None => "Not scheduled",
        Some(Phase::Upcoming) => "Upcoming",
        Some(Phase::Active) => "Live now",
        Some(Phase::Ended) => "Ended",
    }
}

/// Night market page template.
#[derive(Template, WebTemplate)]
#[template(path = "night_market.html")]
pub struct NightMarketTemplate {
    pub layout: Layout,
    pub phase: &'static str,
    pub settings: SettingsForm,
    pub settings_error: Option<String>,
    pub offers: Vec<OfferRow>,
    pub offer: OfferForm,
    pub offer_error: Option<String>,
    pub can_edit: bool,
}

/// Data for the page. `Err` carries the response for an expired session.
async fn load(
    state: &AppState,
    session: &Session,
    layout: &mut Layout,
    admin: &CurrentAdmin,
) -> Result<(Option<NightMarketSettings>, Vec<OfferRow>), Response> {
    let backend = state.backend();
    let (settings, offers) = tokio::join!(
        backend.night_market_settings(&admin.token),
        backend.night_market_offers(&admin.token),
    );
    let settings = page_data(settings, None, session, layout).await?;
    let offers = page_data(offers, Vec::new(), session, layout).await?;
    Ok((settings, offers.iter().map(OfferRow::from).collect()))
}

/// Render the page around a rejected form.
async fn rerender(
    state: &AppState,
    session: &Session,
    mut layout: Layout,
    admin: &CurrentAdmin,
    edit: impl FnOnce(&mut NightMarketTemplate),
) -> Response {
    let (settings, offers) = match load(state, session, &mut layout, admin).await {
        Ok(data) => data,
        Err(response) => return response,
    };
    let mut page = NightMarketTemplate {
        layout,
        phase: phase_label(settings.as_ref(), Utc::now()),
        settings: settings
            .as_ref()
            .map(SettingsForm::from_settings)
            .unwrap_or_default(),
        settings_error: None,
        offers,
        offer: OfferForm::default(),
        offer_error: None,
        can_edit: true,
    };
    edit(&mut page);
    page.into_response()
}

/// Display settings and offers.
#[instrument(skip(state, session, layout, admin))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Response {
    let (settings, offers) = match load(&state, &session, &mut layout, &admin).await {
        Ok(data) => data,
        Err(response) => return response,
    };

    NightMarketTemplate {
        layout,
        phase: phase_label(settings.as_ref(), Utc::now()),
        settings: settings
            .as_ref()
            .map_or_else(
                || SettingsForm {
                    max_reveals: "3".to_string(),
                    card_count: "9".to_string(),
                    ..SettingsForm::default()
                },
                SettingsForm::from_settings,
            ),
        settings_error: None,
        offers,
        offer: OfferForm::default(),
        offer_error: None,
        can_edit: admin.can_configure_promotions(),
    }
    .into_response()
}

/// Save event settings.
#[instrument(skip(state, session, layout, admin, form))]
pub async fn save_settings(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Form(form): Form<SettingsForm>,
) -> Response {
    let error = match form.to_settings() {
        Ok(settings) => match state
            .backend()
            .save_night_market_settings(&admin.token, &settings)
            .await
        {
            Ok(saved) => {
                tracing::info!(
                    title = %saved.title,
                    admin_id = admin.id,
                    "Night market settings saved"
                );
                push_toast(&session, Toast::success("Night market settings saved.")).await;
                return Redirect::to(NIGHT_MARKET_PATH).into_response();
            }
            Err(ApiError::Unauthorized) => {
                return session_expired(&session, NIGHT_MARKET_PATH, false).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Night market settings rejected");
                e.user_message()
            }
        },
        Err(message) => message,
    };

    rerender(&state, &session, layout, &admin, |page| {
        page.settings = form;
        page.settings_error = Some(error);
    })
    .await
}

/// Add an offer.
#[instrument(skip(state, session, layout, admin, form))]
pub async fn create_offer(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Form(form): Form<OfferForm>,
) -> Response {
    let error = match form.to_input() {
        Ok(input) => match state
            .backend()
            .create_night_market_offer(&admin.token, &input)
            .await
        {
            Ok(offer) => {
                tracing::info!(
                    offer_id = %offer.id,
                    admin_id = admin.id,
                    "Night market offer added"
                );
                push_toast(&session, Toast::success(format!("Offer \"{}\" added.", offer.title)))
                    .await;
                return Redirect::to(NIGHT_MARKET_PATH).into_response();
            }
            Err(ApiError::Unauthorized) => {
                return session_expired(&session, NIGHT_MARKET_PATH, false).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Night market offer rejected");
                e.user_message()
            }
        },
        Err(message) => message,
    };

    rerender(&state, &session, layout, &admin, |page| {
        page.offer = form;
        page.offer_error = Some(error);
    })
    .await
}

/// Remove an offer.
#[instrument(skip(state, session, admin))]
pub async fn delete_offer(
    State(state): State<AppState>,
    session: Session,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<i64>,
) -> Response {
    match state
        .backend()
        .delete_night_market_offer(&admin.token, NightMarketOfferId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(offer_id = id, admin_id = admin.id, "Night market offer removed");
            push_toast(&session, Toast::success("Offer removed.")).await;
            Redirect::to(NIGHT_MARKET_PATH).into_response()
        }
        Err(e) => write_failed(&session, &e, NIGHT_MARKET_PATH).await,
    }
}
