//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use bazaar_core::catalog::{Category, ProductSort};
use tower_sessions::Session;
use tracing::instrument;

use super::flash_sales::FlashSaleView;
use super::{or_empty, saved_lists};
use crate::backend::ProductQuery;
use crate::filters;
use crate::state::AppState;
use crate::views::{Layout, ProductCard, cards};

const HOME_GRID_SIZE: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub new_arrivals: Vec<ProductCard>,
    pub best_sellers: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub flash_sale: Option<FlashSaleView>,
}

/// Display the home page.
///
/// Each section loads independently; a failed section renders empty.
#[instrument(skip(state, session, layout))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> impl IntoResponse {
    let backend = state.backend();
    let newest = ProductQuery {
        limit: HOME_GRID_SIZE,
        ..ProductQuery::default()
    };
    let best = ProductQuery {
        limit: HOME_GRID_SIZE,
        sort: ProductSort::BestSelling,
        ..ProductQuery::default()
    };

    let (newest, best, categories, sales) = tokio::join!(
        backend.products(&newest),
        backend.products(&best),
        backend.categories(),
        backend.active_flash_sales(),
    );

    let (wishlist, compare) = saved_lists(&session).await;
    let currency = state.config().currency;
    let now = chrono::Utc::now();

    let new_arrivals = or_empty(newest.map(|p| p.items), "new arrivals");
    let best_sellers = or_empty(best.map(|p| p.items), "best sellers");

    HomeTemplate {
        layout,
        new_arrivals: cards(&new_arrivals, currency, &wishlist, &compare),
        best_sellers: cards(&best_sellers, currency, &wishlist, &compare),
        categories: or_empty(categories, "categories"),
        flash_sale: or_empty(sales, "flash sales")
            .iter()
            .map(|sale| FlashSaleView::new(sale, currency, now))
            .find(|view| view.is_active),
    }
}
