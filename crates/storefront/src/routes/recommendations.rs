//! "You may also like" fragment, loaded lazily below the product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use bazaar_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use super::saved_lists;
use crate::filters;
use crate::state::AppState;
use crate::views::{ProductCard, cards};

const MAX_RELATED: usize = 4;

/// Recommendations fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/recommendations.html")]
pub struct RecommendationsTemplate {
    pub products: Vec<ProductCard>,
}

/// Products related to `product_id`, excluding the product itself.
///
/// Failures render an empty fragment; the section is optional.
#[instrument(skip(state, session))]
pub async fn related(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<i64>,
) -> impl IntoResponse {
    let product_id = ProductId::new(product_id);
    let related = state
        .backend()
        .related_products(product_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load related products");
            Vec::new()
        });
    let (wishlist, compare) = saved_lists(&session).await;

    RecommendationsTemplate {
        products: cards(
            related
                .iter()
                .filter(|p| p.id != product_id)
                .take(MAX_RELATED),
            state.config().currency,
            &wishlist,
            &compare,
        ),
    }
}
