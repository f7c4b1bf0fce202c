//! Side-by-side product comparison.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use bazaar_core::CurrencyCode;
use bazaar_core::ProductId;
use bazaar_core::cart::{CompareList, Toast};
use bazaar_core::catalog::Product;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{inline_error, is_htmx};
use crate::error::AppError;
use crate::filters;
use crate::models::session::{self, keys, push_toast};
use crate::state::AppState;
use crate::views::Layout;

const DESCRIPTION_CHARS: usize = 160;

/// Compare form data.
#[derive(Debug, Deserialize)]
pub struct CompareForm {
    pub product_id: ProductId,
}

/// One column of the comparison table.
#[derive(Debug, Clone)]
pub struct CompareColumn {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub compare_at: Option<String>,
    pub category: String,
    pub rating: Option<f32>,
    pub review_count: u32,
    pub colors: String,
    pub sizes: String,
    pub availability: String,
    pub summary: String,
}

impl CompareColumn {
    fn new(product: &Product, currency: CurrencyCode) -> Self {
        let join = |values: Vec<String>| {
            if values.is_empty() {
                "-".to_string()
            } else {
                values.join(", ")
            }
        };
        let stock = product.total_stock();
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            image: product.primary_image().map(String::from),
            price: currency.format(product.effective_price()),
            compare_at: product.compare_at_price().map(|p| currency.format(p)),
            category: product
                .category
                .as_ref()
                .map_or_else(|| "-".to_string(), |c| c.name.clone()),
            rating: product.rating.filter(|_| product.review_count > 0),
            review_count: product.review_count,
            colors: join(product.unique_colors().into_iter().map(|c| c.name).collect()),
            sizes: join(product.unique_sizes()),
            availability: if stock > 0 {
                format!("{stock} in stock")
            } else {
                "Out of stock".to_string()
            },
            summary: excerpt(&product.description, DESCRIPTION_CHARS),
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let cut = cut.rsplit_once(' ').map_or(cut.as_str(), |(head, _)| head);
    format!("{}…", cut.trim_end())
}

/// Compare page template.
#[derive(Template, WebTemplate)]
#[template(path = "compare.html")]
pub struct CompareTemplate {
    pub layout: Layout,
    pub columns: Vec<CompareColumn>,
    pub max_items: usize,
}

/// Compare toggle fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/compare_button.html")]
pub struct CompareButtonTemplate {
    pub product_id: ProductId,
    pub in_compare: bool,
}

/// Display the comparison table.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
) -> Result<impl IntoResponse, AppError> {
    let compare: CompareList = session::load(&session, keys::COMPARE).await?;

    let products = if compare.is_empty() {
        Vec::new()
    } else {
        state
            .backend()
            .products_by_ids(compare.ids())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load compared products");
                layout.toasts.push(Toast::error(e.user_message()));
                Vec::new()
            })
    };

    let currency = state.config().currency;
    Ok(CompareTemplate {
        layout,
        columns: products
            .iter()
            .map(|p| CompareColumn::new(p, currency))
            .collect(),
        max_items: CompareList::MAX_ITEMS,
    })
}

/// Add a product to the comparison.
#[instrument(skip(session, headers))]
pub async fn add(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CompareForm>,
) -> Result<Response, AppError> {
    let htmx = is_htmx(&headers);
    let mut compare: CompareList = session::load(&session, keys::COMPARE).await?;

    if let Err(e) = compare.add(form.product_id) {
        let message = format!("{}. Remove one to add another.", capitalize(&e.to_string()));
        return Ok(if htmx {
            inline_error(StatusCode::CONFLICT, message)
        } else {
            push_toast(&session, Toast::error(message)).await;
            Redirect::to("/compare").into_response()
        });
    }
    session::save(&session, keys::COMPARE, &compare).await?;

    if htmx {
        Ok((
            AppendHeaders([("HX-Trigger", "compare-updated")]),
            CompareButtonTemplate {
                product_id: form.product_id,
                in_compare: true,
            },
        )
            .into_response())
    } else {
        Ok(Redirect::to("/compare").into_response())
    }
}

/// Remove a product from the comparison.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CompareForm>,
) -> Result<Response, AppError> {
    let mut compare: CompareList = session::load(&session, keys::COMPARE).await?;
    compare.remove(form.product_id);
    session::save(&session, keys::COMPARE, &compare).await?;

    if is_htmx(&headers) {
        Ok((
            AppendHeaders([("HX-Trigger", "compare-updated")]),
            CompareButtonTemplate {
                product_id: form.product_id,
                in_compare: false,
            },
        )
            .into_response())
    } else {
        Ok(Redirect::to("/compare").into_response())
    }
}

/// Remove every product from the comparison.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Response, AppError> {
    let mut compare: CompareList = session::load(&session, keys::COMPARE).await?;
    compare.clear();
    session::save(&session, keys::COMPARE, &compare).await?;
    Ok(Redirect::to("/compare").into_response())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}
